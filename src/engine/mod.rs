//! Document engine: the cursor's owning collaborator set
//!
//! A `DocEngine` binds a document store, a permission policy, the
//! after-load hooks, and the filter registry for one document type.
//! Engines are assembled once at startup and are read-only afterwards;
//! `find` mints a fresh cursor per logical read.

use serde_json::Value;
use std::sync::Arc;

use crate::cursor::{
    standard_filters, Cursor, CursorError, CursorResult, FilterDef, FilterRegistry,
    FilterRegistryBuilder,
};
use crate::store::{Criteria, DocumentStore};

/// Document field naming who owns a document
pub const OWNER_FIELD: &str = "owner_id";

/// Document field naming who may view a document
pub const VISIBILITY_FIELD: &str = "visibility";

/// Visibility value for documents anyone may view
pub const VISIBILITY_PUBLIC: &str = "public";

/// Identity and privilege information for one logical request.
///
/// Every cursor requires one at construction; there is no anonymous
/// default, so a missing binding is a compile error rather than a
/// runtime surprise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// The authenticated user, if any
    pub user_id: Option<String>,
    /// Admins bypass visibility narrowing inside the default policy
    pub is_admin: bool,
}

impl RequestContext {
    /// An unauthenticated request
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            is_admin: false,
        }
    }

    /// A request on behalf of a signed-in user
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_admin: false,
        }
    }

    /// A request on behalf of an administrator
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_admin: true,
        }
    }
}

/// Produces the criteria fragment enforcing a named permission for a
/// request. Consulted exactly once per finalization pass by the
/// permission filter.
pub trait PermissionPolicy: Send + Sync {
    fn criteria(&self, req: &RequestContext, permission: &str) -> Criteria;
}

/// The default policy.
///
/// - admins: no narrowing
/// - `view`: public documents, plus the user's own
/// - anything else (edit-class permissions): the user's own documents
///   only; anonymous requests match nothing
#[derive(Debug, Default)]
pub struct VisibilityPolicy;

impl PermissionPolicy for VisibilityPolicy {
    fn criteria(&self, req: &RequestContext, permission: &str) -> Criteria {
        if req.is_admin {
            return Criteria::All;
        }
        let public = Criteria::eq(VISIBILITY_FIELD, VISIBILITY_PUBLIC);
        match (&req.user_id, permission) {
            (Some(user_id), "view") => {
                Criteria::Or(vec![public, Criteria::eq(OWNER_FIELD, user_id.clone())])
            }
            (None, "view") => public,
            (Some(user_id), _) => Criteria::eq(OWNER_FIELD, user_id.clone()),
            // An empty Or matches nothing
            (None, _) => Criteria::Or(vec![]),
        }
    }
}

/// Batch post-processing applied to every loaded result set, in
/// registration order. Hooks may mutate or annotate rows in place;
/// errors propagate to the caller of the yielding method.
pub trait AfterLoadHook: Send + Sync {
    fn docs_after_load(&self, req: &RequestContext, docs: &mut Vec<Value>) -> CursorResult<()>;
}

/// The collaborator set for one document type's cursors
pub struct DocEngine {
    store: Arc<dyn DocumentStore>,
    policy: Arc<dyn PermissionPolicy>,
    hooks: Arc<Vec<Arc<dyn AfterLoadHook>>>,
    registry: Arc<FilterRegistry>,
}

impl DocEngine {
    pub fn builder() -> DocEngineBuilder {
        DocEngineBuilder::default()
    }

    /// Mints a cursor bound to this engine and the given request
    pub fn find(&self, req: RequestContext) -> Cursor {
        Cursor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
            Arc::clone(&self.hooks),
            req,
        )
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }
}

/// Assembles a [`DocEngine`]. The standard filter catalog is always
/// registered first; custom filters follow in the order given.
#[derive(Default)]
pub struct DocEngineBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    policy: Option<Arc<dyn PermissionPolicy>>,
    hooks: Vec<Arc<dyn AfterLoadHook>>,
    custom: Vec<FilterDef>,
}

impl DocEngineBuilder {
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn hook(mut self, hook: Arc<dyn AfterLoadHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Registers a custom filter after the standard catalog
    pub fn filter(mut self, def: FilterDef) -> Self {
        self.custom.push(def);
        self
    }

    pub fn build(self) -> CursorResult<DocEngine> {
        let store = self
            .store
            .ok_or_else(|| CursorError::Config("an engine requires a document store".into()))?;
        let policy = self
            .policy
            .unwrap_or_else(|| Arc::new(VisibilityPolicy));
        let registry = FilterRegistryBuilder::new()
            .filters(standard_filters())
            .filters(self.custom)
            .build()?;

        Ok(DocEngine {
            store,
            policy,
            hooks: Arc::new(self.hooks),
            registry: Arc::new(registry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_visibility_policy_admin_sees_all() {
        let policy = VisibilityPolicy;
        let criteria = policy.criteria(&RequestContext::admin("root"), "view");
        assert!(criteria.is_all());
    }

    #[test]
    fn test_visibility_policy_view_for_user() {
        let policy = VisibilityPolicy;
        let criteria = policy.criteria(&RequestContext::for_user("u1"), "view");
        assert_eq!(
            criteria,
            Criteria::Or(vec![
                Criteria::eq("visibility", "public"),
                Criteria::eq("owner_id", "u1"),
            ])
        );
    }

    #[test]
    fn test_visibility_policy_edit_for_anonymous_matches_nothing() {
        let policy = VisibilityPolicy;
        let criteria = policy.criteria(&RequestContext::anonymous(), "edit");
        assert_eq!(criteria, Criteria::Or(vec![]));
    }

    #[test]
    fn test_builder_requires_store() {
        let result = DocEngine::builder().build();
        assert!(matches!(result, Err(CursorError::Config(_))));
    }

    #[test]
    fn test_builder_registers_standard_and_custom_filters() {
        let engine = DocEngine::builder()
            .store(Arc::new(MemoryStore::new(vec![json!({"_id": "a"})])))
            .filter(FilterDef::new("slug"))
            .build()
            .unwrap();

        assert!(engine.registry().contains("trash"));
        assert!(engine.registry().contains("slug"));
    }

    #[test]
    fn test_builder_rejects_duplicate_custom_filter() {
        let result = DocEngine::builder()
            .store(Arc::new(MemoryStore::new(vec![])))
            .filter(FilterDef::new("trash"))
            .build();

        assert!(matches!(result, Err(CursorError::DuplicateFilter(name)) if name == "trash"));
    }
}
