//! The cursor: a chainable query builder over a document store
//!
//! One cursor serves one logical read operation. Filter setters mutate
//! only cursor state; a yielding call (`to_array`, `to_object`,
//! `to_count`, `to_distinct`) finalizes every registered filter in
//! registration order and executes the derived query against the
//! bound store.
//!
//! Yielding calls never finalize the caller's cursor in place: each
//! call finalizes a scratch deep-copy, so repeated calls re-derive the
//! query from current state and produce structurally identical
//! results. A finalizer may request a restart of the whole pass; the
//! sequence is re-run from the first filter, which is safe because
//! finalizers are required to be idempotent.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::{AfterLoadHook, PermissionPolicy, RequestContext};
use crate::observability::Logger;
use crate::store::{
    Criteria, DocumentStore, FieldSort, Projection, StoreQuery, StoreSort, ID_FIELD,
};

use super::catalog::names;
use super::errors::{CursorError, CursorResult};
use super::registry::{FilterRegistry, FinalizeOutcome};
use super::state::{CursorState, ExplicitOrder, FilterValue};

/// Restart budget for one finalization. A sequence that keeps asking
/// to restart past this is a defective filter, not a workload.
const MAX_FINALIZE_PASSES: usize = 16;

/// A mutable, chainable query builder scoped to one logical read
#[derive(Clone)]
pub struct Cursor {
    state: CursorState,
    /// Criteria clauses contributed by finalizers, one slot per
    /// filter. Rebuilt from scratch on every pass so re-running a
    /// finalizer replaces its clause instead of stacking a duplicate.
    restrictions: BTreeMap<String, Criteria>,
    /// Effective sort derived by the sort finalizer
    resolved_sort: Option<StoreSort>,
    registry: Arc<FilterRegistry>,
    store: Arc<dyn DocumentStore>,
    policy: Arc<dyn PermissionPolicy>,
    hooks: Arc<Vec<Arc<dyn AfterLoadHook>>>,
    req: RequestContext,
}

impl Cursor {
    pub fn new(
        registry: Arc<FilterRegistry>,
        store: Arc<dyn DocumentStore>,
        policy: Arc<dyn PermissionPolicy>,
        hooks: Arc<Vec<Arc<dyn AfterLoadHook>>>,
        req: RequestContext,
    ) -> Self {
        Self {
            state: CursorState::new(),
            restrictions: BTreeMap::new(),
            resolved_sort: None,
            registry,
            store,
            policy,
            hooks,
            req,
        }
    }

    // ------------------------------------------------------------------
    // Chainable setters
    // ------------------------------------------------------------------

    /// Replaces the entire base criteria
    pub fn criteria(mut self, criteria: Criteria) -> Self {
        self.set_base_criteria(criteria);
        self
    }

    /// ANDs a clause into the base criteria. This is the only
    /// sanctioned way to narrow a query; the criteria tree is never
    /// mutated in place.
    pub fn and(mut self, clause: Criteria) -> Self {
        self.and_criteria(clause);
        self
    }

    /// Requires the named permission for returned documents.
    /// The default, when never invoked, is `"view"`.
    pub fn permission(mut self, name: &str) -> Self {
        self.state.set(names::PERMISSION, FilterValue::Json(Value::from(name)));
        self
    }

    /// Skips permission narrowing entirely. Privileged/task contexts
    /// only.
    pub fn permission_bypass(mut self) -> Self {
        self.state.set(names::PERMISSION, FilterValue::Json(Value::Bool(false)));
        self
    }

    /// `Some(false)` restricts to non-trashed documents (the default),
    /// `Some(true)` to trashed ones, `None` lifts the constraint.
    pub fn trash(mut self, value: Option<bool>) -> Self {
        self.state.set(names::TRASH, FilterValue::Json(tri_state(value)));
        self
    }

    /// `Some(true)` restricts to orphaned documents, `Some(false)` to
    /// non-orphans, `None` (the default) applies no constraint.
    pub fn orphan(mut self, value: Option<bool>) -> Self {
        self.state.set(names::ORPHAN, FilterValue::Json(tri_state(value)));
        self
    }

    /// `Some(true)` restricts to published documents (the default),
    /// `Some(false)` to unpublished ones, `None` lifts the constraint.
    pub fn published(mut self, value: Option<bool>) -> Self {
        self.state.set(names::PUBLISHED, FilterValue::Json(tri_state(value)));
        self
    }

    /// Free-text search over the phrase
    pub fn search(mut self, phrase: &str) -> Self {
        self.state.set(names::SEARCH, FilterValue::Json(Value::from(phrase)));
        self
    }

    /// Prefix autocomplete over the phrase; rewrites itself into a
    /// ranked search during finalization
    pub fn autocomplete(mut self, phrase: &str) -> Self {
        self.state
            .set(names::AUTOCOMPLETE, FilterValue::Json(Value::from(phrase)));
        self
    }

    /// Restricts returned documents to the given fields (plus `_id`)
    pub fn projection(mut self, fields: &[&str]) -> Self {
        let mut map = serde_json::Map::new();
        for field in fields {
            map.insert((*field).to_string(), Value::Bool(true));
        }
        self.state
            .set(names::PROJECTION, FilterValue::Json(Value::Object(map)));
        self
    }

    /// Explicit field sort; wins over any derived default
    pub fn sort(mut self, fields: Vec<FieldSort>) -> Self {
        self.state
            .set(names::SORT, FilterValue::Sort(StoreSort::Fields(fields)));
        self
    }

    /// No sort at all: the store's natural/implicit order, e.g. for
    /// proximity queries
    pub fn sort_natural(mut self) -> Self {
        self.state.set(names::SORT, FilterValue::Sort(StoreSort::Natural));
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.state.set(names::SKIP, FilterValue::Json(Value::from(n)));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.state.set(names::LIMIT, FilterValue::Json(Value::from(n)));
        self
    }

    /// Resequences results to match the given `_id` list after the
    /// query runs. Ids with no matching row and rows not in the list
    /// are dropped silently.
    pub fn explicit_order(self, ids: Vec<Value>) -> Self {
        self.explicit_order_by(ids, ID_FIELD)
    }

    /// Like [`Cursor::explicit_order`], keyed on another property
    pub fn explicit_order_by(mut self, ids: Vec<Value>, key: &str) -> Self {
        self.state.set(
            names::EXPLICIT_ORDER,
            FilterValue::Order(ExplicitOrder {
                ids,
                key: key.to_string(),
            }),
        );
        self
    }

    /// Raw state write for custom filters
    pub fn set(mut self, name: &str, value: FilterValue) -> Self {
        self.state.set(name, value);
        self
    }

    /// Raw state read
    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.state.get(name)
    }

    // ------------------------------------------------------------------
    // Finalizer-facing accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CursorState {
        &mut self.state
    }

    pub fn request(&self) -> &RequestContext {
        &self.req
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn policy(&self) -> &Arc<dyn PermissionPolicy> {
        &self.policy
    }

    /// The base criteria set via `criteria`/`and`; `All` if unset
    pub fn base_criteria(&self) -> Criteria {
        self.state
            .get(names::CRITERIA)
            .and_then(FilterValue::as_criteria)
            .cloned()
            .unwrap_or(Criteria::All)
    }

    pub fn set_base_criteria(&mut self, criteria: Criteria) {
        self.state.set(names::CRITERIA, FilterValue::Criteria(criteria));
    }

    pub fn and_criteria(&mut self, clause: Criteria) {
        let combined = self.base_criteria().and(clause);
        self.set_base_criteria(combined);
    }

    /// Replaces the named filter's contributed restriction clause.
    /// Contributions live outside the base criteria so a finalizer
    /// re-run (refinalize, or the next yielding call) swaps its clause
    /// instead of AND-ing a duplicate.
    pub fn restrict(&mut self, filter: &str, clause: Criteria) {
        self.restrictions.insert(filter.to_string(), clause);
    }

    pub fn clear_restriction(&mut self, filter: &str) {
        self.restrictions.remove(filter);
    }

    /// The base criteria AND every restriction clause contributed so
    /// far in the current pass. A finalizer issuing its own store
    /// queries must use this, not [`Cursor::base_criteria`], or it
    /// escapes the scope earlier filters already established.
    pub fn scoped_criteria(&self) -> Criteria {
        let mut criteria = self.base_criteria();
        for clause in self.restrictions.values() {
            criteria = criteria.and(clause.clone());
        }
        criteria
    }

    pub fn set_resolved_sort(&mut self, sort: StoreSort) {
        self.resolved_sort = Some(sort);
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    /// Runs every registered finalizer in registration order.
    ///
    /// Per filter: apply the declared default if the slot is unset,
    /// then invoke the finalizer. `Restart` aborts the remaining
    /// filters and re-runs the whole sequence; any error aborts
    /// immediately and propagates.
    fn finalize(&mut self) -> CursorResult<()> {
        let registry = Arc::clone(&self.registry);
        let mut passes = 0usize;
        'pass: loop {
            passes += 1;
            if passes > MAX_FINALIZE_PASSES {
                return Err(CursorError::RefinalizeLoop {
                    passes: MAX_FINALIZE_PASSES,
                });
            }
            // Derived artifacts are rebuilt wholesale each pass
            self.restrictions.clear();
            self.resolved_sort = None;

            for def in registry.defs() {
                if !self.state.is_set(def.name()) {
                    if let Some(default) = def.default() {
                        self.state.set(def.name(), default.clone());
                    }
                }
                if let Some(finalizer) = def.finalizer() {
                    match finalizer(self)? {
                        FinalizeOutcome::Continue => {}
                        FinalizeOutcome::Restart => continue 'pass,
                    }
                }
            }

            Logger::trace("CURSOR_FINALIZE", &[("passes", &passes.to_string())]);
            return Ok(());
        }
    }

    /// Assembles the store query from finalized state
    fn build_query(&self) -> StoreQuery {
        let criteria = self.scoped_criteria();

        let projection = match self.state.json(names::PROJECTION) {
            Some(Value::Object(map)) if !map.is_empty() => Some(
                map.iter()
                    .filter(|(_, v)| truthy(v))
                    .map(|(k, _)| k.clone())
                    .collect::<Projection>(),
            ),
            _ => None,
        };

        StoreQuery {
            criteria,
            projection,
            sort: self.resolved_sort.clone().unwrap_or(StoreSort::Natural),
            skip: self
                .state
                .json(names::SKIP)
                .and_then(Value::as_u64)
                .unwrap_or(0),
            limit: self.state.json(names::LIMIT).and_then(Value::as_u64),
        }
    }

    // ------------------------------------------------------------------
    // Yielding operations
    // ------------------------------------------------------------------

    /// Finalizes and returns the store query without executing it
    pub fn to_store_query(&self) -> CursorResult<StoreQuery> {
        let mut scratch = self.clone_cursor();
        scratch.finalize()?;
        Ok(scratch.build_query())
    }

    /// Executes the query and returns all matching documents, after
    /// explicit-order resequencing and the after-load hooks
    pub fn to_array(&self) -> CursorResult<Vec<Value>> {
        let mut scratch = self.clone_cursor();
        scratch.finalize()?;
        let query = scratch.build_query();
        let rows = scratch.store.find(&query)?;
        let mut rows = scratch.apply_explicit_order(rows);
        for hook in scratch.hooks.iter() {
            hook.docs_after_load(&scratch.req, &mut rows)?;
        }
        Logger::trace("CURSOR_TO_ARRAY", &[("rows", &rows.len().to_string())]);
        Ok(rows)
    }

    /// Returns the first matching document, forcing a limit of 1 for
    /// the duration of the call
    pub fn to_object(&self) -> CursorResult<Option<Value>> {
        let scratch = self.clone_cursor().limit(1);
        let mut rows = scratch.to_array()?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    /// Counts matching documents; skip and limit are ignored
    pub fn to_count(&self) -> CursorResult<u64> {
        let mut scratch = self.clone_cursor();
        scratch.finalize()?;
        let query = scratch.build_query();
        Ok(scratch.store.count(&query.criteria)?)
    }

    /// Returns distinct values of `property` under the finalized
    /// criteria; projection, sort, and limit are irrelevant here
    pub fn to_distinct(&self, property: &str) -> CursorResult<Vec<Value>> {
        let mut scratch = self.clone_cursor();
        scratch.finalize()?;
        let query = scratch.build_query();
        Ok(scratch.store.distinct(property, &query.criteria)?)
    }

    /// An independent deep copy over the same store/request bindings.
    /// Mutations on the clone never affect the original.
    pub fn clone_cursor(&self) -> Cursor {
        self.clone()
    }

    /// Emits rows strictly in the order of the explicit id list,
    /// dropping unmatched entries on both sides
    fn apply_explicit_order(&self, rows: Vec<Value>) -> Vec<Value> {
        let order = match self.state.get(names::EXPLICIT_ORDER) {
            Some(FilterValue::Order(order)) => order.clone(),
            _ => return rows,
        };

        let mut remaining: Vec<Option<Value>> = rows.into_iter().map(Some).collect();
        let mut out = Vec::with_capacity(order.ids.len());
        for id in &order.ids {
            let found = remaining.iter().position(|slot| {
                slot.as_ref()
                    .map_or(false, |doc| doc.get(&order.key) == Some(id))
            });
            if let Some(pos) = found {
                // Take, so a duplicate id cannot emit the same row twice
                if let Some(doc) = remaining[pos].take() {
                    out.push(doc);
                }
            }
        }
        out
    }
}

fn tri_state(value: Option<bool>) -> Value {
    match value {
        Some(b) => Value::Bool(b),
        None => Value::Null,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        _ => false,
    }
}
