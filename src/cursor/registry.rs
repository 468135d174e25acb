//! Filter registry
//!
//! Each cursor definition declares its query dimensions as named
//! filters: a default value, applied if the filter was never invoked
//! by the time finalization runs, and a finalizer that folds the
//! filter's state into the query. The registry is built once at engine
//! definition time and is closed afterwards; registration order is the
//! finalization order and is a real contract between filters.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::cursor::Cursor;
use super::errors::{CursorError, CursorResult};
use super::state::FilterValue;

/// What a finalizer asks the engine to do next.
///
/// `Restart` aborts the remaining filters in the current pass and
/// re-runs the whole sequence from the first entry. Finalizers must be
/// idempotent so that restarting is always safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Continue,
    Restart,
}

/// Boxed finalizer signature shared by all filters
pub type Finalizer = Arc<dyn Fn(&mut Cursor) -> CursorResult<FinalizeOutcome> + Send + Sync>;

/// One named filter definition
#[derive(Clone)]
pub struct FilterDef {
    name: String,
    default: Option<FilterValue>,
    finalize: Option<Finalizer>,
}

impl FilterDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            finalize: None,
        }
    }

    /// Declares the value applied when the filter was never invoked
    pub fn with_default(mut self, value: FilterValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_finalize<F>(mut self, finalize: F) -> Self
    where
        F: Fn(&mut Cursor) -> CursorResult<FinalizeOutcome> + Send + Sync + 'static,
    {
        self.finalize = Some(Arc::new(finalize));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&FilterValue> {
        self.default.as_ref()
    }

    pub fn finalizer(&self) -> Option<&Finalizer> {
        self.finalize.as_ref()
    }
}

impl fmt::Debug for FilterDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDef")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("finalize", &self.finalize.is_some())
            .finish()
    }
}

/// An ordered, closed set of filter definitions
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    defs: Vec<FilterDef>,
}

impl FilterRegistry {
    /// Definitions in registration (finalization) order
    pub fn defs(&self) -> &[FilterDef] {
        &self.defs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.iter().any(|d| d.name() == name)
    }
}

/// Builds a [`FilterRegistry`], rejecting duplicate names
#[derive(Debug, Default)]
pub struct FilterRegistryBuilder {
    defs: Vec<FilterDef>,
}

impl FilterRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, def: FilterDef) -> Self {
        self.defs.push(def);
        self
    }

    pub fn filters(mut self, defs: impl IntoIterator<Item = FilterDef>) -> Self {
        self.defs.extend(defs);
        self
    }

    pub fn build(self) -> CursorResult<FilterRegistry> {
        let mut seen = HashSet::new();
        for def in &self.defs {
            if !seen.insert(def.name().to_string()) {
                return Err(CursorError::DuplicateFilter(def.name().to_string()));
            }
        }
        Ok(FilterRegistry { defs: self.defs })
    }
}
