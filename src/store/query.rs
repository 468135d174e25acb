//! The finalized store query
//!
//! A `StoreQuery` is the fully derived execution input the cursor hands
//! to a [`crate::store::DocumentStore`]: criteria, projection, sort,
//! skip, and limit, with nothing left implicit.

use serde::{Deserialize, Serialize};

use super::criteria::{Criteria, StoreSort};

/// Field-inclusion projection. The store always retains `_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a field to the inclusion set (idempotent)
    pub fn include(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Projection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Projection::new(), |p, f| p.include(f))
    }
}

/// A finalized, executable query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreQuery {
    /// The AND-composed predicate selecting matching documents
    pub criteria: Criteria,
    /// Field-inclusion projection; `None` returns whole documents
    pub projection: Option<Projection>,
    /// Effective sort
    pub sort: StoreSort,
    /// Rows to skip before returning results
    pub skip: u64,
    /// Maximum rows to return; `None` is unbounded
    pub limit: Option<u64>,
}

impl StoreQuery {
    /// Creates a query over the given criteria with no projection, the
    /// store's natural order, and no pagination.
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            projection: None,
            sort: StoreSort::Natural,
            skip: 0,
            limit: None,
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_sort(mut self, sort: StoreSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
