//! Criteria structures for document queries
//!
//! `Criteria` is the predicate tree handed to the store: an AND of
//! clauses, where clauses may themselves be equality, set-membership,
//! existence, prefix, or text-search predicates. Filters narrow a query
//! exclusively through [`Criteria::and`]; the tree is never mutated in
//! place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A store-level predicate over documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Criteria {
    /// Matches every document (the empty predicate)
    All,
    /// Matches documents satisfying every child clause
    And(Vec<Criteria>),
    /// Matches documents satisfying at least one child clause.
    /// An empty `Or` matches nothing.
    Or(Vec<Criteria>),
    /// Field equals value. For array fields, matches if any element
    /// equals the value.
    Eq { field: String, value: Value },
    /// Field does not equal value; a missing field matches
    Ne { field: String, value: Value },
    /// Field equals any of the given values
    In { field: String, values: Vec<Value> },
    /// Field presence check
    Exists { field: String, expected: bool },
    /// Field matches an anchored pattern produced by
    /// [`crate::text::searchify`]. For array fields, matches if any
    /// element matches.
    Prefix { field: String, pattern: String },
    /// Ranked text-search predicate over the document's search fields
    Text { words: Vec<String> },
}

impl Criteria {
    /// Equality clause
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Criteria::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Inequality clause
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Criteria::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Set-membership clause
    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Criteria::In {
            field: field.into(),
            values,
        }
    }

    /// Presence clause
    pub fn exists(field: impl Into<String>, expected: bool) -> Self {
        Criteria::Exists {
            field: field.into(),
            expected,
        }
    }

    /// Anchored-pattern clause
    pub fn prefix(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Criteria::Prefix {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Text-search clause
    pub fn text(words: Vec<String>) -> Self {
        Criteria::Text { words }
    }

    /// Returns the logical AND of `self` and `other`.
    ///
    /// `All` is the identity element; nested `And`s are flattened so
    /// repeated composition stays shallow and structurally comparable.
    pub fn and(self, other: Criteria) -> Criteria {
        match (self, other) {
            (Criteria::All, c) => c,
            (c, Criteria::All) => c,
            (Criteria::And(mut a), Criteria::And(b)) => {
                a.extend(b);
                Criteria::And(a)
            }
            (Criteria::And(mut a), c) => {
                a.push(c);
                Criteria::And(a)
            }
            (c, Criteria::And(b)) => {
                let mut clauses = vec![c];
                clauses.extend(b);
                Criteria::And(clauses)
            }
            (a, b) => Criteria::And(vec![a, b]),
        }
    }

    /// Returns true if this is the empty predicate
    pub fn is_all(&self) -> bool {
        matches!(self, Criteria::All)
    }
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria::All
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A single field sort term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSort {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl FieldSort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// The effective store-level sort for a finalized query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreSort {
    /// No sort; the store's natural order (e.g. for proximity queries)
    Natural,
    /// Descending text-match score; only meaningful when the criteria
    /// carry a `Text` clause
    TextScore,
    /// Ordered field sorts, applied left to right
    Fields(Vec<FieldSort>),
}
