//! Cursor state bag
//!
//! Each filter owns one slot in the state map, keyed by its name. A
//! slot is either absent (the filter was never invoked) or holds a
//! tagged [`FilterValue`]. State order is irrelevant; finalization
//! order is the registry's registration order.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::store::{Criteria, StoreSort};

/// A caller-supplied explicit result ordering
#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitOrder {
    /// Key values, in the order results must be returned
    pub ids: Vec<Value>,
    /// The document property the ids refer to
    pub key: String,
}

/// A tagged filter state value
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Opaque JSON state (flags, phrases, integers, projections)
    Json(Value),
    /// The base criteria predicate
    Criteria(Criteria),
    /// An explicit sort choice
    Sort(StoreSort),
    /// Explicit result ordering
    Order(ExplicitOrder),
}

impl FilterValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            FilterValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_criteria(&self) -> Option<&Criteria> {
        match self {
            FilterValue::Criteria(c) => Some(c),
            _ => None,
        }
    }
}

/// The mutable key-value bag private to one cursor instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorState {
    slots: BTreeMap<String, FilterValue>,
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FilterValue> {
        self.slots.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: FilterValue) {
        self.slots.insert(name.into(), value);
    }

    pub fn clear(&mut self, name: &str) {
        self.slots.remove(name);
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// JSON slot accessor; `None` if unset or not a JSON value
    pub fn json(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(FilterValue::as_json)
    }
}
