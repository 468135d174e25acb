//! Standard filter catalog
//!
//! The query dimensions every document cursor carries: criteria,
//! permission scoping, lifecycle flags (trash, orphan, published),
//! search and autocomplete, projection, sort, pagination, and explicit
//! ordering. Each is a [`FilterDef`] registered in a fixed order;
//! custom filters registered by an engine run after these.
//!
//! Registration order is a contract: `autocomplete` runs before
//! `search` so its rewrite is visible in the same pass, and `search`
//! runs before `projection` and `sort` so both can observe whether a
//! text search is active.

use serde_json::Value;

use crate::store::{Criteria, FieldSort, StoreSort, TEXT_SCORE_FIELD};
use crate::text::search_words;

use super::autocomplete;
use super::cursor::Cursor;
use super::registry::{FilterDef, FinalizeOutcome};
use super::state::FilterValue;

/// Names of the standard filters
pub mod names {
    pub const CRITERIA: &str = "criteria";
    pub const PERMISSION: &str = "permission";
    pub const TRASH: &str = "trash";
    pub const ORPHAN: &str = "orphan";
    pub const PUBLISHED: &str = "published";
    pub const AUTOCOMPLETE: &str = "autocomplete";
    pub const SEARCH: &str = "search";
    pub const PROJECTION: &str = "projection";
    pub const SORT: &str = "sort";
    pub const SKIP: &str = "skip";
    pub const LIMIT: &str = "limit";
    pub const EXPLICIT_ORDER: &str = "explicit_order";
}

/// Default permission requirement when the filter is never invoked
pub const DEFAULT_PERMISSION: &str = "view";

/// Default sort field when neither search nor an explicit sort applies
const DEFAULT_SORT_FIELD: &str = "title";

/// True when a non-empty search phrase is set
pub(crate) fn search_active(cursor: &Cursor) -> bool {
    matches!(
        cursor.state().json(names::SEARCH),
        Some(Value::String(phrase)) if !phrase.trim().is_empty()
    )
}

/// The standard catalog, in registration (finalization) order
pub fn standard_filters() -> Vec<FilterDef> {
    vec![
        criteria_filter(),
        permission_filter(),
        trash_filter(),
        orphan_filter(),
        published_filter(),
        autocomplete_filter(),
        search_filter(),
        projection_filter(),
        sort_filter(),
        skip_filter(),
        limit_filter(),
        explicit_order_filter(),
    ]
}

fn criteria_filter() -> FilterDef {
    FilterDef::new(names::CRITERIA).with_default(FilterValue::Criteria(Criteria::All))
}

/// Permission scoping. Unset or null means the "view" permission;
/// `false` skips narrowing entirely. The permission policy is
/// consulted exactly once per finalization pass.
fn permission_filter() -> FilterDef {
    FilterDef::new(names::PERMISSION)
        .with_default(FilterValue::Json(Value::Null))
        .with_finalize(|cursor| {
            let name = match cursor.state().json(names::PERMISSION) {
                Some(Value::Bool(false)) => {
                    cursor.clear_restriction(names::PERMISSION);
                    return Ok(FinalizeOutcome::Continue);
                }
                Some(Value::String(name)) => name.clone(),
                _ => DEFAULT_PERMISSION.to_string(),
            };
            let clause = cursor.policy().criteria(cursor.request(), &name);
            cursor.restrict(names::PERMISSION, clause);
            Ok(FinalizeOutcome::Continue)
        })
}

fn trash_filter() -> FilterDef {
    FilterDef::new(names::TRASH)
        .with_default(FilterValue::Json(Value::Bool(false)))
        .with_finalize(|cursor| {
            match cursor.state().json(names::TRASH) {
                Some(Value::Null) => cursor.clear_restriction(names::TRASH),
                Some(Value::Bool(true)) => {
                    cursor.restrict(names::TRASH, Criteria::eq("trash", true))
                }
                _ => cursor.restrict(names::TRASH, Criteria::ne("trash", true)),
            }
            Ok(FinalizeOutcome::Continue)
        })
}

/// Orphan scoping. The clause shape mirrors the trash filter but is
/// keyed on the distinct `orphan` attribute; the upstream behavior of
/// reusing the trash field here was judged a defect, not a feature.
fn orphan_filter() -> FilterDef {
    FilterDef::new(names::ORPHAN)
        .with_default(FilterValue::Json(Value::Null))
        .with_finalize(|cursor| {
            match cursor.state().json(names::ORPHAN) {
                Some(Value::Bool(true)) => {
                    cursor.restrict(names::ORPHAN, Criteria::eq("orphan", true))
                }
                Some(Value::Bool(false)) => {
                    cursor.restrict(names::ORPHAN, Criteria::ne("orphan", true))
                }
                _ => cursor.clear_restriction(names::ORPHAN),
            }
            Ok(FinalizeOutcome::Continue)
        })
}

fn published_filter() -> FilterDef {
    FilterDef::new(names::PUBLISHED)
        .with_default(FilterValue::Json(Value::Bool(true)))
        .with_finalize(|cursor| {
            match cursor.state().json(names::PUBLISHED) {
                Some(Value::Null) => cursor.clear_restriction(names::PUBLISHED),
                Some(Value::Bool(false)) => {
                    cursor.restrict(names::PUBLISHED, Criteria::ne("published", true))
                }
                _ => cursor.restrict(names::PUBLISHED, Criteria::eq("published", true)),
            }
            Ok(FinalizeOutcome::Continue)
        })
}

fn autocomplete_filter() -> FilterDef {
    FilterDef::new(names::AUTOCOMPLETE)
        .with_default(FilterValue::Json(Value::Null))
        .with_finalize(autocomplete::run)
}

/// Free-text search. Contributes a text clause only; projection and
/// sort react to search being set on their own.
fn search_filter() -> FilterDef {
    FilterDef::new(names::SEARCH)
        .with_default(FilterValue::Json(Value::Null))
        .with_finalize(|cursor| {
            match cursor.state().json(names::SEARCH) {
                Some(Value::String(phrase)) => {
                    let words = search_words(phrase);
                    if words.is_empty() {
                        cursor.clear_restriction(names::SEARCH);
                    } else {
                        cursor.restrict(names::SEARCH, Criteria::text(words));
                    }
                }
                _ => cursor.clear_restriction(names::SEARCH),
            }
            Ok(FinalizeOutcome::Continue)
        })
}

/// When search is active the text-match score field is force-included
/// so score-based sorting survives a narrow projection.
fn projection_filter() -> FilterDef {
    FilterDef::new(names::PROJECTION).with_finalize(|cursor| {
        if !search_active(cursor) {
            return Ok(FinalizeOutcome::Continue);
        }
        if let Some(Value::Object(map)) = cursor.state().json(names::PROJECTION).cloned() {
            let mut map = map;
            map.insert(TEXT_SCORE_FIELD.to_string(), Value::Bool(true));
            cursor
                .state_mut()
                .set(names::PROJECTION, FilterValue::Json(Value::Object(map)));
        }
        Ok(FinalizeOutcome::Continue)
    })
}

/// Sort resolution: an explicit choice wins; otherwise an active
/// search sorts by score and everything else falls back to the title
/// sort. The derived value is recomputed every pass, never written
/// back into filter state.
fn sort_filter() -> FilterDef {
    FilterDef::new(names::SORT).with_finalize(|cursor| {
        let resolved = match cursor.get(names::SORT) {
            Some(FilterValue::Sort(choice)) => choice.clone(),
            _ if search_active(cursor) => StoreSort::TextScore,
            _ => StoreSort::Fields(vec![FieldSort::asc(DEFAULT_SORT_FIELD)]),
        };
        cursor.set_resolved_sort(resolved);
        Ok(FinalizeOutcome::Continue)
    })
}

fn skip_filter() -> FilterDef {
    FilterDef::new(names::SKIP).with_default(FilterValue::Json(Value::from(0u64)))
}

fn limit_filter() -> FilterDef {
    FilterDef::new(names::LIMIT)
}

fn explicit_order_filter() -> FilterDef {
    FilterDef::new(names::EXPLICIT_ORDER)
}
