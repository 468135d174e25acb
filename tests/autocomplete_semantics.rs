//! Autocomplete and Search Semantics Tests
//!
//! - Token-prefix discovery plus exact string-prefix filtering
//! - The zero-candidate case short-circuits to an empty result set,
//!   never an error
//! - An active search overrides the default title sort with the
//!   text-match score, and forces the score field into a projection

use doccursor::engine::{DocEngine, RequestContext};
use doccursor::store::{Criteria, FieldSort, MemoryStore, StoreSort};
use serde_json::{json, Value};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn doc(id: &str, title: &str) -> Value {
    let words: Vec<String> = title.split_whitespace().map(str::to_lowercase).collect();
    json!({
        "_id": id,
        "title": title,
        "published": true,
        "visibility": "public",
        "high_search_text": title.to_lowercase(),
        "high_search_words": words,
        "low_search_text": title.to_lowercase(),
    })
}

fn orchard_engine() -> DocEngine {
    DocEngine::builder()
        .store(Arc::new(MemoryStore::new(vec![
            doc("seed", "Appleseed"),
            doc("sauce", "Applesauce"),
            doc("banana", "Banana"),
        ])))
        .build()
        .unwrap()
}

fn ids(rows: &[Value]) -> Vec<&str> {
    rows.iter().map(|d| d["_id"].as_str().unwrap()).collect()
}

// =============================================================================
// Autocomplete
// =============================================================================

/// "app" discovers both apple* words, keeps both through the exact
/// prefix filter, and runs a ranked search over that vocabulary.
#[test]
fn test_prefix_discovery_and_rewrite() {
    let engine = orchard_engine();
    let cursor = engine
        .find(RequestContext::anonymous())
        .autocomplete("app");

    let query = cursor.to_store_query().unwrap();
    let query_json = serde_json::to_value(&query.criteria).unwrap();
    let clauses = format!("{}", query_json);
    assert!(clauses.contains("appleseed"));
    assert!(clauses.contains("applesauce"));
    assert_eq!(query.sort, StoreSort::TextScore);

    let rows = cursor.to_array().unwrap();
    let mut found = ids(&rows);
    found.sort();
    assert_eq!(found, vec!["sauce", "seed"]);
}

/// Candidates that merely contain the typed word are rejected by the
/// string-prefix pass.
#[test]
fn test_substring_candidates_rejected() {
    let engine = DocEngine::builder()
        .store(Arc::new(MemoryStore::new(vec![
            doc("pine", "Pineapple"),
            doc("plain", "Apple"),
        ])))
        .build()
        .unwrap();

    // "pineapple" does not start with "apple", so the Pineapple
    // document never even enters the candidate vocabulary
    let rows = engine
        .find(RequestContext::anonymous())
        .autocomplete("apple")
        .to_array()
        .unwrap();

    assert_eq!(ids(&rows), vec!["plain"]);
}

/// No surviving candidates means a clean empty result, not an error.
#[test]
fn test_zero_candidates_short_circuit() {
    let engine = orchard_engine();
    let cursor = engine
        .find(RequestContext::anonymous())
        .autocomplete("zucchini");

    let rows = cursor.to_array().unwrap();
    assert!(rows.is_empty());
    assert_eq!(cursor.to_count().unwrap(), 0);
}

/// An empty or punctuation-only phrase is a no-op.
#[test]
fn test_blank_phrase_is_noop() {
    let engine = orchard_engine();
    let with_blank = engine
        .find(RequestContext::anonymous())
        .autocomplete("?!")
        .to_store_query()
        .unwrap();
    let plain = engine
        .find(RequestContext::anonymous())
        .to_store_query()
        .unwrap();
    assert_eq!(with_blank, plain);
}

/// Autocomplete honors criteria narrowed before it runs.
#[test]
fn test_existing_criteria_scope_discovery() {
    let mut sauce = doc("sauce", "Applesauce");
    sauce["kind"] = json!("recipe");
    let mut seed = doc("seed", "Appleseed");
    seed["kind"] = json!("person");

    let engine = DocEngine::builder()
        .store(Arc::new(MemoryStore::new(vec![sauce, seed])))
        .build()
        .unwrap();

    let rows = engine
        .find(RequestContext::anonymous())
        .and(Criteria::eq("kind", "recipe"))
        .autocomplete("app")
        .to_array()
        .unwrap();

    assert_eq!(ids(&rows), vec!["sauce"]);
}

/// Word discovery runs inside the lifecycle scope: a trashed document
/// must not contribute vocabulary the visible result set cannot reach.
#[test]
fn test_discovery_respects_trash_scope() {
    let mut hidden = doc("t", "Appleseed");
    hidden["trash"] = json!(true);
    // The only visible "apple" lives in body text, never in the
    // high-priority word index
    let visible = json!({
        "_id": "v",
        "title": "Visible",
        "published": true,
        "visibility": "public",
        "low_search_text": "apple",
    });

    let engine = DocEngine::builder()
        .store(Arc::new(MemoryStore::new(vec![hidden, visible])))
        .build()
        .unwrap();

    // Under the default scope there is no candidate word at all, so
    // the unsatisfiable rewrite kicks in
    let rows = engine
        .find(RequestContext::anonymous())
        .autocomplete("app")
        .to_array()
        .unwrap();
    assert!(rows.is_empty());

    // Lifting the trash constraint brings the word back into scope
    let rows = engine
        .find(RequestContext::anonymous())
        .trash(None)
        .autocomplete("app")
        .to_array()
        .unwrap();
    assert_eq!(ids(&rows), vec!["t"]);
}

/// Discovery is also bounded by the permission scope.
#[test]
fn test_discovery_respects_permission_scope() {
    let mut restricted = doc("r", "Appleseed");
    restricted["visibility"] = json!("restricted");
    restricted["owner_id"] = json!("u1");

    let engine = DocEngine::builder()
        .store(Arc::new(MemoryStore::new(vec![restricted])))
        .build()
        .unwrap();

    let rows = engine
        .find(RequestContext::anonymous())
        .autocomplete("app")
        .to_array()
        .unwrap();
    assert!(rows.is_empty());

    // The owner can see the document, so discovery finds its words
    let rows = engine
        .find(RequestContext::for_user("u1"))
        .autocomplete("app")
        .to_array()
        .unwrap();
    assert_eq!(ids(&rows), vec!["r"]);
}

// =============================================================================
// Search-Driven Sort and Projection
// =============================================================================

/// With search set and sort never called, results order by score.
#[test]
fn test_search_overrides_default_sort() {
    let engine = DocEngine::builder()
        .store(Arc::new(MemoryStore::new(vec![
            // Alphabetically first, but barely mentions apples
            json!({
                "_id": "low", "title": "A Minor Note", "published": true,
                "visibility": "public", "low_search_text": "apple",
            }),
            json!({
                "_id": "high", "title": "Zebra Orchard", "published": true,
                "visibility": "public",
                "high_search_words": ["apple"],
                "low_search_text": "apple apple",
            }),
        ])))
        .build()
        .unwrap();

    let query = engine
        .find(RequestContext::anonymous())
        .search("apple")
        .to_store_query()
        .unwrap();
    assert_eq!(query.sort, StoreSort::TextScore);

    let rows = engine
        .find(RequestContext::anonymous())
        .search("apple")
        .to_array()
        .unwrap();
    assert_eq!(ids(&rows), vec!["high", "low"]);
}

/// An explicit sort always wins over the search-derived one.
#[test]
fn test_explicit_sort_beats_search_sort() {
    let engine = orchard_engine();
    let query = engine
        .find(RequestContext::anonymous())
        .search("apple")
        .sort(vec![FieldSort::desc("title")])
        .to_store_query()
        .unwrap();

    assert_eq!(query.sort, StoreSort::Fields(vec![FieldSort::desc("title")]));
}

/// Opting out of sorting entirely keeps the store's natural order.
#[test]
fn test_natural_sort_opt_out() {
    let engine = orchard_engine();
    let query = engine
        .find(RequestContext::anonymous())
        .sort_natural()
        .to_store_query()
        .unwrap();
    assert_eq!(query.sort, StoreSort::Natural);

    let unset = engine
        .find(RequestContext::anonymous())
        .to_store_query()
        .unwrap();
    assert_eq!(
        unset.sort,
        StoreSort::Fields(vec![FieldSort::asc("title")])
    );
}

/// A narrow projection still carries the score field during a search.
#[test]
fn test_projection_force_includes_score() {
    let engine = orchard_engine();

    let query = engine
        .find(RequestContext::anonymous())
        .search("apple")
        .projection(&["title"])
        .to_store_query()
        .unwrap();
    let projection = query.projection.unwrap();
    assert!(projection.contains("title"));
    assert!(projection.contains("text_score"));

    // Without search the projection is untouched
    let query = engine
        .find(RequestContext::anonymous())
        .projection(&["title"])
        .to_store_query()
        .unwrap();
    assert!(!query.projection.unwrap().contains("text_score"));
}
