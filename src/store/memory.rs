//! In-memory reference store
//!
//! Predicate evaluation is strict: no type coercion, a missing field
//! never satisfies an equality, and `Ne` treats a missing field as a
//! match. Sorting is stable with a fixed cross-type order
//! (null < bool < number < string < array < object).

use regex::Regex;
use serde_json::{json, Value};
use std::cmp::Ordering;

use super::criteria::{Criteria, FieldSort, SortDirection, StoreSort};
use super::errors::StoreResult;
use super::query::{Projection, StoreQuery};
use super::{DocumentStore, HIGH_SEARCH_WORDS_FIELD, ID_FIELD, LOW_SEARCH_TEXT_FIELD, TEXT_SCORE_FIELD};
use crate::text::sortify;

/// A document collection held in memory, immutable once built
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Vec<Value>,
}

impl MemoryStore {
    pub fn new(docs: Vec<Value>) -> Self {
        Self { docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Checks a document against a criteria tree
    fn matches(doc: &Value, criteria: &Criteria) -> StoreResult<bool> {
        Ok(match criteria {
            Criteria::All => true,
            Criteria::And(clauses) => {
                for clause in clauses {
                    if !Self::matches(doc, clause)? {
                        return Ok(false);
                    }
                }
                true
            }
            Criteria::Or(clauses) => {
                for clause in clauses {
                    if Self::matches(doc, clause)? {
                        return Ok(true);
                    }
                }
                false
            }
            Criteria::Eq { field, value } => Self::eq_match(doc.get(field), value),
            Criteria::Ne { field, value } => !Self::eq_match(doc.get(field), value),
            Criteria::In { field, values } => values
                .iter()
                .any(|value| Self::eq_match(doc.get(field), value)),
            Criteria::Exists { field, expected } => doc.get(field).is_some() == *expected,
            Criteria::Prefix { field, pattern } => {
                let re = Regex::new(pattern)?;
                Self::pattern_match(doc.get(field), &re)
            }
            Criteria::Text { words } => Self::text_score(doc, words) > 0,
        })
    }

    /// Exact equality; array fields match if any element equals
    fn eq_match(actual: Option<&Value>, expected: &Value) -> bool {
        match actual {
            None => false,
            Some(value) => {
                value == expected
                    || value
                        .as_array()
                        .map_or(false, |elements| elements.contains(expected))
            }
        }
    }

    /// Pattern match against a string field or any element of an array
    /// field
    fn pattern_match(actual: Option<&Value>, re: &Regex) -> bool {
        match actual {
            Some(Value::String(s)) => re.is_match(s),
            Some(Value::Array(elements)) => elements
                .iter()
                .any(|e| e.as_str().map_or(false, |s| re.is_match(s))),
            _ => false,
        }
    }

    /// Text-match score: occurrences of query words among the
    /// high-priority indexed words (double weight) and the body text.
    fn text_score(doc: &Value, words: &[String]) -> u64 {
        let high: Vec<&str> = doc
            .get(HIGH_SEARCH_WORDS_FIELD)
            .and_then(Value::as_array)
            .map(|elements| elements.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let low = doc
            .get(LOW_SEARCH_TEXT_FIELD)
            .and_then(Value::as_str)
            .map(sortify)
            .unwrap_or_default();
        let low_tokens: Vec<&str> = low.split_whitespace().collect();

        let mut score = 0u64;
        for word in words {
            score += 2 * high.iter().filter(|t| *t == word).count() as u64;
            score += low_tokens.iter().filter(|t| *t == word).count() as u64;
        }
        score
    }

    /// Finds the first `Text` clause in a criteria tree, if any
    fn collect_text_words(criteria: &Criteria) -> Option<Vec<String>> {
        match criteria {
            Criteria::Text { words } => Some(words.clone()),
            Criteria::And(clauses) | Criteria::Or(clauses) => {
                clauses.iter().find_map(Self::collect_text_words)
            }
            _ => None,
        }
    }

    /// Compares two optional JSON values with a fixed cross-type order
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let type_order = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
            }
        };

        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a_val), Some(b_val)) => {
                let (a_type, b_type) = (type_order(a_val), type_order(b_val));
                if a_type != b_type {
                    return a_type.cmp(&b_type);
                }
                match (a_val, b_val) {
                    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                    (Value::Number(x), Value::Number(y)) => {
                        let xf = x.as_f64().unwrap_or(0.0);
                        let yf = y.as_f64().unwrap_or(0.0);
                        xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    _ => Ordering::Equal,
                }
            }
        }
    }

    fn sort_by_fields(rows: &mut [Value], fields: &[FieldSort]) {
        rows.sort_by(|a, b| {
            for spec in fields {
                let ordering = Self::compare_values(a.get(&spec.field), b.get(&spec.field));
                let ordering = match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    fn project(doc: &Value, projection: &Projection) -> Value {
        let mut out = serde_json::Map::new();
        if let Some(id) = doc.get(ID_FIELD) {
            out.insert(ID_FIELD.to_string(), id.clone());
        }
        for field in projection.fields() {
            if field == ID_FIELD {
                continue;
            }
            if let Some(value) = doc.get(field) {
                out.insert(field.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

impl DocumentStore for MemoryStore {
    fn find(&self, query: &StoreQuery) -> StoreResult<Vec<Value>> {
        let mut rows = Vec::new();
        for doc in &self.docs {
            if Self::matches(doc, &query.criteria)? {
                rows.push(doc.clone());
            }
        }

        // Attach scores before sort/projection so both can observe them
        if let Some(words) = Self::collect_text_words(&query.criteria) {
            for doc in &mut rows {
                let score = Self::text_score(doc, &words);
                doc[TEXT_SCORE_FIELD] = json!(score);
            }
        }

        match &query.sort {
            StoreSort::Natural => {}
            StoreSort::TextScore => {
                rows.sort_by(|a, b| {
                    let a_score = a.get(TEXT_SCORE_FIELD).and_then(Value::as_u64).unwrap_or(0);
                    let b_score = b.get(TEXT_SCORE_FIELD).and_then(Value::as_u64).unwrap_or(0);
                    b_score.cmp(&a_score)
                });
            }
            StoreSort::Fields(fields) => Self::sort_by_fields(&mut rows, fields),
        }

        let mut rows: Vec<Value> = rows.into_iter().skip(query.skip as usize).collect();
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }

        if let Some(projection) = &query.projection {
            rows = rows.iter().map(|doc| Self::project(doc, projection)).collect();
        }

        Ok(rows)
    }

    fn count(&self, criteria: &Criteria) -> StoreResult<u64> {
        let mut count = 0;
        for doc in &self.docs {
            if Self::matches(doc, criteria)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn distinct(&self, field: &str, criteria: &Criteria) -> StoreResult<Vec<Value>> {
        let mut values: Vec<Value> = Vec::new();
        for doc in &self.docs {
            if !Self::matches(doc, criteria)? {
                continue;
            }
            match doc.get(field) {
                Some(Value::Array(elements)) => {
                    for element in elements {
                        if !values.contains(element) {
                            values.push(element.clone());
                        }
                    }
                }
                Some(value) => {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
                None => {}
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            json!({"_id": "a", "title": "Apples", "published": true, "tags": ["fruit", "green"]}),
            json!({"_id": "b", "title": "Bananas", "published": false, "trash": true}),
            json!({"_id": "c", "title": "Cherries", "published": true, "tags": ["fruit", "red"]}),
        ])
    }

    #[test]
    fn test_eq_no_coercion() {
        let doc = json!({"count": 3});
        assert!(MemoryStore::matches(&doc, &Criteria::eq("count", json!(3))).unwrap());
        assert!(!MemoryStore::matches(&doc, &Criteria::eq("count", json!("3"))).unwrap());
    }

    #[test]
    fn test_eq_matches_array_element() {
        let doc = json!({"tags": ["fruit", "red"]});
        assert!(MemoryStore::matches(&doc, &Criteria::eq("tags", json!("red"))).unwrap());
        assert!(!MemoryStore::matches(&doc, &Criteria::eq("tags", json!("blue"))).unwrap());
    }

    #[test]
    fn test_ne_matches_missing_field() {
        // Documents without a trash flag count as non-trashed
        let doc = json!({"_id": "a"});
        assert!(MemoryStore::matches(&doc, &Criteria::ne("trash", json!(true))).unwrap());

        let trashed = json!({"_id": "b", "trash": true});
        assert!(!MemoryStore::matches(&trashed, &Criteria::ne("trash", json!(true))).unwrap());
    }

    #[test]
    fn test_exists() {
        let doc = json!({"trash": null});
        assert!(MemoryStore::matches(&doc, &Criteria::exists("trash", true)).unwrap());
        assert!(MemoryStore::matches(&doc, &Criteria::exists("orphan", false)).unwrap());
    }

    #[test]
    fn test_empty_or_matches_nothing() {
        let doc = json!({"_id": "a"});
        assert!(!MemoryStore::matches(&doc, &Criteria::Or(vec![])).unwrap());
    }

    #[test]
    fn test_prefix_on_array_field() {
        let doc = json!({"high_search_words": ["appleseed", "applesauce", "banana"]});
        let criteria = Criteria::prefix("high_search_words", "^app");
        assert!(MemoryStore::matches(&doc, &criteria).unwrap());

        let miss = Criteria::prefix("high_search_words", "^zzz");
        assert!(!MemoryStore::matches(&doc, &miss).unwrap());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let doc = json!({"title": "x"});
        let bad = Criteria::prefix("title", "^(unclosed");
        assert!(MemoryStore::matches(&doc, &bad).is_err());
    }

    #[test]
    fn test_find_with_skip_limit() {
        let store = store();
        let query = StoreQuery::new(Criteria::All)
            .with_sort(StoreSort::Fields(vec![FieldSort::asc("title")]))
            .with_skip(1)
            .with_limit(1);

        let rows = store.find(&query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["_id"], "b");
    }

    #[test]
    fn test_projection_keeps_id() {
        let store = store();
        let query = StoreQuery::new(Criteria::eq("_id", json!("a")))
            .with_projection(Projection::new().include("title"));

        let rows = store.find(&query).unwrap();
        assert_eq!(rows[0], json!({"_id": "a", "title": "Apples"}));
    }

    #[test]
    fn test_text_score_and_sort() {
        let store = MemoryStore::new(vec![
            json!({"_id": "one", "high_search_words": ["apple"], "low_search_text": "apple pie"}),
            json!({"_id": "two", "low_search_text": "apple apple apple"}),
            json!({"_id": "zero", "low_search_text": "plum jam"}),
        ]);

        let query = StoreQuery::new(Criteria::text(vec!["apple".into()]))
            .with_sort(StoreSort::TextScore);
        let rows = store.find(&query).unwrap();

        // "zero" has no match at all; the others carry scores
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["_id"], "one"); // high word weighted double: 2+1
        assert_eq!(rows[1]["_id"], "two"); // 3 body occurrences
        assert_eq!(rows[0]["text_score"], json!(3));
    }

    #[test]
    fn test_count_ignores_pagination() {
        let store = store();
        assert_eq!(store.count(&Criteria::eq("published", json!(true))).unwrap(), 2);
        assert_eq!(store.count(&Criteria::All).unwrap(), 3);
    }

    #[test]
    fn test_distinct_flattens_arrays() {
        let store = store();
        let values = store.distinct("tags", &Criteria::All).unwrap();
        assert_eq!(
            values,
            vec![json!("fruit"), json!("green"), json!("red")]
        );
    }

    #[test]
    fn test_stable_sort_on_ties() {
        let store = MemoryStore::new(vec![
            json!({"_id": "first", "rank": 1}),
            json!({"_id": "second", "rank": 1}),
        ]);
        let query =
            StoreQuery::new(Criteria::All).with_sort(StoreSort::Fields(vec![FieldSort::asc("rank")]));
        let rows = store.find(&query).unwrap();
        assert_eq!(rows[0]["_id"], "first");
        assert_eq!(rows[1]["_id"], "second");
    }
}
