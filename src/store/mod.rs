//! Abstract document store for the cursor engine
//!
//! The engine only shapes the predicate/projection/sort objects handed
//! to a store; the store's persistence internals are out of scope. A
//! backend implements [`DocumentStore`]; [`MemoryStore`] is the
//! in-memory reference implementation used by tests and as the
//! executable semantics of the criteria model.

mod criteria;
mod errors;
mod memory;
mod query;

pub use criteria::{Criteria, FieldSort, SortDirection, StoreSort};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{Projection, StoreQuery};

use serde_json::Value;

/// Document key property
pub const ID_FIELD: &str = "_id";

/// High-priority indexed text (titles, keywords), normalized
pub const HIGH_SEARCH_TEXT_FIELD: &str = "high_search_text";

/// Individual normalized words from the high-priority text
pub const HIGH_SEARCH_WORDS_FIELD: &str = "high_search_words";

/// Full normalized body text
pub const LOW_SEARCH_TEXT_FIELD: &str = "low_search_text";

/// Text-match score attached to results of a text search
pub const TEXT_SCORE_FIELD: &str = "text_score";

/// A queryable document collection.
///
/// All three operations evaluate the same criteria model; `find` alone
/// honors projection, sort, skip, and limit. Failures propagate
/// verbatim to the caller.
pub trait DocumentStore: Send + Sync {
    /// Executes a finalized query and returns matching documents in
    /// query order.
    fn find(&self, query: &StoreQuery) -> StoreResult<Vec<Value>>;

    /// Counts documents matching the criteria, ignoring pagination.
    fn count(&self, criteria: &Criteria) -> StoreResult<u64>;

    /// Returns the distinct values of `field` across matching
    /// documents. Array-valued fields contribute each element.
    fn distinct(&self, field: &str, criteria: &Criteria) -> StoreResult<Vec<Value>>;
}
