//! Store error types
//!
//! Store failures are surfaced verbatim to the caller of the yielding
//! cursor method. This layer adds no retry, backoff, or interpretation.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a document store backend
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The query handed to the store was malformed (bad pattern, etc.)
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The backend itself failed
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<regex::Error> for StoreError {
    fn from(err: regex::Error) -> Self {
        StoreError::InvalidQuery(err.to_string())
    }
}
