//! Cursor error types
//!
//! Usage errors (bad registration, engine misconfiguration) fail fast
//! and loudly. Finalizer and store failures abort the in-flight query
//! and propagate verbatim; there is no partial-result or retry policy
//! on the read side.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for cursor operations
pub type CursorResult<T> = Result<T, CursorError>;

/// Errors raised while building, finalizing, or executing a cursor
#[derive(Debug, Clone, Error)]
pub enum CursorError {
    /// A filter name was registered twice on one cursor definition
    #[error("duplicate filter registration: {0}")]
    DuplicateFilter(String),

    /// The finalizer sequence kept requesting restarts and never
    /// converged
    #[error("finalization did not converge after {passes} passes")]
    RefinalizeLoop { passes: usize },

    /// A filter's finalizer failed
    #[error("filter '{filter}' failed to finalize: {message}")]
    Finalize { filter: String, message: String },

    /// An after-load hook failed
    #[error("after-load hook failed: {0}")]
    Hook(String),

    /// The document engine was assembled without a required binding
    #[error("engine configuration error: {0}")]
    Config(String),

    /// A store-level failure, surfaced unchanged
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CursorError {
    /// Convenience constructor for filter authors
    pub fn finalize(filter: impl Into<String>, message: impl Into<String>) -> Self {
        CursorError::Finalize {
            filter: filter.into(),
            message: message.into(),
        }
    }
}
