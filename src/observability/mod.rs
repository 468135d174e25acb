//! Observability for the cursor engine
//!
//! Structured JSON logging: one line per event, explicit severity,
//! deterministic key ordering, synchronous writes. Logging is
//! read-only and has no effect on query execution.

mod logger;

pub use logger::{Logger, Severity};
