//! doccursor - a filter-driven document query and cursor engine
//!
//! A cursor is a chainable query builder bound to an abstract document
//! store and a request context. Named filters accumulate state; a
//! deterministic finalization pass converts that state into a concrete
//! store query immediately before execution.

pub mod cursor;
pub mod engine;
pub mod observability;
pub mod store;
pub mod text;
