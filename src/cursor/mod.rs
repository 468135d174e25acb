//! Cursor subsystem
//!
//! A cursor accumulates filter state through chainable setters and
//! converts it into a concrete store query during finalization.
//!
//! # Finalization (strict order)
//!
//! 1. For each registered filter, in registration order: apply the
//!    declared default if the filter was never invoked
//! 2. Run the filter's finalizer
//! 3. A `Restart` outcome re-runs the whole sequence from the first
//!    filter (finalizers are idempotent, so this is safe)
//! 4. Any error aborts the pass and propagates verbatim
//!
//! # Invariants
//!
//! - Finalization is idempotent: repeated yielding calls on an
//!   unchanged cursor derive structurally identical store queries
//! - Narrowing filters compose through AND only; clause order never
//!   changes which documents match
//! - Explicit ordering is authoritative over store-level sort

mod autocomplete;
mod catalog;
mod cursor;
mod errors;
mod registry;
mod state;

pub use catalog::{names, standard_filters, DEFAULT_PERMISSION};
pub use cursor::Cursor;
pub use errors::{CursorError, CursorResult};
pub use registry::{FilterDef, FilterRegistry, FilterRegistryBuilder, FinalizeOutcome, Finalizer};
pub use state::{CursorState, ExplicitOrder, FilterValue};
