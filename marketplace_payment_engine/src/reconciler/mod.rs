//! The reconciliation engine: the single entry point that turns verified provider events into
//! idempotent marketplace state transitions.

mod api;
mod errors;

pub use api::{EventOutcome, ReconcilerApi};
pub use errors::ReconciliationError;
