//! Backend traits for the reconciliation engine.
//!
//! Specific backends (currently SQLite) implement these traits to act as the entity store and
//! idempotency ledger for the engine. The [`crate::reconciler::ReconcilerApi`] is generic over
//! them, which is also what lets the server's endpoint tests run against mocks.

mod event_ledger;
mod marketplace_store;

pub use event_ledger::{ClaimOutcome, EventLedger};
pub use marketplace_store::{MarketplaceStore, StoreError};
