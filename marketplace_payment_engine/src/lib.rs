//! Marketplace Payment Engine
//!
//! The engine turns the payment provider's unordered, duplicate-prone, at-least-once webhook
//! feed into correct, idempotent transitions across the marketplace entities: the
//! subscription-holding company, the engagement request, the resource listing and the
//! conversation thread. It is provider-agnostic above the decoding boundary and HTTP-agnostic
//! throughout; the companion server crate wires it to the outside world.
//!
//! The library is divided into three main sections:
//! 1. The provider boundary ([`mod@provider_events`] and [`mod@helpers`]): signature and
//!    freshness verification of raw deliveries, and decoding into a small closed set of
//!    canonical event variants.
//! 2. Storage ([`mod@traits`] and the SQLite backend): the entity store with conditional
//!    per-entity writes, and the durable idempotency ledger with its claim/commit/release lease
//!    protocol.
//! 3. The reconciliation API ([`mod@reconciler`]): routes each canonical event to its transition
//!    handler, including the multi-entity deal finalization workflow triggered by the
//!    matchmaking fee.

pub mod db_types;
pub mod helpers;
pub mod provider_events;
pub mod reconciler;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use reconciler::{EventOutcome, ReconcilerApi, ReconciliationError};
pub use traits::{ClaimOutcome, EventLedger, MarketplaceStore, StoreError};
