use chrono::Duration;

use crate::{db_types::EventId, traits::StoreError};

/// What [`EventLedger::try_claim`] observed for an event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller holds the claim and must either commit or release it.
    Claimed,
    /// The event was fully applied by an earlier delivery.
    AlreadyProcessed,
    /// Another worker holds a live claim on this event. Treated the same as a duplicate by the
    /// engine; if the other worker crashes, the claim lapses and a redelivery will reclaim it.
    InFlight,
}

/// The durable idempotency ledger.
///
/// For any event id, at most one concurrent caller observes [`ClaimOutcome::Claimed`]; the
/// others see `AlreadyProcessed` or `InFlight`. A claim that is never committed expires after
/// the lease duration, at which point a redelivery of the same event may reclaim it. This is
/// what converts the provider's at-least-once delivery into effectively-once application,
/// provided the handlers themselves are re-entrant-safe.
#[allow(async_fn_in_trait)]
pub trait EventLedger {
    /// Atomically claim the event id, or detect that it is a duplicate. `lease` bounds how long
    /// an uncommitted claim shadows redeliveries.
    async fn try_claim(&self, event_id: &EventId, lease: Duration) -> Result<ClaimOutcome, StoreError>;

    /// Mark the event as fully applied. Must be called after all entity mutations succeed.
    async fn commit(&self, event_id: &EventId) -> Result<(), StoreError>;

    /// Drop an uncommitted claim so the provider's next redelivery can retry immediately rather
    /// than waiting out the lease.
    async fn release(&self, event_id: &EventId) -> Result<(), StoreError>;
}
