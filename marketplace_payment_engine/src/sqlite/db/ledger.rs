use chrono::Duration;
use log::warn;
use sqlx::SqliteConnection;

use crate::{
    db_types::{EventId, LedgerStatus, ProcessedEvent},
    traits::{ClaimOutcome, StoreError},
};

/// Atomically claim an event id, or detect a duplicate.
///
/// The upsert relies on the UNIQUE constraint on `event_id`: a fresh id inserts a
/// [`LedgerStatus::Claimed`] row; a known id only refreshes the claim when the previous one has
/// lapsed (still claimed after the lease expired, i.e. a worker crashed between claim and
/// commit). In every other case zero rows change and the row's status tells duplicates apart
/// from in-flight claims.
pub async fn try_claim(
    event_id: &EventId,
    lease: Duration,
    conn: &mut SqliteConnection,
) -> Result<ClaimOutcome, StoreError> {
    let lease_secs = lease.num_seconds().max(0);
    let res = sqlx::query(
        r#"
            INSERT INTO processed_events (event_id, status) VALUES ($1, $2)
            ON CONFLICT (event_id) DO UPDATE SET claimed_at = CURRENT_TIMESTAMP
            WHERE processed_events.status = $2
              AND processed_events.claimed_at <= datetime('now', '-' || $3 || ' seconds')
        "#,
    )
    .bind(event_id.as_str())
    .bind(LedgerStatus::Claimed.to_string())
    .bind(lease_secs)
    .execute(&mut *conn)
    .await?;
    if res.rows_affected() > 0 {
        return Ok(ClaimOutcome::Claimed);
    }
    let row = sqlx::query_as::<_, ProcessedEvent>(
        "SELECT id, event_id, status, claimed_at, processed_at FROM processed_events WHERE event_id = $1",
    )
    .bind(event_id.as_str())
    .fetch_optional(conn)
    .await?;
    match row {
        Some(row) if row.status == LedgerStatus::Processed => Ok(ClaimOutcome::AlreadyProcessed),
        Some(_) => Ok(ClaimOutcome::InFlight),
        None => {
            // The conflicting claim was released between our two statements. The provider will
            // redeliver; treat it like an in-flight claim rather than looping here.
            warn!("🗃️ Ledger row for event {event_id} vanished mid-claim. Deferring to redelivery.");
            Ok(ClaimOutcome::InFlight)
        },
    }
}

pub async fn commit(event_id: &EventId, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let res = sqlx::query(
        r#"
            UPDATE processed_events
            SET status = $2, processed_at = CURRENT_TIMESTAMP
            WHERE event_id = $1 AND status = $3
        "#,
    )
    .bind(event_id.as_str())
    .bind(LedgerStatus::Processed.to_string())
    .bind(LedgerStatus::Claimed.to_string())
    .execute(conn)
    .await?;
    if res.rows_affected() == 0 {
        warn!("🗃️ Commit for event {event_id} found no live claim. The lease may have expired mid-processing.");
    }
    Ok(())
}

pub async fn release(event_id: &EventId, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM processed_events WHERE event_id = $1 AND status = $2")
        .bind(event_id.as_str())
        .bind(LedgerStatus::Claimed.to_string())
        .execute(conn)
        .await?;
    Ok(())
}
