//! Claim, commit and release semantics of the durable idempotency ledger.

mod common;

use chrono::Duration;
use common::prepare_test_db;
use marketplace_payment_engine::{
    db_types::{LedgerStatus, ProcessedEvent},
    ClaimOutcome,
    EventLedger,
};

#[tokio::test]
async fn a_fresh_event_id_is_claimed() {
    let db = prepare_test_db().await;
    let outcome = db.try_claim(&"evt_1".parse().unwrap(), Duration::minutes(5)).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::Claimed);
}

#[tokio::test]
async fn a_live_claim_blocks_other_workers() {
    let db = prepare_test_db().await;
    let id = "evt_1".parse().unwrap();
    db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    let outcome = db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::InFlight);
}

#[tokio::test]
async fn a_committed_event_reports_already_processed() {
    let db = prepare_test_db().await;
    let id = "evt_1".parse().unwrap();
    db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    db.commit(&id).await.unwrap();
    let outcome = db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::AlreadyProcessed);
}

#[tokio::test]
async fn a_released_event_id_can_be_claimed_again() {
    let db = prepare_test_db().await;
    let id = "evt_1".parse().unwrap();
    db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    db.release(&id).await.unwrap();
    let outcome = db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::Claimed);
}

#[tokio::test]
async fn an_expired_lease_is_reclaimed() {
    // A zero-length lease means every standing claim is immediately expired, which stands in
    // for a worker that died mid-processing.
    let db = prepare_test_db().await;
    let id = "evt_1".parse().unwrap();
    db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    let outcome = db.try_claim(&id, Duration::zero()).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::Claimed);
}

#[tokio::test]
async fn commit_holds_even_against_an_expired_lease() {
    let db = prepare_test_db().await;
    let id = "evt_1".parse().unwrap();
    db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    db.commit(&id).await.unwrap();
    let outcome = db.try_claim(&id, Duration::zero()).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::AlreadyProcessed);
}

#[tokio::test]
async fn the_ledger_row_round_trips_through_the_typed_model() {
    // The queries in the ledger bind LedgerStatus rather than ad-hoc strings; decoding the row
    // back into ProcessedEvent proves the two vocabularies cannot drift apart.
    let db = prepare_test_db().await;
    let id = "evt_1".parse().unwrap();
    db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    db.commit(&id).await.unwrap();
    let row = sqlx::query_as::<_, ProcessedEvent>(
        "SELECT id, event_id, status, claimed_at, processed_at FROM processed_events WHERE event_id = $1",
    )
    .bind(id.as_str())
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(row.event_id, id);
    assert_eq!(row.status, LedgerStatus::Processed);
    assert!(row.processed_at.is_some());
}

#[tokio::test]
async fn releasing_a_committed_event_does_not_unwind_it() {
    let db = prepare_test_db().await;
    let id = "evt_1".parse().unwrap();
    db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    db.commit(&id).await.unwrap();
    db.release(&id).await.unwrap();
    let outcome = db.try_claim(&id, Duration::minutes(5)).await.unwrap();
    assert_eq!(outcome, ClaimOutcome::AlreadyProcessed);
}
