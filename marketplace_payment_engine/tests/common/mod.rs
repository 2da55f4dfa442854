//! Shared fixtures for the reconciliation integration tests: a throwaway SQLite database and a
//! small seeded marketplace (vendor, buyer, listing, conversation, request).
// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use log::debug;
use marketplace_payment_engine::{
    provider_events::{CheckoutMetadata, PaymentEvent, PaymentEventKind, ProviderSubscriptionStatus},
    SqliteDatabase,
};

pub async fn prepare_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = format!(
        "sqlite://{}/mpg_test_{}.db",
        std::env::temp_dir().to_str().expect("temp dir is not valid utf-8"),
        rand::random::<u64>()
    );
    debug!("🚀️ Creating test database {url}");
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}

pub struct Fixture {
    pub vendor_id: i64,
    pub buyer_id: i64,
    pub listing_id: i64,
    pub conversation_id: i64,
    pub request_id: i64,
}

/// Seeds the scenario from the acceptance checklist: a pending request R1 against an available
/// listing L1, a vendor reachable at `v@x.com`, and a founding-member buyer with 3 deals left.
pub async fn seed_marketplace(db: &SqliteDatabase) -> Fixture {
    let pool = db.pool();
    let vendor_id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO companies (name, contact_name, contact_email, contact_phone)
            VALUES ('Vendor Co', 'Vera Vendor', 'v@x.com', '+49-30-1234')
            RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .expect("Error seeding vendor");
    let buyer_id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO companies (name, is_founding_member, founding_deals_remaining)
            VALUES ('Buyer Co', 1, 3)
            RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .expect("Error seeding buyer");
    let listing_id: i64 = sqlx::query_scalar(
        "INSERT INTO listings (vendor_company_id, title) VALUES ($1, 'Forklift fleet, Q3') RETURNING id",
    )
    .bind(vendor_id)
    .fetch_one(pool)
    .await
    .expect("Error seeding listing");
    let conversation_id: i64 =
        sqlx::query_scalar("INSERT INTO conversations DEFAULT VALUES RETURNING id")
            .fetch_one(pool)
            .await
            .expect("Error seeding conversation");
    let request_id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO requests (buyer_company_id, vendor_company_id, listing_id, conversation_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        "#,
    )
    .bind(buyer_id)
    .bind(vendor_id)
    .bind(listing_id)
    .bind(conversation_id)
    .fetch_one(pool)
    .await
    .expect("Error seeding request");
    Fixture { vendor_id, buyer_id, listing_id, conversation_id, request_id }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid timestamp")
}

pub fn subscription_checkout(event_id: &str, created: i64, company_id: i64) -> PaymentEvent {
    PaymentEvent {
        id: event_id.parse().unwrap(),
        created: at(created),
        kind: PaymentEventKind::CheckoutCompleted(CheckoutMetadata::Subscription {
            company_id,
            customer_ref: Some("cus_test".to_string()),
            subscription_ref: Some("sub_test".to_string()),
        }),
    }
}

pub fn matchmaking_checkout(event_id: &str, created: i64, fixture: &Fixture) -> PaymentEvent {
    PaymentEvent {
        id: event_id.parse().unwrap(),
        created: at(created),
        kind: PaymentEventKind::CheckoutCompleted(CheckoutMetadata::MatchmakingFee {
            request_id: fixture.request_id,
            company_id: fixture.buyer_id,
            vendor_id: fixture.vendor_id,
            listing_id: Some(fixture.listing_id),
        }),
    }
}

pub fn subscription_updated(
    event_id: &str,
    created: i64,
    subscription_ref: &str,
    status: ProviderSubscriptionStatus,
) -> PaymentEvent {
    PaymentEvent {
        id: event_id.parse().unwrap(),
        created: at(created),
        kind: PaymentEventKind::SubscriptionUpdated {
            subscription_ref: subscription_ref.to_string(),
            status,
            current_period_end: Some(at(created + 30 * 24 * 3600)),
        },
    }
}

pub fn subscription_deleted(event_id: &str, created: i64, subscription_ref: &str) -> PaymentEvent {
    PaymentEvent {
        id: event_id.parse().unwrap(),
        created: at(created),
        kind: PaymentEventKind::SubscriptionDeleted { subscription_ref: subscription_ref.to_string() },
    }
}

pub fn invoice_failed(event_id: &str, created: i64, subscription_ref: Option<&str>) -> PaymentEvent {
    PaymentEvent {
        id: event_id.parse().unwrap(),
        created: at(created),
        kind: PaymentEventKind::InvoicePaymentFailed {
            subscription_ref: subscription_ref.map(|s| s.to_string()),
        },
    }
}
