//! `SqliteDatabase` is a concrete backend for the reconciliation engine.
//!
//! Unsurprisingly, it uses SQLite, and implements both the [`MarketplaceStore`] and
//! [`EventLedger`] traits by delegating to the functions in [`super::db`].

use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use super::db::{companies, conversations, ledger, listings, new_pool, requests, run_migrations};
use crate::{
    db_types::{
        Company,
        EventId,
        Listing,
        ListingStatus,
        Message,
        RequestStatus,
        RequestWithRelations,
        SubscriptionUpdate,
    },
    traits::{ClaimOutcome, EventLedger, MarketplaceStore, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates the database if necessary, connects, and brings the schema up to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        run_migrations(&pool).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceStore for SqliteDatabase {
    async fn fetch_company(&self, id: i64) -> Result<Option<Company>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        companies::fetch_company(id, &mut conn).await
    }

    async fn fetch_company_by_subscription_ref(
        &self,
        subscription_ref: &str,
    ) -> Result<Option<Company>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        companies::fetch_company_by_subscription_ref(subscription_ref, &mut conn).await
    }

    async fn update_company_subscription(
        &self,
        company_id: i64,
        update: SubscriptionUpdate,
        event_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        companies::update_subscription(company_id, update, event_at, &mut conn).await
    }

    async fn fetch_request_with_relations(
        &self,
        request_id: i64,
    ) -> Result<Option<RequestWithRelations>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        requests::fetch_request_with_relations(request_id, &mut conn).await
    }

    async fn update_request_status(
        &self,
        request_id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        requests::update_request_status(request_id, from, to, &mut conn).await
    }

    async fn fetch_listing(&self, id: i64) -> Result<Option<Listing>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_listing(id, &mut conn).await
    }

    async fn update_listing_status(
        &self,
        listing_id: i64,
        from: ListingStatus,
        to: ListingStatus,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::update_listing_status(listing_id, from, to, &mut conn).await
    }

    async fn append_system_message(&self, conversation_id: i64, content: &str) -> Result<Message, StoreError> {
        let mut conn = self.pool.acquire().await?;
        conversations::append_system_message(conversation_id, content, &mut conn).await
    }

    async fn fetch_messages(&self, conversation_id: i64) -> Result<Vec<Message>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        conversations::fetch_messages(conversation_id, &mut conn).await
    }

    async fn decrement_founding_deals(&self, company_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        companies::decrement_founding_deals(company_id, &mut conn).await
    }
}

impl EventLedger for SqliteDatabase {
    async fn try_claim(&self, event_id: &EventId, lease: Duration) -> Result<ClaimOutcome, StoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::try_claim(event_id, lease, &mut conn).await
    }

    async fn commit(&self, event_id: &EventId) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::commit(event_id, &mut conn).await
    }

    async fn release(&self, event_id: &EventId) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        ledger::release(event_id, &mut conn).await
    }
}
