use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{
    Company,
    Listing,
    ListingStatus,
    Message,
    RequestStatus,
    RequestWithRelations,
    SubscriptionUpdate,
};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The store did not respond within the configured timeout")]
    Timeout,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            e => StoreError::DatabaseError(e.to_string()),
        }
    }
}

/// Transactional access to the four mutable marketplace entities.
///
/// Every mutation is a conditional write scoped to the entity's primary key and reports whether
/// it actually changed state. That is what lets the transition handlers detect "already applied"
/// on redelivery instead of blindly re-running side effects. Serialisation of concurrent events
/// for the same entity falls out of the conditional updates; no handler takes locks.
#[allow(async_fn_in_trait)]
pub trait MarketplaceStore {
    async fn fetch_company(&self, id: i64) -> Result<Option<Company>, StoreError>;

    /// Look a company up by the opaque subscription reference the provider assigned at checkout.
    /// This is how subscription lifecycle events, which carry no marketplace ids, find their
    /// target.
    async fn fetch_company_by_subscription_ref(&self, subscription_ref: &str)
        -> Result<Option<Company>, StoreError>;

    /// Apply a partial update to a company's subscription columns.
    ///
    /// The update only lands if the stored `subscription_event_at` is null or not newer than
    /// `event_at`, which rejects stale out-of-order lifecycle events. Returns whether a row was
    /// changed.
    async fn update_company_subscription(
        &self,
        company_id: i64,
        update: SubscriptionUpdate,
        event_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Fetch a request together with the relations deal finalization needs (conversation id and
    /// the vendor's contact fields).
    async fn fetch_request_with_relations(&self, request_id: i64)
        -> Result<Option<RequestWithRelations>, StoreError>;

    /// Transition a request's status from `from` to `to`. Returns whether the transition fired;
    /// `false` means the request was not in the expected prior state (or does not exist).
    async fn update_request_status(
        &self,
        request_id: i64,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<bool, StoreError>;

    async fn fetch_listing(&self, id: i64) -> Result<Option<Listing>, StoreError>;

    /// Transition a listing's status from `from` to `to`, compare-and-swap style.
    async fn update_listing_status(
        &self,
        listing_id: i64,
        from: ListingStatus,
        to: ListingStatus,
    ) -> Result<bool, StoreError>;

    /// Append a system-authored message (null sender) to a conversation. Appending is the only
    /// mutation messages support; content is immutable once created.
    async fn append_system_message(&self, conversation_id: i64, content: &str) -> Result<Message, StoreError>;

    /// All messages in a conversation, oldest first.
    async fn fetch_messages(&self, conversation_id: i64) -> Result<Vec<Message>, StoreError>;

    /// Decrement the founding-member deal quota by exactly one, guarded in SQL so that the
    /// counter can never go negative and non-founding companies are untouched. Returns whether a
    /// decrement happened.
    async fn decrement_founding_deals(&self, company_id: i64) -> Result<bool, StoreError>;
}
