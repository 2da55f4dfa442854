use chrono::{DateTime, Duration, Utc};
use marketplace_payment_engine::{
    db_types::{
        Company,
        EventId,
        Listing,
        ListingStatus,
        Message,
        RequestStatus,
        RequestWithRelations,
        SubscriptionStatus,
        SubscriptionTier,
        SubscriptionUpdate,
    },
    ClaimOutcome,
    EventLedger,
    MarketplaceStore,
    StoreError,
};
use mockall::mock;

mock! {
    pub Backend {}
    impl MarketplaceStore for Backend {
        async fn fetch_company(&self, id: i64) -> Result<Option<Company>, StoreError>;
        async fn fetch_company_by_subscription_ref(&self, subscription_ref: &str) -> Result<Option<Company>, StoreError>;
        async fn update_company_subscription(&self, company_id: i64, update: SubscriptionUpdate, event_at: DateTime<Utc>) -> Result<bool, StoreError>;
        async fn fetch_request_with_relations(&self, request_id: i64) -> Result<Option<RequestWithRelations>, StoreError>;
        async fn update_request_status(&self, request_id: i64, from: RequestStatus, to: RequestStatus) -> Result<bool, StoreError>;
        async fn fetch_listing(&self, id: i64) -> Result<Option<Listing>, StoreError>;
        async fn update_listing_status(&self, listing_id: i64, from: ListingStatus, to: ListingStatus) -> Result<bool, StoreError>;
        async fn append_system_message(&self, conversation_id: i64, content: &str) -> Result<Message, StoreError>;
        async fn fetch_messages(&self, conversation_id: i64) -> Result<Vec<Message>, StoreError>;
        async fn decrement_founding_deals(&self, company_id: i64) -> Result<bool, StoreError>;
    }
    impl EventLedger for Backend {
        async fn try_claim(&self, event_id: &EventId, lease: Duration) -> Result<ClaimOutcome, StoreError>;
        async fn commit(&self, event_id: &EventId) -> Result<(), StoreError>;
        async fn release(&self, event_id: &EventId) -> Result<(), StoreError>;
    }
}

pub fn test_company(id: i64) -> Company {
    Company {
        id,
        name: "Test Co".to_string(),
        contact_name: None,
        contact_email: None,
        contact_phone: None,
        subscription_status: SubscriptionStatus::Free,
        subscription_tier: SubscriptionTier::Free,
        external_customer_ref: None,
        external_subscription_ref: None,
        subscription_ends_at: None,
        subscription_event_at: None,
        is_founding_member: false,
        founding_deals_remaining: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
