use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(pub &'static str, pub String);

//--------------------------------------      EventId       ----------------------------------------------------------
/// The opaque event identifier assigned by the payment provider. Uniqueness of this id is the
/// backbone of the idempotency ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct EventId(pub String);

impl FromStr for EventId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------  SubscriptionStatus  --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    /// No paid subscription. The default for every company.
    Free,
    /// The subscription charge has been received and the subscription is in good standing.
    Active,
    /// The most recent recurring charge failed. Access is retained while the provider retries.
    PastDue,
    /// The subscription has ended, either by the user or after exhausted payment retries.
    Cancelled,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Free => write!(f, "Free"),
            SubscriptionStatus::Active => write!(f, "Active"),
            SubscriptionStatus::PastDue => write!(f, "PastDue"),
            SubscriptionStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Free" => Ok(Self::Free),
            "Active" => Ok(Self::Active),
            "PastDue" => Ok(Self::PastDue),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError("subscription status", s.to_string())),
        }
    }
}

//--------------------------------------   SubscriptionTier   --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SubscriptionTier {
    Free,
    Buyer,
}

impl Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionTier::Free => write!(f, "Free"),
            SubscriptionTier::Buyer => write!(f, "Buyer"),
        }
    }
}

//--------------------------------------     RequestStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RequestStatus {
    /// The buyer has sent an engagement proposal to the vendor. Nothing has been paid yet.
    Pending,
    /// The matchmaking fee has been reconciled and contact details have been disclosed.
    /// This transition happens exactly once per request.
    Accepted,
    /// The vendor turned the proposal down.
    Declined,
    /// The buyer withdrew the proposal.
    Cancelled,
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::Accepted => write!(f, "Accepted"),
            RequestStatus::Declined => write!(f, "Declined"),
            RequestStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

//--------------------------------------     ListingStatus    --------------------------------------------------------
/// Booking is monotonic. Once a listing reaches `Booked`, the engine never reverts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ListingStatus {
    Available,
    Booked,
}

impl Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Available => write!(f, "Available"),
            ListingStatus::Booked => write!(f, "Booked"),
        }
    }
}

//--------------------------------------        Company       --------------------------------------------------------
/// A marketplace member. Companies are the subscription holders; the subscription columns are
/// owned exclusively by the reconciliation engine.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub subscription_tier: SubscriptionTier,
    /// Opaque customer reference assigned by the payment provider.
    pub external_customer_ref: Option<String>,
    /// Opaque subscription reference assigned by the payment provider. Cleared on cancellation.
    pub external_subscription_ref: Option<String>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    /// Creation timestamp of the provider event that last touched the subscription columns.
    /// Guards against out-of-order delivery of subscription lifecycle events.
    pub subscription_event_at: Option<DateTime<Utc>>,
    pub is_founding_member: bool,
    pub founding_deals_remaining: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Request       --------------------------------------------------------
/// An engagement proposal from a buyer company against a vendor's listing. References its
/// conversation and vendor by id only; no back-pointer is authoritative.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Request {
    pub id: i64,
    pub status: RequestStatus,
    pub buyer_company_id: i64,
    pub vendor_company_id: i64,
    pub listing_id: Option<i64>,
    pub conversation_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Listing       --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub vendor_company_id: i64,
    pub title: String,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Message       --------------------------------------------------------
/// A single entry in a conversation. `sender_company_id` is null for system-authored messages,
/// such as the contact disclosure emitted by deal finalization. Content is immutable.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_company_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_system(&self) -> bool {
        self.sender_company_id.is_none()
    }
}

//--------------------------------------    ProcessedEvent    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
pub enum LedgerStatus {
    /// The event id has been claimed by a worker but side effects have not been committed yet.
    Claimed,
    /// The event has been fully applied. Any redelivery is a duplicate.
    Processed,
}

impl Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerStatus::Claimed => write!(f, "Claimed"),
            LedgerStatus::Processed => write!(f, "Processed"),
        }
    }
}

/// A row in the idempotency ledger. The unique constraint on `event_id` is what turns
/// at-least-once delivery into effectively-once application.
#[derive(Debug, Clone, FromRow)]
pub struct ProcessedEvent {
    pub id: i64,
    pub event_id: EventId,
    pub status: LedgerStatus,
    pub claimed_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

//--------------------------------------   VendorContact      --------------------------------------------------------
/// The vendor-side contact fields disclosed to the buyer when a deal is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorContact {
    pub company_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

//--------------------------------------  RequestWithRelations -------------------------------------------------------
/// A request joined with the relations the deal finalization workflow needs: the conversation to
/// post the disclosure into, and the vendor's contact fields.
#[derive(Debug, Clone)]
pub struct RequestWithRelations {
    pub request: Request,
    pub vendor: VendorContact,
}

//--------------------------------------  SubscriptionUpdate  --------------------------------------------------------
/// A partial update of a company's subscription columns. Only the fields that are set are
/// written; `clear_*` flags null out nullable columns. Mirrors the conditional-update style of
/// every other mutation in the store: the update only lands if the stale-event guard passes.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub status: Option<SubscriptionStatus>,
    pub tier: Option<SubscriptionTier>,
    pub customer_ref: Option<String>,
    pub subscription_ref: Option<String>,
    pub clear_subscription_ref: bool,
    pub ends_at: Option<DateTime<Utc>>,
    pub clear_ends_at: bool,
}

impl SubscriptionUpdate {
    pub fn with_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tier(mut self, tier: SubscriptionTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_customer_ref<S: Into<String>>(mut self, customer_ref: S) -> Self {
        self.customer_ref = Some(customer_ref.into());
        self
    }

    pub fn with_subscription_ref<S: Into<String>>(mut self, subscription_ref: S) -> Self {
        self.subscription_ref = Some(subscription_ref.into());
        self
    }

    pub fn clearing_subscription_ref(mut self) -> Self {
        self.clear_subscription_ref = true;
        self
    }

    pub fn with_ends_at(mut self, ends_at: DateTime<Utc>) -> Self {
        self.ends_at = Some(ends_at);
        self
    }

    pub fn clearing_ends_at(mut self) -> Self {
        self.clear_ends_at = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() &&
            self.tier.is_none() &&
            self.customer_ref.is_none() &&
            self.subscription_ref.is_none() &&
            !self.clear_subscription_ref &&
            self.ends_at.is_none() &&
            !self.clear_ends_at
    }
}
