//! Canonical payment-provider events.
//!
//! The provider delivers a loosely-shaped JSON envelope. Everything the engine consumes is
//! decoded here, at the boundary, into a small closed set of tagged variants. Fields the engine
//! does not use are dropped during decoding so that no handler ever depends on the provider's
//! wire shapes. Unknown event families decode to [`PaymentEventKind::Unknown`] and are
//! acknowledged as a no-op downstream.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::db_types::EventId;

pub const FAMILY_CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const FAMILY_SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const FAMILY_SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const FAMILY_INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";

#[derive(Debug, Clone, Error)]
pub enum EventDecodeError {
    #[error("The event body is not valid JSON. {0}")]
    MalformedEnvelope(String),
    #[error("The event payload for family '{family}' is malformed. {reason}")]
    MalformedPayload { family: String, reason: String },
    #[error("The checkout metadata is missing the required field '{0}'")]
    MissingMetadata(&'static str),
    #[error("The checkout metadata field '{0}' is not a valid id: {1}")]
    InvalidMetadataId(&'static str, String),
    #[error("The checkout metadata 'type' discriminator '{0}' is not recognised")]
    UnknownCheckoutType(String),
}

/// A fully decoded, verified provider event.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
    pub id: EventId,
    /// When the provider generated the event. Used as the stale-event guard for subscription
    /// lifecycle updates.
    pub created: DateTime<Utc>,
    pub kind: PaymentEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEventKind {
    CheckoutCompleted(CheckoutMetadata),
    SubscriptionUpdated {
        subscription_ref: String,
        status: ProviderSubscriptionStatus,
        current_period_end: Option<DateTime<Utc>>,
    },
    SubscriptionDeleted {
        subscription_ref: String,
    },
    InvoicePaymentFailed {
        subscription_ref: Option<String>,
    },
    /// An event family the engine intentionally ignores.
    Unknown(String),
}

impl PaymentEventKind {
    pub fn family(&self) -> &str {
        match self {
            PaymentEventKind::CheckoutCompleted(_) => FAMILY_CHECKOUT_COMPLETED,
            PaymentEventKind::SubscriptionUpdated { .. } => FAMILY_SUBSCRIPTION_UPDATED,
            PaymentEventKind::SubscriptionDeleted { .. } => FAMILY_SUBSCRIPTION_DELETED,
            PaymentEventKind::InvoicePaymentFailed { .. } => FAMILY_INVOICE_PAYMENT_FAILED,
            PaymentEventKind::Unknown(family) => family.as_str(),
        }
    }
}

/// The subscription status vocabulary the provider uses. Mapped onto the internal
/// [`SubscriptionStatus`](crate::db_types::SubscriptionStatus) by the subscription-updated
/// handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Other(String),
}

impl From<&str> for ProviderSubscriptionStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            other => Self::Other(other.to_string()),
        }
    }
}

/// The metadata attached by the checkout-session creation flow. The `type` discriminator tells
/// the engine which monetization product was bought.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutMetadata {
    Subscription {
        company_id: i64,
        customer_ref: Option<String>,
        subscription_ref: Option<String>,
    },
    MatchmakingFee {
        request_id: i64,
        /// The buyer company paying the fee.
        company_id: i64,
        vendor_id: i64,
        listing_id: Option<i64>,
    },
}

//--------------------------------------  wire-shape structs  --------------------------------------------------------
// These exist only inside this module. Nothing outside the decoder sees them.

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    family: String,
    created: i64,
    data: DataWrapper,
}

#[derive(Debug, Deserialize)]
struct DataWrapper {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutObject {
    customer: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    metadata: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    id: String,
    status: String,
    current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InvoiceObject {
    subscription: Option<String>,
}

//--------------------------------------       decoding       --------------------------------------------------------

/// Decode a raw (already signature-verified) provider event body into a [`PaymentEvent`].
pub fn decode_event(body: &[u8]) -> Result<PaymentEvent, EventDecodeError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| EventDecodeError::MalformedEnvelope(e.to_string()))?;
    let created = DateTime::from_timestamp(envelope.created, 0).ok_or_else(|| {
        EventDecodeError::MalformedEnvelope(format!("'created' is not a valid unix timestamp: {}", envelope.created))
    })?;
    let kind = decode_kind(&envelope.family, envelope.data.object)?;
    Ok(PaymentEvent { id: EventId::from(envelope.id), created, kind })
}

fn decode_kind(family: &str, object: Value) -> Result<PaymentEventKind, EventDecodeError> {
    let malformed = |e: serde_json::Error| EventDecodeError::MalformedPayload {
        family: family.to_string(),
        reason: e.to_string(),
    };
    match family {
        FAMILY_CHECKOUT_COMPLETED => {
            let checkout: CheckoutObject = serde_json::from_value(object).map_err(malformed)?;
            let metadata = decode_checkout_metadata(&checkout)?;
            Ok(PaymentEventKind::CheckoutCompleted(metadata))
        },
        FAMILY_SUBSCRIPTION_UPDATED => {
            let sub: SubscriptionObject = serde_json::from_value(object).map_err(malformed)?;
            let current_period_end = sub.current_period_end.and_then(|ts| DateTime::from_timestamp(ts, 0));
            Ok(PaymentEventKind::SubscriptionUpdated {
                subscription_ref: sub.id,
                status: ProviderSubscriptionStatus::from(sub.status.as_str()),
                current_period_end,
            })
        },
        FAMILY_SUBSCRIPTION_DELETED => {
            let sub: SubscriptionObject = serde_json::from_value(object).map_err(malformed)?;
            Ok(PaymentEventKind::SubscriptionDeleted { subscription_ref: sub.id })
        },
        FAMILY_INVOICE_PAYMENT_FAILED => {
            let invoice: InvoiceObject = serde_json::from_value(object).map_err(malformed)?;
            Ok(PaymentEventKind::InvoicePaymentFailed { subscription_ref: invoice.subscription })
        },
        other => Ok(PaymentEventKind::Unknown(other.to_string())),
    }
}

fn decode_checkout_metadata(checkout: &CheckoutObject) -> Result<CheckoutMetadata, EventDecodeError> {
    let discriminator = metadata_str(checkout, "type").ok_or(EventDecodeError::MissingMetadata("type"))?;
    match discriminator.as_str() {
        "SUBSCRIPTION" => Ok(CheckoutMetadata::Subscription {
            company_id: metadata_id(checkout, "companyId")?,
            customer_ref: checkout.customer.clone(),
            subscription_ref: checkout.subscription.clone(),
        }),
        "MATCHMAKING_FEE" => Ok(CheckoutMetadata::MatchmakingFee {
            request_id: metadata_id(checkout, "requestId")?,
            company_id: metadata_id(checkout, "companyId")?,
            vendor_id: metadata_id(checkout, "vendorId")?,
            listing_id: match metadata_str(checkout, "listingId") {
                Some(_) => Some(metadata_id(checkout, "listingId")?),
                None => None,
            },
        }),
        other => Err(EventDecodeError::UnknownCheckoutType(other.to_string())),
    }
}

fn metadata_str(checkout: &CheckoutObject, key: &str) -> Option<String> {
    checkout.metadata.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn metadata_id(checkout: &CheckoutObject, key: &'static str) -> Result<i64, EventDecodeError> {
    let raw = metadata_str(checkout, key).ok_or(EventDecodeError::MissingMetadata(key))?;
    raw.parse::<i64>().map_err(|_| EventDecodeError::InvalidMetadataId(key, raw))
}
