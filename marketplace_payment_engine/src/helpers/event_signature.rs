//! # Webhook event signatures
//!
//! The payment provider signs every delivery with HMAC-SHA256 over `"{timestamp}.{body}"`,
//! using the shared webhook secret, and sends the hex digest and the unix timestamp in two
//! request headers. Verification is a pure function of the raw bytes, the two header values,
//! the secret and a tolerance window; events older than the window are rejected to defend
//! against replays of captured deliveries.
//!
//! On success, the body is decoded into a canonical [`PaymentEvent`] so that callers never
//! touch the raw provider payload after this point.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::provider_events::{decode_event, EventDecodeError, PaymentEvent};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("The timestamp header is not a unix timestamp: {0}")]
    MalformedTimestamp(String),
    #[error("The event timestamp is outside the tolerance window ({0}s skew)")]
    StaleTimestamp(i64),
    #[error("The signature header is not a hex-encoded digest")]
    MalformedSignature,
    #[error("The signature does not match the request body")]
    SignatureMismatch,
    #[error("{0}")]
    DecodeError(#[from] EventDecodeError),
}

/// Verify a raw provider delivery and decode it into a canonical event.
///
/// `now` is passed in rather than read from the clock so the freshness check is testable.
pub fn verify_event(
    body: &[u8],
    signature: &str,
    timestamp: &str,
    secret: &str,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<PaymentEvent, VerificationError> {
    let ts_secs =
        timestamp.parse::<i64>().map_err(|_| VerificationError::MalformedTimestamp(timestamp.to_string()))?;
    let event_time = DateTime::from_timestamp(ts_secs, 0)
        .ok_or_else(|| VerificationError::MalformedTimestamp(timestamp.to_string()))?;
    let skew = (now - event_time).num_seconds().abs();
    if skew > tolerance.num_seconds() {
        return Err(VerificationError::StaleTimestamp(skew));
    }
    let digest = hex::decode(signature).map_err(|_| VerificationError::MalformedSignature)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| VerificationError::MalformedSignature)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    // verify_slice is constant-time, so no timing oracle on the digest comparison
    mac.verify_slice(&digest).map_err(|_| VerificationError::SignatureMismatch)?;
    Ok(decode_event(body)?)
}

/// Compute the hex signature for a payload. Used by tests and by tooling that replays events
/// against a local server.
pub fn sign_payload(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
