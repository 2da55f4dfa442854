mod event_signature;

pub use event_signature::{sign_payload, verify_event, VerificationError};
