use thiserror::Error;

use crate::traits::StoreError;

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    /// The event references a request that does not exist. Permanent for this event; no partial
    /// effects have been applied when this is raised.
    #[error("The referenced request {0} does not exist")]
    RequestNotFound(i64),
    /// The event references a company that does not exist. Permanent for this event.
    #[error("The referenced company {0} does not exist")]
    CompanyNotFound(i64),
    /// An I/O failure talking to the entity store. Retryable: the claim is released and the
    /// provider's retry-with-backoff is the recovery path.
    #[error("Storage error. {0}")]
    StoreError(#[from] StoreError),
}

impl ReconciliationError {
    /// Whether redelivering the same event can succeed. Permanent errors should be acknowledged
    /// to the provider so it stops retrying a lost cause.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconciliationError::StoreError(_))
    }
}
