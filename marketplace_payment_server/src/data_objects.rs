use std::fmt::Display;

use chrono::{DateTime, Utc};
use marketplace_payment_engine::db_types::{Company, SubscriptionStatus, SubscriptionTier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Read-only view of a company's subscription state. Provider references are deliberately not
/// exposed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatusResponse {
    pub company_id: i64,
    pub status: SubscriptionStatus,
    pub tier: SubscriptionTier,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub is_founding_member: bool,
    pub founding_deals_remaining: i64,
}

impl From<&Company> for SubscriptionStatusResponse {
    fn from(company: &Company) -> Self {
        Self {
            company_id: company.id,
            status: company.subscription_status,
            tier: company.subscription_tier,
            subscription_ends_at: company.subscription_ends_at,
            is_founding_member: company.is_founding_member,
            founding_deals_remaining: company.founding_deals_remaining,
        }
    }
}
