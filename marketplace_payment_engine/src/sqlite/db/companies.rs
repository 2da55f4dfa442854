use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Company, SubscriptionUpdate},
    traits::StoreError,
};

const COMPANY_COLUMNS: &str = r#"
    id,
    name,
    contact_name,
    contact_email,
    contact_phone,
    subscription_status,
    subscription_tier,
    external_customer_ref,
    external_subscription_ref,
    subscription_ends_at,
    subscription_event_at,
    is_founding_member,
    founding_deals_remaining,
    created_at,
    updated_at
"#;

pub async fn fetch_company(id: i64, conn: &mut SqliteConnection) -> Result<Option<Company>, StoreError> {
    let query = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1");
    let company = sqlx::query_as::<_, Company>(&query).bind(id).fetch_optional(conn).await?;
    Ok(company)
}

pub async fn fetch_company_by_subscription_ref(
    subscription_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Company>, StoreError> {
    let query = format!("SELECT {COMPANY_COLUMNS} FROM companies WHERE external_subscription_ref = $1");
    let company = sqlx::query_as::<_, Company>(&query).bind(subscription_ref).fetch_optional(conn).await?;
    Ok(company)
}

/// Applies a partial subscription update, guarded against stale out-of-order events: the write
/// only lands when the stored `subscription_event_at` is null or not newer than `event_at`.
/// Returns whether a row changed.
pub async fn update_subscription(
    company_id: i64,
    update: SubscriptionUpdate,
    event_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    if update.is_empty() {
        trace!("🗃️ Empty subscription update for company #{company_id}. Skipped.");
        return Ok(false);
    }
    let mut builder = QueryBuilder::new("UPDATE companies SET updated_at = CURRENT_TIMESTAMP, subscription_event_at = ");
    builder.push_bind(event_at);
    if let Some(status) = update.status {
        builder.push(", subscription_status = ");
        builder.push_bind(status.to_string());
    }
    if let Some(tier) = update.tier {
        builder.push(", subscription_tier = ");
        builder.push_bind(tier.to_string());
    }
    if let Some(customer_ref) = update.customer_ref {
        builder.push(", external_customer_ref = ");
        builder.push_bind(customer_ref);
    }
    if update.clear_subscription_ref {
        builder.push(", external_subscription_ref = NULL");
    } else if let Some(subscription_ref) = update.subscription_ref {
        builder.push(", external_subscription_ref = ");
        builder.push_bind(subscription_ref);
    }
    if update.clear_ends_at {
        builder.push(", subscription_ends_at = NULL");
    } else if let Some(ends_at) = update.ends_at {
        builder.push(", subscription_ends_at = ");
        builder.push_bind(ends_at);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(company_id);
    builder.push(" AND (subscription_event_at IS NULL OR subscription_event_at <= ");
    builder.push_bind(event_at);
    builder.push(")");
    trace!("🗃️ Executing query: {}", builder.sql());
    let res = builder.build().execute(conn).await?;
    Ok(res.rows_affected() > 0)
}

/// Decrements the founding-member deal quota by one. The guard clause makes a double decrement
/// or a negative counter impossible to apply, whatever the caller does.
pub async fn decrement_founding_deals(company_id: i64, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let res = sqlx::query(
        r#"
            UPDATE companies
            SET founding_deals_remaining = founding_deals_remaining - 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND is_founding_member AND founding_deals_remaining > 0
        "#,
    )
    .bind(company_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() > 0)
}
