use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{Request, RequestStatus, RequestWithRelations, VendorContact},
    traits::StoreError,
};

#[derive(FromRow)]
struct RequestRelationsRow {
    id: i64,
    status: RequestStatus,
    buyer_company_id: i64,
    vendor_company_id: i64,
    listing_id: Option<i64>,
    conversation_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    contact_name: Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
}

/// Fetches a request joined with the vendor company's contact fields. The conversation is
/// referenced by id on the request itself; there is no authoritative back-pointer to load.
pub async fn fetch_request_with_relations(
    request_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<RequestWithRelations>, StoreError> {
    let row = sqlx::query_as::<_, RequestRelationsRow>(
        r#"
            SELECT
                r.id,
                r.status,
                r.buyer_company_id,
                r.vendor_company_id,
                r.listing_id,
                r.conversation_id,
                r.created_at,
                r.updated_at,
                c.contact_name,
                c.contact_email,
                c.contact_phone
            FROM requests r
            JOIN companies c ON c.id = r.vendor_company_id
            WHERE r.id = $1
        "#,
    )
    .bind(request_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| RequestWithRelations {
        request: Request {
            id: r.id,
            status: r.status,
            buyer_company_id: r.buyer_company_id,
            vendor_company_id: r.vendor_company_id,
            listing_id: r.listing_id,
            conversation_id: r.conversation_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        },
        vendor: VendorContact {
            company_id: r.vendor_company_id,
            name: r.contact_name,
            email: r.contact_email,
            phone: r.contact_phone,
        },
    }))
}

/// Compare-and-swap on the request status. Zero rows affected means the request was not in the
/// expected prior state, which is how callers detect "already applied" or a forbidden
/// transition without ever corrupting state.
pub async fn update_request_status(
    request_id: i64,
    from: RequestStatus,
    to: RequestStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let res = sqlx::query(
        "UPDATE requests SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3",
    )
    .bind(to.to_string())
    .bind(request_id)
    .bind(from.to_string())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() > 0)
}
