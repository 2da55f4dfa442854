use sqlx::SqliteConnection;

use crate::{
    db_types::{Listing, ListingStatus},
    traits::StoreError,
};

pub async fn fetch_listing(id: i64, conn: &mut SqliteConnection) -> Result<Option<Listing>, StoreError> {
    let listing = sqlx::query_as::<_, Listing>(
        "SELECT id, vendor_company_id, title, status, created_at, updated_at FROM listings WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(listing)
}

/// Compare-and-swap on the listing status. Booking is monotonic: the engine only ever calls this
/// with `Available -> Booked`, and a listing that is already booked is left untouched.
pub async fn update_listing_status(
    listing_id: i64,
    from: ListingStatus,
    to: ListingStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let res = sqlx::query(
        "UPDATE listings SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3",
    )
    .bind(to.to_string())
    .bind(listing_id)
    .bind(from.to_string())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() > 0)
}
