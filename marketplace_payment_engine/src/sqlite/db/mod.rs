//! # SQLite database methods
//!
//! "Low-level" SQLite interactions for the marketplace entities and the idempotency ledger.
//!
//! All interactions are plain functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or create an
//! atomic transaction as the need arises and call through without any other changes.

use std::str::FromStr;

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::traits::StoreError;

pub mod companies;
pub mod conversations;
pub mod ledger;
pub mod listings;
pub mod requests;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::migrate!("./src/sqlite/migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
    info!("🗃️ Database migrations complete");
    Ok(())
}
