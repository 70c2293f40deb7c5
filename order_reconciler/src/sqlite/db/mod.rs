//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interactions are simple functions (rather than stateful structs) that accept a `&mut SqliteConnection`
//! argument. Callers can obtain a connection from a pool, or open a transaction when several statements must be
//! atomic, and call through to the functions without any other changes.
use std::{env, time::Duration};

use chrono::Utc;
use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod activities;
pub mod balances;
pub mod cache;
pub mod listings;
pub mod locks;
pub mod orders;

const SQLITE_DB_URL: &str = "sqlite://data/reconciler.db";

pub fn db_url() -> String {
    let result = env::var("RCW_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ RCW_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// The instant `ttl` from now, in unix milliseconds, as stored in the expiry columns.
pub(crate) fn expiry_millis(ttl: Duration) -> i64 {
    now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
