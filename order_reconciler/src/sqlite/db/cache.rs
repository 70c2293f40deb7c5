use std::time::Duration;

use sqlx::SqliteConnection;

use crate::{
    sqlite::db::{expiry_millis, now_millis},
    traits::StoreError,
};

/// Stores the value if the key is missing or expired. Returns `true` if this call stored it.
pub async fn set_if_absent(
    key: &str,
    value: &str,
    ttl: Duration,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
            INSERT INTO cache_entries (key, value, expires_at) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            WHERE cache_entries.expires_at <= $4
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(expiry_millis(ttl))
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes `key`. Returns `true` if the entry had not expired yet.
pub async fn remove(key: &str, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let expires_at: Option<i64> = sqlx::query_scalar("DELETE FROM cache_entries WHERE key = $1 RETURNING expires_at")
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(expires_at.is_some_and(|t| t > now_millis()))
}
