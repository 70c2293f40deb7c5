use std::time::Duration;

use log::trace;
use sqlx::SqliteConnection;

use crate::{
    sqlite::db::{expiry_millis, now_millis},
    traits::StoreError,
};

/// Takes `name` for `token` if it is free or its previous holder's lease has run out. Returns `false` if another
/// holder still has it.
pub async fn try_take(
    name: &str,
    token: &str,
    ttl: Duration,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
            INSERT INTO scheduler_locks (name, token, expires_at) VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET token = excluded.token, expires_at = excluded.expires_at
            WHERE scheduler_locks.expires_at <= $4
        "#,
    )
    .bind(name)
    .bind(token)
    .bind(expiry_millis(ttl))
    .bind(now_millis())
    .execute(conn)
    .await?;
    let taken = result.rows_affected() > 0;
    trace!("🔒️ Lock {name} taken: {taken}");
    Ok(taken)
}
