use chrono::Utc;
use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{ActivityEventKind, NewTransferEvent, TransferEventKey, TransferEventRow},
    pipelines::ActivityDocument,
    traits::StoreError,
};

#[derive(sqlx::FromRow)]
struct PendingEventRow {
    id: i64,
    tx_hash: String,
    log_index: i64,
    batch_index: i64,
}

/// Removes up to `limit` of the oldest pending events of `kind` and returns them, oldest first.
pub async fn pop_pending_events(
    kind: ActivityEventKind,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<TransferEventKey>, StoreError> {
    let mut rows: Vec<PendingEventRow> = sqlx::query_as(
        r#"
            DELETE FROM pending_activity_events
            WHERE id IN (SELECT id FROM pending_activity_events WHERE kind = $1 ORDER BY id LIMIT $2)
            RETURNING id, tx_hash, log_index, batch_index
        "#,
    )
    .bind(kind.as_str())
    .bind(i64::from(limit))
    .fetch_all(conn)
    .await?;
    rows.sort_by_key(|r| r.id);
    Ok(rows.into_iter().map(|r| TransferEventKey::new(r.tx_hash, r.log_index, r.batch_index)).collect())
}

pub async fn push_pending_events(
    kind: ActivityEventKind,
    events: &[TransferEventKey],
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    if events.is_empty() {
        return Ok(());
    }
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO pending_activity_events (kind, tx_hash, log_index, batch_index) ");
    builder.push_values(events, |mut b, e| {
        b.push_bind(kind.as_str()).push_bind(e.tx_hash.as_str()).push_bind(e.log_index).push_bind(e.batch_index);
    });
    builder.build().execute(conn).await?;
    Ok(())
}

pub async fn count_pending_events(kind: ActivityEventKind, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM pending_activity_events WHERE kind = $1")
        .bind(kind.as_str())
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn insert_transfer_event(event: NewTransferEvent, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO nft_transfer_events (
                tx_hash, log_index, batch_index, contract, token_id, from_address, to_address, amount, block_hash,
                timestamp
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (tx_hash, log_index, batch_index) DO NOTHING
        "#,
    )
    .bind(event.key.tx_hash)
    .bind(event.key.log_index)
    .bind(event.key.batch_index)
    .bind(event.contract)
    .bind(event.token_id)
    .bind(event.from_address)
    .bind(event.to_address)
    .bind(event.amount)
    .bind(event.block_hash)
    .bind(event.timestamp)
    .execute(conn)
    .await?;
    Ok(())
}

/// Transfer rows for `keys`, joined with token and collection metadata. Unknown keys are left out.
pub async fn fetch_transfer_events(
    keys: &[TransferEventKey],
    conn: &mut SqliteConnection,
) -> Result<Vec<TransferEventRow>, StoreError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
            SELECT
                e.contract,
                e.token_id,
                e.from_address,
                e.to_address,
                e.amount,
                e.tx_hash,
                e.log_index,
                e.batch_index,
                e.block_hash,
                e.timestamp,
                t.name AS token_name,
                t.image AS token_image,
                t.media AS token_media,
                c.id AS collection_id,
                c.name AS collection_name,
                c.image AS collection_image
            FROM nft_transfer_events e
            LEFT JOIN tokens t ON t.contract = e.contract AND t.token_id = e.token_id
            LEFT JOIN collections c ON c.id = t.collection_id
            WHERE
        "#,
    );
    let mut clauses = builder.separated(" OR ");
    for key in keys {
        clauses.push("(e.tx_hash = ");
        clauses.push_bind_unseparated(key.tx_hash.as_str());
        clauses.push_unseparated(" AND e.log_index = ");
        clauses.push_bind_unseparated(key.log_index);
        clauses.push_unseparated(" AND e.batch_index = ");
        clauses.push_bind_unseparated(key.batch_index);
        clauses.push_unseparated(")");
    }
    builder.push(" ORDER BY e.timestamp, e.tx_hash, e.log_index, e.batch_index");
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<TransferEventRow>().fetch_all(conn).await?;
    Ok(rows)
}

/// Upserts documents into the outbox by id.
pub async fn push_pending_activities(
    activities: &[ActivityDocument],
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    if activities.is_empty() {
        return Ok(());
    }
    let now = Utc::now();
    let mut rows = Vec::with_capacity(activities.len());
    for activity in activities {
        let document = serde_json::to_string(activity).map_err(|e| StoreError::InvalidData(e.to_string()))?;
        rows.push((activity.id.as_str(), document));
    }
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO pending_activities (id, document, created_at) ");
    builder.push_values(rows, |mut b, (id, document)| {
        b.push_bind(id).push_bind(document).push_bind(now);
    });
    builder.push(" ON CONFLICT (id) DO UPDATE SET document = excluded.document");
    builder.build().execute(conn).await?;
    Ok(())
}

pub async fn fetch_pending_activities(conn: &mut SqliteConnection) -> Result<Vec<ActivityDocument>, StoreError> {
    let documents: Vec<String> =
        sqlx::query_scalar("SELECT document FROM pending_activities ORDER BY created_at, id").fetch_all(conn).await?;
    documents
        .iter()
        .map(|d| serde_json::from_str(d).map_err(|e| StoreError::InvalidData(e.to_string())))
        .collect()
}
