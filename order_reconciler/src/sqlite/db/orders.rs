use chrono::Utc;
use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus},
    traits::{OrderScope, StoreError},
};

/// Inserts a new order. Orders are created by the ingestion path; this exists so that a store can be seeded.
/// The expiration follows the same rule as [`update_status`].
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    let now = Utc::now();
    let expiration = if order.status.is_active() { order.valid_until } else { Some(now) };
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                kind,
                side,
                maker,
                contract,
                token_set_id,
                quantity_filled,
                quantity_remaining,
                raw_data,
                block_number,
                log_index,
                originated_at,
                valid_until,
                fillability_status,
                approval_status,
                expiration,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *;
        "#,
    )
    .bind(order.id)
    .bind(order.kind.as_str())
    .bind(order.side.as_str())
    .bind(order.maker)
    .bind(order.contract)
    .bind(order.token_set_id)
    .bind(order.quantity_filled)
    .bind(order.quantity_remaining)
    .bind(order.raw_data.map(Json))
    .bind(order.block_number)
    .bind(order.log_index)
    .bind(order.originated_at)
    .bind(order.valid_until)
    .bind(order.status.fillability.as_str())
    .bind(order.status.approval.as_str())
    .bind(expiration)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} inserted as {}", order.id, order.status());
    Ok(order)
}

pub async fn fetch_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns the order if it is neither filled nor cancelled.
pub async fn fetch_recheckable_order(id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE id = $1
              AND fillability_status IN ('fillable', 'no-balance')
              AND approval_status IN ('approved', 'no-approval')
        "#,
    )
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// One keyset page of active order ids in `scope`, ordered by id.
pub async fn fetch_fillable_order_ids(
    scope: &OrderScope,
    after: Option<&OrderId>,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderId>, StoreError> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id FROM orders WHERE fillability_status = 'fillable' AND approval_status = 'approved' AND ",
    );
    match scope {
        OrderScope::Token(token_set_id) => {
            builder.push("token_set_id = ").push_bind(token_set_id.as_str());
        },
        OrderScope::Maker(maker) => {
            builder.push("maker = ").push_bind(maker.as_str());
        },
        OrderScope::Contract { contract, side } => {
            builder.push("contract = ").push_bind(contract.as_str());
            builder.push(" AND side = ").push_bind(side.as_str());
        },
    }
    if let Some(after) = after {
        builder.push(" AND id > ").push_bind(after.as_str());
    }
    builder.push(" ORDER BY id LIMIT ").push_bind(i64::from(limit));
    trace!("🗃️ Executing query: {}", builder.sql());
    let ids = builder.build_query_scalar::<String>().fetch_all(conn).await?;
    Ok(ids.into_iter().map(OrderId::from).collect())
}

/// The single conditional status write.
///
/// Nothing is written if the stored pair already equals `status`. Otherwise the pair is replaced, `updated_at` is
/// bumped, and the expiration becomes the order's validity bound if the new status is active, or now if it is not.
pub async fn update_status(id: &OrderId, status: OrderStatus, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET
                fillability_status = $1,
                approval_status = $2,
                expiration = CASE WHEN $3 THEN valid_until ELSE $4 END,
                updated_at = $4
            WHERE id = $5
              AND (fillability_status IS NOT $1 OR approval_status IS NOT $2)
        "#,
    )
    .bind(status.fillability.as_str())
    .bind(status.approval.as_str())
    .bind(status.is_active())
    .bind(Utc::now())
    .bind(id.as_str())
    .execute(conn)
    .await?;
    let updated = result.rows_affected() > 0;
    if updated {
        debug!("🗃️ Order {id} status set to {status}");
    }
    Ok(updated)
}
