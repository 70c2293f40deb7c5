use sqlx::SqliteConnection;

use crate::{
    db_types::{ListingSource, OrderId},
    sqlite::db::orders,
    traits::StoreError,
};

/// Joins the maker's balance of the order's token with the token and collection records.
///
/// Only single-token orders can be listed; any other scope yields `None`, as does a maker with no positive balance.
pub async fn fetch_listing_source(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<ListingSource>, StoreError> {
    let Some(order) = orders::fetch_order(order_id, conn).await? else {
        return Ok(None);
    };
    let Some((contract, token_id)) = order.token_set_id.as_single_token() else {
        return Ok(None);
    };
    let source = sqlx::query_as(
        r#"
            SELECT
                b.owner AS ownership_owner,
                b.amount AS ownership_amount,
                b.acquired_at AS ownership_acquired_at,
                t.token_id AS token_id,
                t.name AS token_name,
                t.image AS token_image,
                t.media AS token_media,
                c.id AS collection_id,
                c.name AS collection_name,
                c.image AS collection_image
            FROM nft_balances b
            JOIN tokens t ON t.contract = b.contract AND t.token_id = b.token_id
            LEFT JOIN collections c ON c.id = t.collection_id
            WHERE b.contract = $1 AND b.token_id = $2 AND b.owner = $3 AND b.amount > 0
        "#,
    )
    .bind(contract.as_str())
    .bind(token_id)
    .bind(order.maker.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(source)
}
