use reconcile_common::Address;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CollectionRecord, NftBalance, TokenRecord},
    traits::StoreError,
};

pub async fn nft_balance(
    contract: &Address,
    token_id: &str,
    owner: &Address,
    conn: &mut SqliteConnection,
) -> Result<i64, StoreError> {
    let amount: Option<i64> =
        sqlx::query_scalar("SELECT amount FROM nft_balances WHERE contract = $1 AND token_id = $2 AND owner = $3")
            .bind(contract.as_str())
            .bind(token_id)
            .bind(owner.as_str())
            .fetch_optional(conn)
            .await?;
    Ok(amount.unwrap_or(0))
}

pub async fn upsert_balance(balance: NftBalance, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO nft_balances (contract, token_id, owner, amount, acquired_at) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (contract, token_id, owner) DO UPDATE SET
                amount = excluded.amount,
                acquired_at = excluded.acquired_at
        "#,
    )
    .bind(balance.contract)
    .bind(balance.token_id)
    .bind(balance.owner)
    .bind(balance.amount)
    .bind(balance.acquired_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn upsert_token(token: TokenRecord, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO tokens (contract, token_id, name, image, media, collection_id) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (contract, token_id) DO UPDATE SET
                name = excluded.name,
                image = excluded.image,
                media = excluded.media,
                collection_id = excluded.collection_id
        "#,
    )
    .bind(token.contract)
    .bind(token.token_id)
    .bind(token.name)
    .bind(token.image)
    .bind(token.media)
    .bind(token.collection_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn upsert_collection(collection: CollectionRecord, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO collections (id, name, image) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name, image = excluded.image
        "#,
    )
    .bind(collection.id)
    .bind(collection.name)
    .bind(collection.image)
    .execute(conn)
    .await?;
    Ok(())
}
