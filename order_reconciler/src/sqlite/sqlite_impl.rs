//! `SqliteDatabase` is the concrete SQLite backend of the reconciler.
//!
//! It implements every store trait in [`crate::traits`] as well as [`SchedulerLock`] and [`SharedCache`], so a single
//! database handle can be cloned into every job.
use std::{fmt::Debug, time::Duration};

use log::*;
use reconcile_common::Address;
use sqlx::SqlitePool;

use super::db::{activities, balances, cache, db_url, listings, locks, new_pool, orders};
use crate::{
    db_types::{
        ActivityEventKind,
        CollectionRecord,
        ListingSource,
        NewOrder,
        NewTransferEvent,
        NftBalance,
        Order,
        OrderId,
        OrderStatus,
        TokenRecord,
        TransferEventKey,
        TransferEventRow,
    },
    locks::{CacheError, LockError, LockToken, SchedulerLock, SharedCache},
    pipelines::ActivityDocument,
    traits::{ActivityStore, ListingStore, OrderScope, OrderStore, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `RCW_DATABASE_URL`, or the default.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    pub async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    pub async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    pub async fn upsert_balance(&self, balance: NftBalance) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        balances::upsert_balance(balance, &mut conn).await
    }

    /// Stores the token, and its collection when one is given, in a single transaction.
    pub async fn upsert_token(
        &self,
        token: TokenRecord,
        collection: Option<CollectionRecord>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        if let Some(collection) = collection {
            balances::upsert_collection(collection, &mut tx).await?;
        }
        balances::upsert_token(token, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Records a transfer and queues it for activity synthesis.
    pub async fn insert_transfer_event(&self, event: NewTransferEvent) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let key = event.key.clone();
        activities::insert_transfer_event(event, &mut tx).await?;
        activities::push_pending_events(ActivityEventKind::NftTransferEvent, &[key], &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn count_pending_events(&self, kind: ActivityEventKind) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        activities::count_pending_events(kind, &mut conn).await
    }

    pub async fn fetch_pending_activities(&self) -> Result<Vec<ActivityDocument>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        activities::fetch_pending_activities(&mut conn).await
    }
}

impl OrderStore for SqliteDatabase {
    async fn fetch_recheckable_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_recheckable_order(id, &mut conn).await
    }

    async fn fetch_fillable_order_ids(
        &self,
        scope: &OrderScope,
        after: Option<&OrderId>,
        limit: u32,
    ) -> Result<Vec<OrderId>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_fillable_order_ids(scope, after, limit, &mut conn).await
    }

    async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_status(id, status, &mut conn).await
    }

    async fn nft_balance(&self, contract: &Address, token_id: &str, owner: &Address) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        balances::nft_balance(contract, token_id, owner, &mut conn).await
    }
}

impl ActivityStore for SqliteDatabase {
    async fn pop_pending_events(
        &self,
        kind: ActivityEventKind,
        limit: u32,
    ) -> Result<Vec<TransferEventKey>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        activities::pop_pending_events(kind, limit, &mut conn).await
    }

    async fn push_pending_events(
        &self,
        kind: ActivityEventKind,
        events: &[TransferEventKey],
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        activities::push_pending_events(kind, events, &mut conn).await
    }

    async fn fetch_transfer_events(&self, keys: &[TransferEventKey]) -> Result<Vec<TransferEventRow>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        activities::fetch_transfer_events(keys, &mut conn).await
    }

    async fn push_pending_activities(&self, activities: &[ActivityDocument]) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        activities::push_pending_activities(activities, &mut conn).await
    }
}

impl ListingStore for SqliteDatabase {
    async fn fetch_listing_source(&self, order_id: &OrderId) -> Result<Option<ListingSource>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_listing_source(order_id, &mut conn).await
    }
}

impl SchedulerLock for SqliteDatabase {
    /// All names are taken inside one transaction, which is rolled back as soon as one of them is held elsewhere.
    async fn acquire(&self, names: &[&str], ttl: Duration) -> Result<Option<LockToken>, LockError> {
        let token = LockToken::new(names);
        let mut tx = self.pool.begin().await.map_err(|e| LockError::Backend(e.to_string()))?;
        for name in names {
            let taken =
                locks::try_take(name, token.token(), ttl, &mut tx)
                    .await
                    .map_err(|e| LockError::Backend(e.to_string()))?;
            if !taken {
                tx.rollback().await.map_err(|e| LockError::Backend(e.to_string()))?;
                return Ok(None);
            }
        }
        tx.commit().await.map_err(|e| LockError::Backend(e.to_string()))?;
        Ok(Some(token))
    }
}

impl SharedCache for SqliteDatabase {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.pool.acquire().await.map_err(|e| CacheError::Backend(e.to_string()))?;
        cache::set_if_absent(key, value, ttl, &mut conn).await.map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.pool.acquire().await.map_err(|e| CacheError::Backend(e.to_string()))?;
        cache::remove(key, &mut conn).await.map_err(|e| CacheError::Backend(e.to_string()))
    }
}
