use std::time::Duration;

use chrono::Utc;
use log::*;
use reconcile_common::{Address, ZERO_TX_HASH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{Order, OrderKind},
    jobs::{BrokerError, JobQueue, MessageBroker, PublishOutcome, QueueConfig},
    locks::{CacheError, SharedCache},
};

pub const ORDERBOOK_ORDERS_QUEUE: &str = "orderbook-orders-queue";
pub const DEFAULT_POOL_REFRESH_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    #[error("Could not read or set the refresh marker. {0}")]
    Cache(#[from] CacheError),
    #[error("Could not enqueue the refresh. {0}")]
    Broker(#[from] BrokerError),
}

/// Parameters of a synthetic pool event. The zero transaction hash together with `force_recheck` tells the ingestion
/// path to resync every order of the pool instead of applying an incremental update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRefreshParams {
    pub pool: Address,
    pub tx_hash: String,
    pub tx_timestamp: i64,
    pub tx_block: Option<i64>,
    pub log_index: Option<i64>,
    pub force_recheck: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderbookOrderInfo {
    pub order_params: PoolRefreshParams,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderbookRefresh {
    pub kind: OrderKind,
    pub info: OrderbookOrderInfo,
}

impl OrderbookRefresh {
    /// A full refresh of `pool`, anchored at the block and log of the order that prompted it.
    pub fn full_resync(kind: &OrderKind, pool: &Address, order: &Order) -> Self {
        let order_params = PoolRefreshParams {
            pool: pool.clone(),
            tx_hash: ZERO_TX_HASH.to_string(),
            tx_timestamp: Utc::now().timestamp(),
            tx_block: order.block_number,
            log_index: order.log_index,
            force_recheck: true,
        };
        Self { kind: kind.clone(), info: OrderbookOrderInfo { order_params, metadata: Default::default() } }
    }
}

pub fn orderbook_orders_queue<B: MessageBroker>(broker: B) -> JobQueue<OrderbookRefresh, B> {
    JobQueue::new(QueueConfig::new(ORDERBOOK_ORDERS_QUEUE), broker)
}

/// Limits full pool refreshes to one per pool per TTL window, across every replica sharing the cache.
///
/// The marker is taken with an atomic set-if-absent, so concurrent fix requests for the same pool cannot both
/// enqueue a refresh.
#[derive(Clone)]
pub struct RefreshThrottle<C, B> {
    cache: C,
    queue: JobQueue<OrderbookRefresh, B>,
    ttl: Duration,
}

impl<C: SharedCache, B: MessageBroker> RefreshThrottle<C, B> {
    pub fn new(cache: C, broker: B) -> Self {
        Self { cache, queue: orderbook_orders_queue(broker), ttl: DEFAULT_POOL_REFRESH_TTL }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache_key(kind: &OrderKind, pool: &Address) -> String {
        format!("order-fixes:{kind}:{pool}")
    }

    /// Enqueues a full refresh of `pool` unless one was already issued within the TTL window. Returns `true` if this
    /// call enqueued it.
    pub async fn maybe_refresh(&self, kind: &OrderKind, pool: &Address, order: &Order) -> Result<bool, RefreshError> {
        let key = Self::cache_key(kind, pool);
        if !self.cache.set_if_absent(&key, "locked", self.ttl).await? {
            trace!("🌊️ {kind} pool {pool} was refreshed recently. Skipping.");
            return Ok(false);
        }
        let refresh = OrderbookRefresh::full_resync(kind, pool, order);
        let outcome = match self.queue.send(&refresh, None).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Without the marker the next check gets another chance to enqueue the refresh
                if let Err(cache_err) = self.cache.remove(&key).await {
                    warn!("🌊️ Could not clear the refresh marker {key}. {cache_err}");
                }
                return Err(e.into());
            },
        };
        debug!("🌊️ Full refresh of {kind} pool {pool} requested ({outcome:?})");
        Ok(outcome == PublishOutcome::Published)
    }
}
