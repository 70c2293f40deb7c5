//! Downstream notifications emitted by the reconciliation engine.
//!
//! Both queues here are outbound: this crate only defines their payloads and publishes to them. The consumers live
//! with the order book ingestion and cache layers.
mod order_updates;
mod pool_refresh;

pub use order_updates::{order_updates_queue, OrderUpdateNotice, OrderUpdateTrigger, ORDER_UPDATES_BY_ID_QUEUE};
pub use pool_refresh::{
    orderbook_orders_queue,
    OrderbookOrderInfo,
    OrderbookRefresh,
    PoolRefreshParams,
    RefreshError,
    RefreshThrottle,
    DEFAULT_POOL_REFRESH_TTL,
    ORDERBOOK_ORDERS_QUEUE,
};
#[cfg(test)]
pub(crate) use pool_refresh::test_support;
