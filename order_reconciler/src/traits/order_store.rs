use std::future::Future;

use reconcile_common::{Address, TokenSetId};
use thiserror::Error;

use crate::db_types::{Order, OrderId, OrderStatus, Side};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("Stored data could not be decoded. {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// The set of orders that a bulk fix request expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    /// Orders whose token set is exactly this one.
    Token(TokenSetId),
    Maker(Address),
    /// Orders on one side of the book for the contract. Each side is enumerated separately.
    Contract { contract: Address, side: Side },
}

/// The queries and the single status write that the reconciliation engine needs from the order store.
pub trait OrderStore: Clone + Send + Sync + 'static {
    /// Fetches the order if it is in a state that can be re-checked: `fillable` or `no-balance` fillability together
    /// with `approved` or `no-approval` approval. Filled and cancelled orders are never returned.
    fn fetch_recheckable_order(
        &self,
        id: &OrderId,
    ) -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;

    /// Returns up to `limit` ids of `fillable` and `approved` orders in `scope`, in ascending id order, starting
    /// strictly after `after`. Callers page through a scope by passing the last id of the previous page.
    fn fetch_fillable_order_ids(
        &self,
        scope: &OrderScope,
        after: Option<&OrderId>,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<OrderId>, StoreError>> + Send;

    /// Writes `status` only if it differs from the stored pair, recomputing the expiration: the order's own validity
    /// bound when the new status is active, the current time otherwise. Returns `true` if a row was written.
    fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// The amount of `contract:token_id` held by `owner`. Zero if there is no balance record.
    fn nft_balance(
        &self,
        contract: &Address,
        token_id: &str,
        owner: &Address,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;
}
