use std::sync::Arc;

use async_trait::async_trait;
use log::*;

use crate::{
    checkers::{raw_address, CheckContext, CheckError, CheckFailure, CheckOutcome, OffChainValidator, ProtocolChecker},
    db_types::{Order, Side},
    fanout::RefreshThrottle,
    jobs::MessageBroker,
    locks::SharedCache,
    traits::OrderStore,
};

/// NFTX vault orders. The SDK check decides the verdict; only `no-balance` is meaningful for a vault, anything else it
/// reports is unrecognized. When the check passes, a full refresh of the vault is requested at most once per window.
pub struct NftxChecker<C, B> {
    validator: Arc<dyn OffChainValidator>,
    throttle: RefreshThrottle<C, B>,
}

impl<C: SharedCache, B: MessageBroker> NftxChecker<C, B> {
    pub fn new(validator: Arc<dyn OffChainValidator>, throttle: RefreshThrottle<C, B>) -> Self {
        Self { validator, throttle }
    }
}

#[async_trait]
impl<C: SharedCache, B: MessageBroker> ProtocolChecker for NftxChecker<C, B> {
    async fn check(&self, order: &Order) -> Result<CheckOutcome, CheckError> {
        match self.validator.check(order, &CheckContext::recheck()).await {
            Ok(()) => {},
            Err(CheckFailure::NoBalance) => return Ok(CheckOutcome::NoBalance),
            Err(e) => return Ok(CheckOutcome::unrecognized(e)),
        }
        let pool = match raw_address(order, "pool") {
            Ok(pool) => pool,
            Err(e) => return Ok(CheckOutcome::Unrecognized(e)),
        };
        if let Err(e) = self.throttle.maybe_refresh(&order.kind, &pool, order).await {
            warn!("🌊️ Could not request a refresh of NFTX pool {pool}. {e}");
            return Err(e.into());
        }
        Ok(CheckOutcome::Ok)
    }
}

/// Sudoswap v1 and v2 pair orders. A throttled refresh of the pair is requested first. Sell orders are then
/// `no-balance` when the pair no longer holds the token. Buy orders are not re-validated.
pub struct SudoswapChecker<S, C, B> {
    store: S,
    throttle: RefreshThrottle<C, B>,
}

impl<S: OrderStore, C: SharedCache, B: MessageBroker> SudoswapChecker<S, C, B> {
    pub fn new(store: S, throttle: RefreshThrottle<C, B>) -> Self {
        Self { store, throttle }
    }
}

#[async_trait]
impl<S: OrderStore, C: SharedCache, B: MessageBroker> ProtocolChecker for SudoswapChecker<S, C, B> {
    async fn check(&self, order: &Order) -> Result<CheckOutcome, CheckError> {
        let pair = match raw_address(order, "pair") {
            Ok(pair) => pair,
            Err(e) => return Ok(CheckOutcome::Unrecognized(e)),
        };
        self.throttle.maybe_refresh(&order.kind, &pair, order).await?;
        if order.side != Side::Sell {
            return Ok(CheckOutcome::Ok);
        }
        let Some((contract, token_id)) = order.token_set_id.as_single_token() else {
            return Ok(CheckOutcome::Unrecognized(format!("{} is not a single-token set", order.token_set_id)));
        };
        let balance = self.store.nft_balance(&contract, token_id, &pair).await?;
        trace!("🌊️ Pair {pair} holds {balance} of {contract}:{token_id}");
        if balance <= 0 {
            Ok(CheckOutcome::NoBalance)
        } else {
            Ok(CheckOutcome::Ok)
        }
    }
}
