use std::sync::Arc;

use async_trait::async_trait;
use log::*;

use crate::{
    chain::ChainReader,
    checkers::{raw_address, CheckError, CheckOutcome, ProtocolChecker},
    db_types::{Order, Side},
};

/// Collection pools. Owning the token is not enough: the pool itself must recognise it, so sell orders are checked
/// against the pool's `getAllHeldIds()` list. An unreachable provider fails the check; any other chain error leaves
/// the order unrecognized.
pub struct CollectionPoolChecker {
    chain: Arc<dyn ChainReader>,
}

impl CollectionPoolChecker {
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        Self { chain }
    }

}

#[async_trait]
impl ProtocolChecker for CollectionPoolChecker {
    async fn check(&self, order: &Order) -> Result<CheckOutcome, CheckError> {
        if order.side != Side::Sell {
            return Ok(CheckOutcome::Ok);
        }
        let Some((_, token_id)) = order.token_set_id.as_single_token() else {
            return Ok(CheckOutcome::Unrecognized(format!("{} is not a single-token set", order.token_set_id)));
        };
        let pool = match raw_address(order, "pool") {
            Ok(pool) => pool,
            Err(e) => return Ok(CheckOutcome::Unrecognized(e)),
        };
        let held = match self.chain.get_all_held_ids(&pool).await {
            Ok(held) => held,
            Err(e) if e.is_transient() => return Err(CheckError::Chain(e)),
            Err(e) => {
                debug!("⛓️ getAllHeldIds() on pool {pool} failed. {e}");
                return Ok(CheckOutcome::unrecognized(e));
            },
        };
        if held.iter().any(|id| id == token_id) {
            Ok(CheckOutcome::Ok)
        } else {
            Ok(CheckOutcome::NoBalance)
        }
    }
}
