use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    checkers::{CheckContext, CheckError, CheckOutcome, OffChainValidator, ProtocolChecker},
    db_types::Order,
};

/// Checks maker-signed orders (LooksRare v2, X2Y2, 0x v4, Seaport, Rarible) through the protocol SDK.
pub struct AuctionChecker {
    validator: Arc<dyn OffChainValidator>,
}

impl AuctionChecker {
    pub fn new(validator: Arc<dyn OffChainValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl ProtocolChecker for AuctionChecker {
    async fn check(&self, order: &Order) -> Result<CheckOutcome, CheckError> {
        let context = CheckContext::recheck_for(order);
        Ok(self.validator.check(order, &context).await.into())
    }
}
