//! # Protocol checkers
//!
//! Each supported order protocol has a [`ProtocolChecker`] that classifies an order's current validity into a
//! [`CheckOutcome`]. The [`CheckerRegistry`] maps protocol kinds to checkers; the reconciliation engine only ever talks
//! to the registry, so supporting a new protocol means registering one more checker.
//!
//! There are three families:
//! * auction-style protocols ([`AuctionChecker`]) delegate to the protocol SDK through an [`OffChainValidator`];
//! * pool-style protocols ([`NftxChecker`], [`SudoswapChecker`]) also request a throttled full refresh of the pool;
//! * collection pools ([`CollectionPoolChecker`]) read the set of held token ids from the pool contract directly.
mod auction;
mod collection_pool;
mod errors;
mod outcome;
mod pool;
mod validator;

use std::{collections::HashMap, sync::Arc};

pub use auction::AuctionChecker;
use async_trait::async_trait;
pub use collection_pool::CollectionPoolChecker;
pub use errors::CheckError;
use log::*;
pub use outcome::CheckOutcome;
pub use pool::{NftxChecker, SudoswapChecker};
use reconcile_common::Address;
pub use validator::{CheckContext, CheckFailure, OffChainValidator};

use crate::{
    chain::ChainReader,
    db_types::{Order, OrderKind},
    fanout::RefreshThrottle,
    jobs::MessageBroker,
    locks::SharedCache,
    traits::OrderStore,
};

#[async_trait]
pub trait ProtocolChecker: Send + Sync {
    /// Classifies the order. Problems with the order itself, such as malformed raw data or a verdict the protocol does
    /// not explain, are [`CheckOutcome::Unrecognized`]. An `Err` means a collaborator was unreachable.
    async fn check(&self, order: &Order) -> Result<CheckOutcome, CheckError>;
}

#[derive(Clone, Default)]
pub struct CheckerRegistry {
    checkers: HashMap<OrderKind, Arc<dyn ProtocolChecker>>,
}

impl CheckerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a checker for every supported protocol kind.
    pub fn with_default_checkers<S, C, B>(
        validator: Arc<dyn OffChainValidator>,
        chain: Arc<dyn ChainReader>,
        store: S,
        throttle: RefreshThrottle<C, B>,
    ) -> Self
    where
        S: OrderStore,
        C: SharedCache,
        B: MessageBroker,
    {
        let auction = Arc::new(AuctionChecker::new(Arc::clone(&validator)));
        let mut registry = OrderKind::AUCTION_KINDS.into_iter().fold(Self::new(), |registry, kind| {
            registry.with(kind, Arc::clone(&auction) as Arc<dyn ProtocolChecker>)
        });
        let sudoswap = Arc::new(SudoswapChecker::new(store, throttle.clone()));
        registry.register(OrderKind::Nftx, Arc::new(NftxChecker::new(validator, throttle)));
        registry.register(OrderKind::Sudoswap, Arc::clone(&sudoswap) as Arc<dyn ProtocolChecker>);
        registry.register(OrderKind::SudoswapV2, sudoswap);
        registry.register(OrderKind::CollectionXyz, Arc::new(CollectionPoolChecker::new(chain)));
        registry
    }

    pub fn register(&mut self, kind: OrderKind, checker: Arc<dyn ProtocolChecker>) {
        self.checkers.insert(kind, checker);
    }

    pub fn with(mut self, kind: OrderKind, checker: Arc<dyn ProtocolChecker>) -> Self {
        self.register(kind, checker);
        self
    }

    pub fn supports(&self, kind: &OrderKind) -> bool {
        self.checkers.contains_key(kind)
    }

    /// Dispatches the order to the checker for its kind. Orders of an unsupported kind are unrecognized.
    pub async fn check(&self, order: &Order) -> Result<CheckOutcome, CheckError> {
        match self.checkers.get(&order.kind) {
            Some(checker) => checker.check(order).await,
            None => {
                debug!("🔧️ No checker is registered for {} orders", order.kind);
                Ok(CheckOutcome::Unrecognized(format!("unsupported order kind {}", order.kind)))
            },
        }
    }
}

/// Reads an address field out of the order's raw protocol data.
pub(crate) fn raw_address(order: &Order, field: &str) -> Result<Address, String> {
    let value = order
        .raw_data()
        .and_then(|raw| raw.get(field))
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("raw data of order {} has no `{field}` field", order.id))?;
    value.parse::<Address>().map_err(|e| format!("invalid `{field}` in order {}: {e}", order.id))
}


#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{test_support::order, *};
    use crate::db_types::Side;

    struct Always(CheckOutcome);

    #[async_trait]
    impl ProtocolChecker for Always {
        async fn check(&self, _order: &Order) -> Result<CheckOutcome, CheckError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn dispatches_by_kind() {
        let registry = CheckerRegistry::new()
            .with(OrderKind::Seaport, Arc::new(Always(CheckOutcome::Cancelled)))
            .with(OrderKind::Rarible, Arc::new(Always(CheckOutcome::Ok)));
        let seaport = order(OrderKind::Seaport, Side::Sell, json!({}));
        let rarible = order(OrderKind::Rarible, Side::Sell, json!({}));
        assert_eq!(registry.check(&seaport).await.unwrap(), CheckOutcome::Cancelled);
        assert_eq!(registry.check(&rarible).await.unwrap(), CheckOutcome::Ok);
    }

    #[tokio::test]
    async fn unknown_kinds_are_unrecognized() {
        let registry = CheckerRegistry::new().with(OrderKind::Seaport, Arc::new(Always(CheckOutcome::Ok)));
        let o = order(OrderKind::Unknown("blur".into()), Side::Sell, json!({}));
        assert!(!registry.supports(&o.kind));
        assert!(matches!(registry.check(&o).await, Ok(CheckOutcome::Unrecognized(_))));
    }

    #[test]
    fn raw_addresses() {
        let o = order(OrderKind::Nftx, Side::Sell, json!({"pool": "0x00000000000000000000000000000000000000BB"}));
        assert_eq!(raw_address(&o, "pool").unwrap().as_str(), "0x00000000000000000000000000000000000000bb");
        assert!(raw_address(&o, "pair").is_err());
    }
}
