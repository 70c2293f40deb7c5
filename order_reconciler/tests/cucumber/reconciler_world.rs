use std::{
    collections::HashMap,
    str::FromStr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use cucumber::World;
use log::*;
use order_reconciler::{
    checkers::{CheckError, CheckOutcome, CheckerRegistry, ProtocolChecker, SudoswapChecker},
    db_types::{Order, OrderId, OrderKind},
    fanout::RefreshThrottle,
    jobs::InMemoryBroker,
    order_fixes::OrderFixesJob,
    test_utils::prepare_env::fresh_database,
    SqliteDatabase,
};
use reconcile_common::Address;

#[derive(Default, Debug, World)]
pub struct ReconcilerWorld {
    pub system: Option<ReconcilerSystem>,
}

/// Verdicts handed out per order id by the scripted auction checker. Orders without a verdict pass.
#[derive(Clone, Default)]
pub struct ScriptedChecker {
    verdicts: Arc<Mutex<HashMap<OrderId, CheckOutcome>>>,
}

impl ScriptedChecker {
    pub fn set(&self, id: OrderId, outcome: CheckOutcome) {
        self.verdicts.lock().unwrap().insert(id, outcome);
    }
}

#[async_trait]
impl ProtocolChecker for ScriptedChecker {
    async fn check(&self, order: &Order) -> Result<CheckOutcome, CheckError> {
        Ok(self.verdicts.lock().unwrap().get(&order.id).cloned().unwrap_or(CheckOutcome::Ok))
    }
}

pub struct ReconcilerSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub broker: InMemoryBroker,
    pub checker: ScriptedChecker,
    pub job: OrderFixesJob<SqliteDatabase, InMemoryBroker>,
}

impl std::fmt::Debug for ReconcilerSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerSystem({})", self.db_path)
    }
}

impl ReconcilerSystem {
    pub async fn new(page_size: u32) -> Self {
        let (db, db_path) = fresh_database(2).await;
        debug!("🚀️ Created database: {db_path}");
        let broker = InMemoryBroker::new();
        let checker = ScriptedChecker::default();
        let throttle = RefreshThrottle::new(db.clone(), broker.clone());
        let sudoswap = Arc::new(SudoswapChecker::new(db.clone(), throttle));
        let registry = OrderKind::AUCTION_KINDS
            .into_iter()
            .fold(CheckerRegistry::new(), |r, kind| r.with(kind, Arc::new(checker.clone())))
            .with(OrderKind::Sudoswap, sudoswap.clone())
            .with(OrderKind::SudoswapV2, sudoswap);
        let job = OrderFixesJob::new(db.clone(), registry, broker.clone()).with_page_size(page_size);
        Self { db_path, db, broker, checker, job }
    }
}

impl ReconcilerWorld {
    pub fn system(&self) -> &ReconcilerSystem {
        self.system.as_ref().expect("Reconciler not initialised")
    }
}

/// Expands a short hex word into a full address, so that features can say `c0` instead of forty digits.
pub fn address(word: &str) -> Address {
    let hex = word.trim_start_matches("0x");
    Address::from_str(&format!("0x{hex:0>40}")).expect("Not a valid address")
}
