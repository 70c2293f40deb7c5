use std::time::Duration;

use log::*;
use reconcile_common::TokenSetId;

use crate::{
    checkers::{CheckOutcome, CheckerRegistry},
    db_types::{OrderId, OrderStatus, Side},
    fanout::{order_updates_queue, OrderUpdateNotice},
    jobs::{Backoff, BatchReport, JobHandler, JobQueue, MessageBroker, QueueConfig},
    order_fixes::{FixRequest, OrderFixError},
    traits::{OrderScope, OrderStore},
};

pub const ORDER_FIXES_QUEUE: &str = "order-fixes";
pub const DEFAULT_FIX_PAGE_SIZE: u32 = 500;

pub fn order_fixes_config() -> QueueConfig {
    QueueConfig::new(ORDER_FIXES_QUEUE)
        .with_max_retries(5)
        .with_concurrency(20)
        .with_backoff(Backoff::exponential(Duration::from_secs(10)))
        .lazy()
}

/// What a single-order fix did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixResult {
    /// The order does not exist, is filled or cancelled, or has no raw data to check.
    NotEligible,
    /// The checker could not reach a verdict. Nothing was written.
    Aborted(String),
    /// The stored status already matched the verdict.
    Unchanged(OrderStatus),
    Updated(OrderStatus),
}

pub struct OrderFixesJob<S, B> {
    config: QueueConfig,
    store: S,
    registry: CheckerRegistry,
    fixes: JobQueue<FixRequest, B>,
    order_updates: JobQueue<OrderUpdateNotice, B>,
    page_size: u32,
}

impl<S: OrderStore, B: MessageBroker> OrderFixesJob<S, B> {
    pub fn new(store: S, registry: CheckerRegistry, broker: B) -> Self {
        let config = order_fixes_config();
        let fixes = JobQueue::new(config.clone(), broker.clone());
        Self {
            config,
            store,
            registry,
            fixes,
            order_updates: order_updates_queue(broker),
            page_size: DEFAULT_FIX_PAGE_SIZE,
        }
    }

    /// Sets the number of order ids fetched per page when expanding a scope. Values below 1 are raised to 1.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn queue(&self) -> &JobQueue<FixRequest, B> {
        &self.fixes
    }

    /// Enqueues fix requests. Every request is sent independently; the call fails if any of them could not be sent.
    pub async fn add_to_queue(&self, requests: &[FixRequest]) -> Result<BatchReport, OrderFixError> {
        let report = self.fixes.send_batch(requests).await.into_result()?;
        Ok(report)
    }

    /// Re-checks one order and persists the verdict.
    pub async fn fix_order(&self, id: &OrderId) -> Result<FixResult, OrderFixError> {
        let Some(order) = self.store.fetch_recheckable_order(id).await? else {
            trace!("🔧️ Order {id} is not eligible for a re-check");
            return Ok(FixResult::NotEligible);
        };
        if order.raw_data().is_none() {
            trace!("🔧️ Order {id} has no raw data. It cannot be re-checked.");
            return Ok(FixResult::NotEligible);
        }
        let outcome = self.registry.check(&order).await?;
        let Some(target) = outcome.target_status() else {
            let reason = match outcome {
                CheckOutcome::Unrecognized(reason) => reason,
                other => format!("{other:?}"),
            };
            debug!("🔧️ Re-check of {} order {id} was inconclusive ({reason}). Leaving it as is.", order.kind);
            return Ok(FixResult::Aborted(reason));
        };
        if !self.store.update_order_status(id, target).await? {
            trace!("🔧️ Order {id} is still {target}");
            return Ok(FixResult::Unchanged(target));
        }
        info!("🔧️ Order {id} ({}) moved from {} to {target}", order.kind, order.status());
        let notice = OrderUpdateNotice::revalidation(id);
        self.order_updates.send(&notice, None).await?;
        Ok(FixResult::Updated(target))
    }

    /// Emits one `{by: id}` request for every active order in `scope`, a page at a time. Returns the number of
    /// requests emitted.
    pub async fn expand(&self, scope: &OrderScope) -> Result<usize, OrderFixError> {
        let mut after: Option<OrderId> = None;
        let mut total = 0;
        loop {
            let page = self.store.fetch_fillable_order_ids(scope, after.as_ref(), self.page_size).await?;
            if page.is_empty() {
                break;
            }
            let requests = page.iter().cloned().map(FixRequest::by_id).collect::<Vec<_>>();
            self.add_to_queue(&requests).await?;
            total += page.len();
            let last_page = page.len() < self.page_size as usize;
            after = page.into_iter().last();
            if last_page {
                break;
            }
        }
        debug!("🔧️ Expanded {scope:?} into {total} fix requests");
        Ok(total)
    }

    async fn handle(&self, request: &FixRequest) -> Result<(), OrderFixError> {
        match request {
            FixRequest::Id { id } => {
                self.fix_order(id).await?;
            },
            FixRequest::Token { token } => {
                let scope = OrderScope::Token(TokenSetId::from(format!("token:{token}")));
                self.expand(&scope).await?;
            },
            FixRequest::Maker { maker } => {
                self.expand(&OrderScope::Maker(maker.clone())).await?;
            },
            FixRequest::Contract { contract } => {
                for side in Side::ALL {
                    self.expand(&OrderScope::Contract { contract: contract.clone(), side }).await?;
                }
            },
        }
        Ok(())
    }
}

impl<S: OrderStore, B: MessageBroker> JobHandler for OrderFixesJob<S, B> {
    type Error = OrderFixError;
    type Payload = FixRequest;

    fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn process(&self, payload: FixRequest) -> Result<(), OrderFixError> {
        self.handle(&payload).await.map_err(|e| {
            let json = serde_json::to_string(&payload).unwrap_or_else(|_| format!("{payload:?}"));
            error!("🔧️ [{}] Failed to handle order fix {json}: {e}", ORDER_FIXES_QUEUE);
            e
        })
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::BTreeMap,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;
    use chrono::Utc;
    use reconcile_common::Address;
    use serde_json::json;

    use super::*;
    use crate::{
        checkers::{test_support::order, CheckError, ProtocolChecker},
        db_types::{ApprovalStatus, FillabilityStatus, Order, OrderKind},
        fanout::ORDER_UPDATES_BY_ID_QUEUE,
        jobs::{InMemoryBroker, JobMessage},
        traits::StoreError,
    };

    #[derive(Clone, Default)]
    struct Orders {
        rows: Arc<Mutex<BTreeMap<OrderId, Order>>>,
        writes: Arc<Mutex<usize>>,
    }

    impl Orders {
        fn insert(&self, order: Order) {
            self.rows.lock().unwrap().insert(order.id.clone(), order);
        }

        fn get(&self, id: &str) -> Order {
            self.rows.lock().unwrap()[&OrderId::from(id)].clone()
        }
    }

    impl OrderStore for Orders {
        async fn fetch_recheckable_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.get(id).filter(|o| o.status().is_recheckable()).cloned())
        }

        async fn fetch_fillable_order_ids(
            &self,
            scope: &OrderScope,
            after: Option<&OrderId>,
            limit: u32,
        ) -> Result<Vec<OrderId>, StoreError> {
            let rows = self.rows.lock().unwrap();
            let ids = rows
                .values()
                .filter(|o| o.status().is_active())
                .filter(|o| after.map_or(true, |a| o.id > *a))
                .filter(|o| match scope {
                    OrderScope::Token(t) => o.token_set_id == *t,
                    OrderScope::Maker(m) => o.maker == *m,
                    OrderScope::Contract { contract, side } => o.contract.as_ref() == Some(contract) && o.side == *side,
                })
                .take(limit as usize)
                .map(|o| o.id.clone())
                .collect();
            Ok(ids)
        }

        async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<bool, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let Some(order) = rows.get_mut(id) else { return Ok(false) };
            if order.status() == status {
                return Ok(false);
            }
            order.fillability_status = status.fillability;
            order.approval_status = status.approval;
            order.expiration = if status.is_active() { order.valid_until } else { Some(Utc::now()) };
            *self.writes.lock().unwrap() += 1;
            Ok(true)
        }

        async fn nft_balance(&self, _c: &Address, _t: &str, _o: &Address) -> Result<i64, StoreError> {
            Ok(0)
        }
    }

    struct Fixed(Result<CheckOutcome, CheckError>);

    #[async_trait]
    impl ProtocolChecker for Fixed {
        async fn check(&self, _order: &Order) -> Result<CheckOutcome, CheckError> {
            self.0.clone()
        }
    }

    fn job(outcome: CheckOutcome) -> (OrderFixesJob<Orders, InMemoryBroker>, Orders, InMemoryBroker) {
        job_with(Ok(outcome))
    }

    fn job_with(
        result: Result<CheckOutcome, CheckError>,
    ) -> (OrderFixesJob<Orders, InMemoryBroker>, Orders, InMemoryBroker) {
        let store = Orders::default();
        let broker = InMemoryBroker::new();
        let registry = CheckerRegistry::new().with(OrderKind::Seaport, Arc::new(Fixed(result)));
        (OrderFixesJob::new(store.clone(), registry, broker.clone()).with_page_size(2), store, broker)
    }

    fn seaport(id: &str, side: Side) -> Order {
        let mut o = order(OrderKind::Seaport, side, json!({"offerer": "0x00"}));
        o.id = OrderId::from(id);
        o
    }

    #[tokio::test]
    async fn cancelled_order_is_expired_and_announced_once() {
        let (job, store, broker) = job(CheckOutcome::Cancelled);
        store.insert(seaport("O1", Side::Sell));
        let result = job.fix_order(&OrderId::from("O1")).await.unwrap();
        let expected = OrderStatus::new(FillabilityStatus::Cancelled, ApprovalStatus::Approved);
        assert_eq!(result, FixResult::Updated(expected));
        assert!(store.get("O1").expiration.is_some());

        // Cancelled orders drop out of the re-check set
        assert_eq!(job.fix_order(&OrderId::from("O1")).await.unwrap(), FixResult::NotEligible);
        assert_eq!(*store.writes.lock().unwrap(), 1);
        let notices = broker.ready_messages(ORDER_UPDATES_BY_ID_QUEUE);
        assert_eq!(notices.len(), 1);
        let notice: OrderUpdateNotice = serde_json::from_value(notices[0].payload.clone()).unwrap();
        assert_eq!(notice.id, OrderId::from("O1"));
        assert!(notice.trigger.is_revalidation());
    }

    #[tokio::test]
    async fn second_identical_check_is_a_no_op() {
        let (job, store, broker) = job(CheckOutcome::NoApproval);
        store.insert(seaport("O1", Side::Sell));
        let first = job.fix_order(&OrderId::from("O1")).await.unwrap();
        let second = job.fix_order(&OrderId::from("O1")).await.unwrap();
        let target = OrderStatus::new(FillabilityStatus::Fillable, ApprovalStatus::NoApproval);
        assert_eq!(first, FixResult::Updated(target));
        assert_eq!(second, FixResult::Unchanged(target));
        assert_eq!(*store.writes.lock().unwrap(), 1);
        assert_eq!(broker.ready_messages(ORDER_UPDATES_BY_ID_QUEUE).len(), 1);
    }

    #[tokio::test]
    async fn unrecognized_outcomes_write_nothing() {
        let (job, store, broker) = job(CheckOutcome::Unrecognized("timeout".into()));
        store.insert(seaport("O1", Side::Sell));
        let result = job.fix_order(&OrderId::from("O1")).await.unwrap();
        assert_eq!(result, FixResult::Aborted("timeout".into()));
        assert_eq!(store.get("O1").status(), OrderStatus::ACTIVE);
        assert!(broker.ready_messages(ORDER_UPDATES_BY_ID_QUEUE).is_empty());
        // The job itself succeeds
        job.process(FixRequest::by_id(OrderId::from("O1"))).await.unwrap();
    }

    #[tokio::test]
    async fn checker_errors_fail_the_job() {
        let down = CheckError::Store(StoreError::DatabaseError("connection refused".into()));
        let (job, store, broker) = job_with(Err(down));
        store.insert(seaport("O1", Side::Sell));
        let err = job.fix_order(&OrderId::from("O1")).await.unwrap_err();
        assert!(matches!(err, OrderFixError::Check(CheckError::Store(_))));
        assert_eq!(store.get("O1").status(), OrderStatus::ACTIVE);
        assert!(broker.ready_messages(ORDER_UPDATES_BY_ID_QUEUE).is_empty());
        // Returned from `process` so that the runner schedules a retry
        assert!(job.process(FixRequest::by_id(OrderId::from("O1"))).await.is_err());
    }

    #[tokio::test]
    async fn orders_without_raw_data_are_skipped() {
        let (job, store, _) = job(CheckOutcome::Cancelled);
        let mut o = seaport("O1", Side::Sell);
        o.raw_data = None;
        store.insert(o);
        assert_eq!(job.fix_order(&OrderId::from("O1")).await.unwrap(), FixResult::NotEligible);
    }

    #[tokio::test]
    async fn contract_fan_out_covers_both_sides_across_pages() {
        let (job, store, broker) = job(CheckOutcome::Ok);
        for i in 0..5 {
            store.insert(seaport(&format!("S{i}"), Side::Sell));
        }
        for i in 0..3 {
            store.insert(seaport(&format!("B{i}"), Side::Buy));
        }
        let mut cancelled = seaport("S9", Side::Sell);
        cancelled.fillability_status = FillabilityStatus::Cancelled;
        store.insert(cancelled);

        let contract = crate::checkers::test_support::contract();
        job.process(FixRequest::Contract { contract }).await.unwrap();

        let requests = broker
            .ready_messages(ORDER_FIXES_QUEUE)
            .into_iter()
            .map(|m: JobMessage| serde_json::from_value::<FixRequest>(m.payload).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(requests.len(), 8);
        let mut ids = requests
            .iter()
            .map(|r| match r {
                FixRequest::Id { id } => id.to_string(),
                other => panic!("unexpected {other:?}"),
            })
            .collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert!(!ids.contains(&"S9".to_string()));
    }

    #[tokio::test]
    async fn token_requests_expand_to_the_token_set() {
        let (job, store, broker) = job(CheckOutcome::Ok);
        store.insert(seaport("A", Side::Sell));
        let mut other = seaport("B", Side::Sell);
        other.token_set_id = TokenSetId::from("token:0xc0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0:43".to_string());
        store.insert(other);
        let token = "0xc0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0:42".to_string();
        job.process(FixRequest::Token { token }).await.unwrap();
        let requests = broker.ready_messages(ORDER_FIXES_QUEUE);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].payload, json!({"by": "id", "data": {"id": "A"}}));
    }
}
