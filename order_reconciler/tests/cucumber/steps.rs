use std::collections::HashSet;

use cucumber::{given, then, when};
use order_reconciler::{
    checkers::CheckOutcome,
    db_types::{NewOrder, NftBalance, OrderId, OrderKind, Side},
    fanout::{OrderUpdateNotice, RefreshThrottle, ORDERBOOK_ORDERS_QUEUE, ORDER_UPDATES_BY_ID_QUEUE},
    jobs::{InMemoryBroker, JobHandler},
    locks::SharedCache,
    order_fixes::{FixRequest, ORDER_FIXES_QUEUE},
    SqliteDatabase,
};
use reconcile_common::TokenSetId;
use serde_json::json;

use crate::cucumber::reconciler_world::{address, ReconcilerSystem, ReconcilerWorld};

fn parse_outcome(word: &str) -> CheckOutcome {
    match word {
        "ok" => CheckOutcome::Ok,
        "cancelled" => CheckOutcome::Cancelled,
        "filled" => CheckOutcome::Filled,
        "no-balance" => CheckOutcome::NoBalance,
        "no-approval" => CheckOutcome::NoApproval,
        "no-balance-and-no-approval" => CheckOutcome::NoBalanceAndNoApproval,
        other => CheckOutcome::Unrecognized(other.to_string()),
    }
}

#[given("a fresh reconciler")]
async fn fresh_reconciler(world: &mut ReconcilerWorld) {
    world.system = Some(ReconcilerSystem::new(500).await);
}

#[given(expr = "a fresh reconciler with a page size of {int}")]
async fn fresh_reconciler_with_page_size(world: &mut ReconcilerWorld, page_size: u32) {
    world.system = Some(ReconcilerSystem::new(page_size).await);
}

#[given(expr = "a seaport {word} order {word} on token {word} of contract {word}")]
async fn seaport_order(world: &mut ReconcilerWorld, side: String, id: String, token_id: String, contract: String) {
    let side: Side = side.parse().expect("Not a valid side");
    let contract = address(&contract);
    let token_set = TokenSetId::single_token(&contract, &token_id);
    let order = NewOrder::new(OrderId::from(id), OrderKind::Seaport, side, address("aa"), token_set)
        .with_raw_data(json!({"kind": "single-token"}));
    world.system().db.insert_order(order).await.expect("Error inserting order");
}

#[given(expr = "a sudoswap sell order {word} on token {word} of contract {word} in pair {word}")]
async fn sudoswap_order(world: &mut ReconcilerWorld, id: String, token_id: String, contract: String, pair: String) {
    let contract = address(&contract);
    let token_set = TokenSetId::single_token(&contract, &token_id);
    let pair = address(&pair);
    let order = NewOrder::new(OrderId::from(id), OrderKind::Sudoswap, Side::Sell, pair.clone(), token_set)
        .with_raw_data(json!({"pair": pair}));
    world.system().db.insert_order(order).await.expect("Error inserting order");
}

#[given(expr = "pair {word} holds {int} of token {word} of contract {word}")]
async fn pair_balance(world: &mut ReconcilerWorld, pair: String, amount: i64, token_id: String, contract: String) {
    let balance =
        NftBalance { contract: address(&contract), token_id, owner: address(&pair), amount, acquired_at: None };
    world.system().db.upsert_balance(balance).await.expect("Error saving balance");
}

#[given(expr = "sudoswap pool {word} was refreshed recently")]
async fn pool_was_refreshed(world: &mut ReconcilerWorld, pool: String) {
    let key = RefreshThrottle::<SqliteDatabase, InMemoryBroker>::cache_key(&OrderKind::Sudoswap, &address(&pool));
    let ttl = std::time::Duration::from_secs(3600);
    world.system().db.set_if_absent(&key, "locked", ttl).await.expect("Error writing cache");
}

#[given(expr = "the checker reports {word} for order {word}")]
async fn scripted_verdict(world: &mut ReconcilerWorld, outcome: String, id: String) {
    world.system().checker.set(OrderId::from(id), parse_outcome(&outcome));
}

#[when(expr = "order {word} is fixed")]
async fn fix_order(world: &mut ReconcilerWorld, id: String) {
    let request = FixRequest::by_id(OrderId::from(id));
    world.system().job.process(request).await.expect("Error processing fix request");
}

#[when(expr = "order {word} is fixed {int} times")]
async fn fix_order_repeatedly(world: &mut ReconcilerWorld, id: String, times: usize) {
    for _ in 0..times {
        let request = FixRequest::by_id(OrderId::from(id.as_str()));
        world.system().job.process(request).await.expect("Error processing fix request");
    }
}

#[when(expr = "a fix is requested for contract {word}")]
async fn fix_contract(world: &mut ReconcilerWorld, contract: String) {
    let request = FixRequest::Contract { contract: address(&contract) };
    world.system().job.process(request).await.expect("Error processing fix request");
}

#[then(expr = "order {word} is {word}\\/{word}")]
async fn order_status(world: &mut ReconcilerWorld, id: String, fillability: String, approval: String) {
    let order = world.system().db.fetch_order(&OrderId::from(id)).await.expect("Error fetching order");
    let order = order.expect("Order does not exist");
    assert_eq!(order.fillability_status.as_str(), fillability);
    assert_eq!(order.approval_status.as_str(), approval);
}

#[then(expr = "order {word} has a closed expiration")]
async fn closed_expiration(world: &mut ReconcilerWorld, id: String) {
    let order = world.system().db.fetch_order(&OrderId::from(id)).await.unwrap().expect("Order does not exist");
    let expiration = order.expiration.expect("Expiration should be set");
    assert!(expiration <= chrono::Utc::now());
}

#[then(expr = "order {word} has an open expiration")]
async fn open_expiration(world: &mut ReconcilerWorld, id: String) {
    let order = world.system().db.fetch_order(&OrderId::from(id)).await.unwrap().expect("Order does not exist");
    assert_eq!(order.expiration, order.valid_until);
}

#[then(expr = "{int} revalidation notice(s) was/were sent")]
async fn revalidation_notices(world: &mut ReconcilerWorld, count: usize) {
    let messages = world.system().broker.ready_messages(ORDER_UPDATES_BY_ID_QUEUE);
    assert_eq!(messages.len(), count);
    let notices = messages
        .into_iter()
        .map(|m| serde_json::from_value::<OrderUpdateNotice>(m.payload).expect("Not a notice"))
        .collect::<Vec<_>>();
    assert!(notices.iter().all(|n| n.trigger.is_revalidation()));
    let contexts = notices.iter().map(|n| n.context.as_str()).collect::<HashSet<_>>();
    assert_eq!(contexts.len(), count, "Every notice must carry a distinct context");
}

#[then(expr = "{int} fix requests are queued for distinct orders")]
async fn queued_fix_requests(world: &mut ReconcilerWorld, count: usize) {
    let messages = world.system().broker.ready_messages(ORDER_FIXES_QUEUE);
    let ids = messages
        .into_iter()
        .map(|m| match serde_json::from_value::<FixRequest>(m.payload).expect("Not a fix request") {
            FixRequest::Id { id } => id,
            other => panic!("Expected a single-order request, got {other:?}"),
        })
        .collect::<HashSet<_>>();
    assert_eq!(ids.len(), count);
}

#[then(expr = "{int} pool refresh(es) was/were requested")]
async fn pool_refreshes(world: &mut ReconcilerWorld, count: usize) {
    let messages = world.system().broker.ready_messages(ORDERBOOK_ORDERS_QUEUE);
    assert_eq!(messages.len(), count);
}
