use std::{str::FromStr, time::Duration};

use chrono::{TimeZone, Utc};
use order_reconciler::{
    db_types::*,
    locks::{SchedulerLock, SharedCache},
    pipelines::{ActivitySynthesizer, ActivityType},
    test_utils::prepare_env::{drop_database, fresh_database},
    ActivityStore,
    ListingStore,
    OrderScope,
    OrderStore,
};
use reconcile_common::{Address, TokenSetId};

fn address(byte: &str) -> Address {
    Address::from_str(&format!("0x{:0>40}", byte)).expect("valid address")
}

fn sell_order(id: &str, token_id: &str) -> NewOrder {
    let token_set = TokenSetId::single_token(&address("c0"), token_id);
    NewOrder::new(OrderId::from(id), OrderKind::Seaport, Side::Sell, address("aa"), token_set)
}

fn assert_expiration_invariant(order: &Order) {
    if order.status().is_active() {
        assert_eq!(order.expiration, order.valid_until, "active order {} must keep its validity bound", order.id);
    } else {
        assert!(order.expiration.is_some(), "inactive order {} must have a closed expiration", order.id);
    }
}

#[tokio::test]
async fn status_updates_are_conditional_and_keep_the_expiration_invariant() {
    let (db, url) = fresh_database(2).await;
    let valid_until = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let order = db.insert_order(sell_order("0x01", "1").with_valid_until(valid_until)).await.unwrap();
    assert_eq!(order.expiration, Some(valid_until));

    let id = OrderId::from("0x01");
    let cancelled = OrderStatus::new(FillabilityStatus::Cancelled, ApprovalStatus::Approved);
    assert!(db.update_order_status(&id, cancelled).await.unwrap());
    assert!(!db.update_order_status(&id, cancelled).await.unwrap(), "second identical write must be a no-op");
    let stored = db.fetch_order(&id).await.unwrap().unwrap();
    assert_eq!(stored.status(), cancelled);
    assert!(stored.expiration.unwrap() <= Utc::now());
    assert_expiration_invariant(&stored);

    // Cancelled orders are no longer eligible for a re-check.
    assert!(db.fetch_recheckable_order(&id).await.unwrap().is_none());

    let open = db.insert_order(sell_order("0x02", "2")).await.unwrap();
    assert_eq!(open.expiration, None);
    let id = OrderId::from("0x02");
    let no_balance = OrderStatus::new(FillabilityStatus::NoBalance, ApprovalStatus::Approved);
    assert!(db.update_order_status(&id, no_balance).await.unwrap());
    assert!(db.fetch_recheckable_order(&id).await.unwrap().is_some());
    assert!(db.update_order_status(&id, OrderStatus::ACTIVE).await.unwrap());
    let stored = db.fetch_order(&id).await.unwrap().unwrap();
    assert_eq!(stored.expiration, None);
    assert_expiration_invariant(&stored);

    assert!(!db.update_order_status(&OrderId::from("0xmissing"), no_balance).await.unwrap());
    drop_database(db, &url).await;
}

#[tokio::test]
async fn fillable_ids_are_paged_by_scope() {
    let (db, url) = fresh_database(2).await;
    for i in 0..7 {
        db.insert_order(sell_order(&format!("0x{i:02}"), &i.to_string())).await.unwrap();
    }
    let buy = NewOrder::new(
        OrderId::from("0xb0"),
        OrderKind::Seaport,
        Side::Buy,
        address("bb"),
        TokenSetId::contract(&address("c0")),
    )
    .with_contract(address("c0"));
    db.insert_order(buy).await.unwrap();
    let filled = OrderStatus::new(FillabilityStatus::Filled, ApprovalStatus::Approved);
    let inactive = sell_order("0x99", "99").with_status(filled);
    db.insert_order(inactive).await.unwrap();

    let scope = OrderScope::Contract { contract: address("c0"), side: Side::Sell };
    let first = db.fetch_fillable_order_ids(&scope, None, 3).await.unwrap();
    assert_eq!(first, vec![OrderId::from("0x00"), OrderId::from("0x01"), OrderId::from("0x02")]);
    let second = db.fetch_fillable_order_ids(&scope, first.last(), 3).await.unwrap();
    assert_eq!(second, vec![OrderId::from("0x03"), OrderId::from("0x04"), OrderId::from("0x05")]);
    let third = db.fetch_fillable_order_ids(&scope, second.last(), 3).await.unwrap();
    assert_eq!(third, vec![OrderId::from("0x06")]);

    let buys = OrderScope::Contract { contract: address("c0"), side: Side::Buy };
    assert_eq!(db.fetch_fillable_order_ids(&buys, None, 10).await.unwrap(), vec![OrderId::from("0xb0")]);
    let maker = db.fetch_fillable_order_ids(&OrderScope::Maker(address("aa")), None, 100).await.unwrap();
    assert_eq!(maker.len(), 7);
    let token = OrderScope::Token(TokenSetId::single_token(&address("c0"), "4"));
    assert_eq!(db.fetch_fillable_order_ids(&token, None, 10).await.unwrap(), vec![OrderId::from("0x04")]);
    drop_database(db, &url).await;
}

#[tokio::test]
async fn locks_are_exclusive_and_all_or_nothing() {
    let (db, url) = fresh_database(2).await;
    let ttl = Duration::from_secs(30);
    let token = db.acquire(&["a-cron-lock"], ttl).await.unwrap().expect("free lock is acquired");
    assert_eq!(token.names(), ["a-cron-lock".to_string()]);
    assert!(db.acquire(&["a-cron-lock"], ttl).await.unwrap().is_none());
    // One held name blocks the whole set, and the free name is not left behind.
    assert!(db.acquire(&["b-cron-lock", "a-cron-lock"], ttl).await.unwrap().is_none());
    assert!(db.acquire(&["b-cron-lock"], ttl).await.unwrap().is_some());

    let short = db.acquire(&["short"], Duration::from_millis(50)).await.unwrap();
    assert!(short.is_some());
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(db.acquire(&["short"], ttl).await.unwrap().is_some(), "expired locks can be taken over");
    drop_database(db, &url).await;
}

#[tokio::test]
async fn cache_set_if_absent_respects_ttl() {
    let (db, url) = fresh_database(2).await;
    assert!(db.set_if_absent("order-fixes:nftx:0x1", "locked", Duration::from_millis(50)).await.unwrap());
    assert!(!db.set_if_absent("order-fixes:nftx:0x1", "again", Duration::from_secs(60)).await.unwrap());
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(db.set_if_absent("order-fixes:nftx:0x1", "again", Duration::from_secs(60)).await.unwrap());

    assert!(db.remove("order-fixes:nftx:0x1").await.unwrap());
    assert!(!db.remove("order-fixes:nftx:0x1").await.unwrap());
    assert!(db.set_if_absent("order-fixes:nftx:0x1", "third", Duration::from_secs(60)).await.unwrap());
    drop_database(db, &url).await;
}

#[tokio::test]
async fn transfer_events_flow_through_the_pending_backlog() {
    let (db, url) = fresh_database(2).await;
    let collection = CollectionRecord { id: "c0-collection".into(), name: Some("Zeroes".into()), image: None };
    let token = TokenRecord::new(address("c0"), "5").with_name("Five").with_collection("c0-collection");
    db.upsert_token(token, Some(collection)).await.unwrap();
    for (i, from) in [order_reconciler::pipelines::ZERO_ADDRESS, "0x00000000000000000000000000000000000000aa"]
        .iter()
        .enumerate()
    {
        let event = NewTransferEvent {
            contract: address("c0"),
            token_id: "5".into(),
            from_address: Address::from_str(from).unwrap(),
            to_address: address("bb"),
            amount: 1,
            key: TransferEventKey::new("0xfeed", i as i64, 0),
            block_hash: "0xblock".into(),
            timestamp: 1_700_000_000 + i as i64,
        };
        db.insert_transfer_event(event).await.unwrap();
    }
    let kind = ActivityEventKind::NftTransferEvent;
    assert_eq!(db.count_pending_events(kind).await.unwrap(), 2);
    let keys = db.pop_pending_events(kind, 50).await.unwrap();
    assert_eq!(keys, vec![TransferEventKey::new("0xfeed", 0, 0), TransferEventKey::new("0xfeed", 1, 0)]);
    assert_eq!(db.count_pending_events(kind).await.unwrap(), 0);

    let mut lookup = keys.clone();
    lookup.push(TransferEventKey::new("0xunknown", 0, 0));
    let rows = db.fetch_transfer_events(&lookup).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].token_name.as_deref(), Some("Five"));
    assert_eq!(rows[0].collection_name.as_deref(), Some("Zeroes"));

    let documents = ActivitySynthesizer::default().build_all(&rows);
    assert_eq!(documents[0].activity_type, ActivityType::Mint);
    assert_eq!(documents[1].activity_type, ActivityType::Transfer);
    db.push_pending_activities(&documents).await.unwrap();
    db.push_pending_activities(&documents[..1]).await.unwrap();
    assert_eq!(db.fetch_pending_activities().await.unwrap().len(), 2);

    db.push_pending_events(kind, &keys).await.unwrap();
    assert_eq!(db.pop_pending_events(kind, 1).await.unwrap(), vec![TransferEventKey::new("0xfeed", 0, 0)]);
    drop_database(db, &url).await;
}

#[tokio::test]
async fn listing_sources_join_the_makers_balance() {
    let (db, url) = fresh_database(2).await;
    db.insert_order(sell_order("0x01", "9")).await.unwrap();
    assert!(db.fetch_listing_source(&OrderId::from("0x01")).await.unwrap().is_none());

    db.upsert_token(TokenRecord::new(address("c0"), "9").with_name("Nine"), None).await.unwrap();
    let balance = NftBalance {
        contract: address("c0"),
        token_id: "9".into(),
        owner: address("aa"),
        amount: 2,
        acquired_at: None,
    };
    db.upsert_balance(balance.clone()).await.unwrap();
    let source = db.fetch_listing_source(&OrderId::from("0x01")).await.unwrap().expect("listing source");
    assert_eq!(source.ownership_owner, address("aa"));
    assert_eq!(source.ownership_amount, 2);
    assert_eq!(source.token_name.as_deref(), Some("Nine"));
    assert_eq!(source.collection_id, None);
    assert_eq!(db.nft_balance(&address("c0"), "9", &address("aa")).await.unwrap(), 2);

    db.upsert_balance(NftBalance { amount: 0, ..balance }).await.unwrap();
    assert!(db.fetch_listing_source(&OrderId::from("0x01")).await.unwrap().is_none());
    assert_eq!(db.nft_balance(&address("c0"), "9", &address("cc")).await.unwrap(), 0);
    drop_database(db, &url).await;
}
