use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use order_reconciler::{
    chain::{ChainError, ChainReader},
    checkers::{CheckContext, CheckFailure, CheckerRegistry, OffChainValidator},
    db_types::Order,
    fanout::RefreshThrottle,
    jobs::{InMemoryBroker, JobRunner},
    order_fixes::OrderFixesJob,
    pipelines::{
        start_activity_trigger,
        ActivitySynthesizer,
        MintRefreshError,
        MintRefresher,
        MintsRefreshJob,
        ProcessActivityEventsJob,
        ProcessTokenListingEventJob,
    },
    SqliteDatabase,
};
use reconcile_common::Address;
use tokio::task::JoinHandle;

use crate::{
    adapters::{AlloyChainReader, HttpSearchIndex, SdkClient},
    config::WorkerConfig,
    errors::WorkerError,
};

/// Stands in for the protocol SDK when `RCW_SDK_URL` is not set. Every check it is asked for is unrecognized.
struct UnconfiguredSdk;

#[async_trait]
impl OffChainValidator for UnconfiguredSdk {
    async fn check(&self, _order: &Order, _context: &CheckContext) -> Result<(), CheckFailure> {
        Err(CheckFailure::Other("no protocol SDK is configured".into()))
    }
}

#[async_trait]
impl MintRefresher for UnconfiguredSdk {
    async fn refresh_mints_for_collection(&self, collection: &str) -> Result<(), MintRefreshError> {
        Err(MintRefreshError(format!("Cannot refresh the mints of {collection}: no protocol SDK is configured")))
    }
}

/// Stands in for the RPC provider when `RCW_RPC_URL` is not set.
struct UnconfiguredChain;

#[async_trait]
impl ChainReader for UnconfiguredChain {
    async fn get_all_held_ids(&self, pool: &Address) -> Result<Vec<String>, ChainError> {
        Err(ChainError::NotConfigured(format!("Cannot read the held ids of {pool}")))
    }
}

fn sdk_adapters(config: &WorkerConfig) -> Result<(Arc<dyn OffChainValidator>, Arc<dyn MintRefresher>), WorkerError> {
    match &config.sdk_url {
        Some(url) => {
            let sdk = Arc::new(SdkClient::new(url).map_err(|e| WorkerError::InitializeError(e.to_string()))?);
            let validator: Arc<dyn OffChainValidator> = Arc::clone(&sdk) as Arc<dyn OffChainValidator>;
            let refresher: Arc<dyn MintRefresher> = sdk;
            Ok((validator, refresher))
        },
        None => {
            warn!("🚀️ No protocol SDK is configured. Off-chain checks will leave orders untouched.");
            let validator: Arc<dyn OffChainValidator> = Arc::new(UnconfiguredSdk);
            let refresher: Arc<dyn MintRefresher> = Arc::new(UnconfiguredSdk);
            Ok((validator, refresher))
        },
    }
}

fn chain_adapter(config: &WorkerConfig) -> Result<Arc<dyn ChainReader>, WorkerError> {
    match &config.rpc_url {
        Some(url) => {
            let reader = AlloyChainReader::new(url).map_err(|e| WorkerError::InitializeError(e.to_string()))?;
            Ok(Arc::new(reader))
        },
        None => {
            warn!("🚀️ No RPC provider is configured. Collection pool orders will leave their status untouched.");
            Ok(Arc::new(UnconfiguredChain))
        },
    }
}

/// Connects the store, starts one consumer per queue and the activity trigger, then runs until Ctrl-C.
pub async fn run_worker(config: WorkerConfig) -> Result<(), WorkerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| WorkerError::InitializeError(e.to_string()))?;
    db.migrate().await?;
    info!("🚀️ Connected to {} and ran migrations", config.database_url);
    if !config.do_background_work {
        info!("🚀️ Background work is disabled. Nothing more to do.");
        return Ok(());
    }
    let handles = start_consumers(&config, db)?;
    info!("🚀️ {} background tasks are running. Press Ctrl-C to stop.", handles.len());
    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutting down the worker");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

/// Spawns the queue consumers and triggers that `config` enables and returns their handles.
pub fn start_consumers(config: &WorkerConfig, db: SqliteDatabase) -> Result<Vec<JoinHandle<()>>, WorkerError> {
    let broker = InMemoryBroker::new();
    let (validator, refresher) = sdk_adapters(config)?;
    let chain = chain_adapter(config)?;
    let throttle = RefreshThrottle::new(db.clone(), broker.clone()).with_ttl(config.pool_refresh_ttl);
    let registry = CheckerRegistry::with_default_checkers(validator, chain, db.clone(), throttle);

    let mut handles = Vec::new();
    let fixes = OrderFixesJob::new(db.clone(), registry, broker.clone()).with_page_size(config.fix_page_size);
    handles.push(JobRunner::new(Arc::new(fixes), broker.clone()).start());
    let mints = MintsRefreshJob::new(refresher, broker.clone());
    handles.push(JobRunner::new(Arc::new(mints), broker.clone()).start());

    if !config.do_search_work {
        info!("🚀️ Search work is disabled. The indexing pipelines are not started.");
        return Ok(handles);
    }
    let synthesizer = ActivitySynthesizer::default().with_mint_addresses(config.mint_addresses.iter().cloned());
    let activities = ProcessActivityEventsJob::new(db.clone(), synthesizer, broker.clone(), true)
        .with_batch_size(config.activity_batch_size);
    let producer = activities.producer();
    handles.push(JobRunner::new(Arc::new(activities), broker.clone()).start());
    handles.push(start_activity_trigger(producer, db.clone(), config.activity_trigger_interval));

    match &config.search_url {
        Some(url) => {
            let index = HttpSearchIndex::new(url).map_err(|e| WorkerError::InitializeError(e.to_string()))?;
            let listings = ProcessTokenListingEventJob::new(db, Arc::new(index), broker.clone());
            handles.push(JobRunner::new(Arc::new(listings), broker).start());
        },
        None => warn!("🚀️ No search index is configured. Token listing events will not be consumed."),
    }
    Ok(handles)
}
