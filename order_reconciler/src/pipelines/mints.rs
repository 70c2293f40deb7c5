use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    jobs::{Backoff, JobHandler, JobQueue, MessageBroker, PublishOutcome, QueueConfig},
    pipelines::{MintRefreshError, PipelineError},
};

pub const MINTS_REFRESH_QUEUE: &str = "mints-refresh";

pub fn mints_refresh_config() -> QueueConfig {
    QueueConfig::new(MINTS_REFRESH_QUEUE)
        .with_max_retries(1)
        .with_concurrency(10)
        .with_backoff(Backoff::exponential(Duration::from_secs(10)))
        .lazy()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintsRefreshPayload {
    pub collection: String,
}

/// Re-derives the mint configuration of a collection from its on-chain calldata.
#[async_trait]
pub trait MintRefresher: Send + Sync {
    async fn refresh_mints_for_collection(&self, collection: &str) -> Result<(), MintRefreshError>;
}

pub struct MintsRefreshJob<B> {
    config: QueueConfig,
    refresher: Arc<dyn MintRefresher>,
    queue: JobQueue<MintsRefreshPayload, B>,
}

impl<B: MessageBroker> MintsRefreshJob<B> {
    pub fn new(refresher: Arc<dyn MintRefresher>, broker: B) -> Self {
        let config = mints_refresh_config();
        let queue = JobQueue::new(config.clone(), broker);
        Self { config, refresher, queue }
    }

    /// Enqueues a refresh, keyed by the collection so that pending refreshes of the same collection coalesce.
    pub async fn add_to_queue(&self, payload: &MintsRefreshPayload) -> Result<PublishOutcome, PipelineError> {
        Ok(self.queue.send(payload, Some(&payload.collection)).await?)
    }
}

impl<B: MessageBroker> JobHandler for MintsRefreshJob<B> {
    type Error = PipelineError;
    type Payload = MintsRefreshPayload;

    fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn process(&self, payload: MintsRefreshPayload) -> Result<(), PipelineError> {
        trace!("📇️ [{MINTS_REFRESH_QUEUE}] Refreshing mints of {}", payload.collection);
        self.refresher.refresh_mints_for_collection(&payload.collection).await?;
        Ok(())
    }
}
