use std::time::Duration;

use log::*;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::{
    db_types::{ActivityEventKind, TransferEventKey},
    jobs::{BrokerError, JobHandler, JobQueue, MessageBroker, PublishOutcome, QueueConfig},
    locks::SchedulerLock,
    pipelines::{ActivitySynthesizer, PipelineError},
    scheduler::PeriodicTrigger,
    traits::{ActivityStore, StoreError},
};

pub const PROCESS_ACTIVITY_EVENTS_QUEUE: &str = "process-activity-events-queue";
pub const DEFAULT_ACTIVITY_BATCH_SIZE: u32 = 50;

pub fn process_activity_events_config() -> QueueConfig {
    QueueConfig::new(PROCESS_ACTIVITY_EVENTS_QUEUE).with_max_retries(10).with_concurrency(1).persistent().lazy()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessActivityEventsPayload {
    pub event_kind: ActivityEventKind,
}

/// Enqueues activity batches. Does nothing when search indexing is disabled.
#[derive(Clone)]
pub struct ActivityEventsProducer<B> {
    queue: JobQueue<ProcessActivityEventsPayload, B>,
    enabled: bool,
}

impl<B: MessageBroker> ActivityEventsProducer<B> {
    pub fn new(broker: B, enabled: bool) -> Self {
        Self { queue: JobQueue::new(process_activity_events_config(), broker), enabled }
    }

    pub async fn add_to_queue(&self, event_kind: ActivityEventKind) -> Result<Option<PublishOutcome>, BrokerError> {
        if !self.enabled {
            return Ok(None);
        }
        let outcome = self.queue.send(&ProcessActivityEventsPayload { event_kind }, None).await?;
        Ok(Some(outcome))
    }
}

/// Starts the lock-gated trigger that enqueues a transfer-event batch every `interval`.
pub fn start_activity_trigger<L, B>(producer: ActivityEventsProducer<B>, lock: L, interval: Duration) -> JoinHandle<()>
where
    L: SchedulerLock,
    B: MessageBroker,
{
    PeriodicTrigger::new(PROCESS_ACTIVITY_EVENTS_QUEUE, interval, lock).start(move || {
        let producer = producer.clone();
        async move { producer.add_to_queue(ActivityEventKind::NftTransferEvent).await.map(|_| ()) }
    })
}

pub struct ProcessActivityEventsJob<S, B> {
    config: QueueConfig,
    store: S,
    synthesizer: ActivitySynthesizer,
    producer: ActivityEventsProducer<B>,
    batch_size: u32,
}

impl<S: ActivityStore, B: MessageBroker> ProcessActivityEventsJob<S, B> {
    pub fn new(store: S, synthesizer: ActivitySynthesizer, broker: B, search_enabled: bool) -> Self {
        Self {
            config: process_activity_events_config(),
            store,
            synthesizer,
            producer: ActivityEventsProducer::new(broker, search_enabled),
            batch_size: DEFAULT_ACTIVITY_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn producer(&self) -> ActivityEventsProducer<B> {
        self.producer.clone()
    }

    /// Pulls one batch of pending events and turns it into activity documents. Returns the number of documents
    /// produced. If synthesis fails, the events are put back on the pending list and the batch counts as done.
    pub async fn process_batch(&self, kind: ActivityEventKind) -> Result<usize, PipelineError> {
        let events = self.store.pop_pending_events(kind, self.batch_size).await?;
        info!("📇️ [{PROCESS_ACTIVITY_EVENTS_QUEUE}] {} pending {kind} events", events.len());
        if events.is_empty() {
            return Ok(0);
        }
        match self.synthesize(&events).await {
            Ok(count) => {
                debug!("📇️ [{PROCESS_ACTIVITY_EVENTS_QUEUE}] {count} activities generated from {kind} events");
                Ok(count)
            },
            Err(e) => {
                error!("📇️ [{PROCESS_ACTIVITY_EVENTS_QUEUE}] Failed to process {kind} events. {e}");
                self.store.push_pending_events(kind, &events).await?;
                Ok(0)
            },
        }
    }

    async fn synthesize(&self, events: &[TransferEventKey]) -> Result<usize, StoreError> {
        let rows = self.store.fetch_transfer_events(events).await?;
        let activities = self.synthesizer.build_all(&rows);
        if !activities.is_empty() {
            self.store.push_pending_activities(&activities).await?;
        }
        Ok(activities.len())
    }
}

impl<S: ActivityStore, B: MessageBroker> JobHandler for ProcessActivityEventsJob<S, B> {
    type Error = PipelineError;
    type Payload = ProcessActivityEventsPayload;

    fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn process(&self, payload: ProcessActivityEventsPayload) -> Result<(), PipelineError> {
        self.process_batch(payload.event_kind).await.map(|_| ())
    }
}
