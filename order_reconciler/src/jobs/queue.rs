use std::marker::PhantomData;

use futures_util::future::join_all;
use log::*;
use serde::Serialize;

use crate::jobs::{BrokerError, JobMessage, MessageBroker, PublishOutcome, QueueConfig};

/// The tally of a [`JobQueue::send_batch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub published: usize,
    pub coalesced: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.published + self.coalesced + self.failed
    }

    /// Turns a report with failures into an error, so that a producing job is retried.
    pub fn into_result(self) -> Result<Self, BrokerError> {
        if self.failed > 0 {
            Err(BrokerError::PartialBatch(self.failed))
        } else {
            Ok(self)
        }
    }
}

/// The producer side of a queue. Cheap to clone.
#[derive(Debug)]
pub struct JobQueue<P, B> {
    config: QueueConfig,
    broker: B,
    _payload: PhantomData<fn(P)>,
}

impl<P, B: Clone> Clone for JobQueue<P, B> {
    fn clone(&self) -> Self {
        Self { config: self.config.clone(), broker: self.broker.clone(), _payload: PhantomData }
    }
}

impl<P, B> JobQueue<P, B>
where
    P: Serialize + Send + Sync,
    B: MessageBroker,
{
    pub fn new(config: QueueConfig, broker: B) -> Self {
        Self { config, broker, _payload: PhantomData }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn queue_name(&self) -> &'static str {
        self.config.queue_name()
    }

    /// Enqueues a single payload.
    ///
    /// When `job_id` is given it is the dedup key. Lazy queues fall back to the payload itself as the key, so rapid
    /// enqueues of identical work collapse into one waiting message.
    pub async fn send(&self, payload: &P, job_id: Option<&str>) -> Result<PublishOutcome, BrokerError> {
        let message = self.envelope(payload, job_id)?;
        let outcome = self.broker.publish(message).await?;
        trace!("📨️ [{}] Enqueued message: {outcome:?}", self.queue_name());
        Ok(outcome)
    }

    /// Enqueues every payload independently. A failure on one item does not prevent the others from being sent.
    pub async fn send_batch(&self, payloads: &[P]) -> BatchReport {
        let results = join_all(payloads.iter().map(|p| self.send(p, None))).await;
        let mut report = BatchReport::default();
        for result in results {
            match result {
                Ok(PublishOutcome::Published) => report.published += 1,
                Ok(PublishOutcome::Coalesced) => report.coalesced += 1,
                Err(e) => {
                    warn!("📨️ [{}] Could not enqueue a batch item. {e}", self.queue_name());
                    report.failed += 1;
                },
            }
        }
        debug!(
            "📨️ [{}] Batch of {} sent. {} published, {} coalesced, {} failed",
            self.queue_name(),
            report.total(),
            report.published,
            report.coalesced,
            report.failed
        );
        report
    }

    fn envelope(&self, payload: &P, job_id: Option<&str>) -> Result<JobMessage, BrokerError> {
        let queue = self.queue_name();
        let value = serde_json::to_value(payload)
            .map_err(|e| BrokerError::Serialization { queue: queue.to_string(), reason: e.to_string() })?;
        let dedup_key = match job_id {
            Some(id) => Some(id.to_string()),
            None if self.config.is_lazy() => Some(value.to_string()),
            None => None,
        };
        Ok(JobMessage::new(queue, value).with_dedup_key(dedup_key).with_persistence(self.config.is_persistent()))
    }
}

#[cfg(test)]
mod test {
    use serde::Serialize;

    use super::*;
    use crate::jobs::InMemoryBroker;

    #[derive(Debug, Serialize)]
    struct Ping {
        n: u32,
        tag: &'static str,
    }

    #[tokio::test]
    async fn lazy_queues_coalesce_identical_payloads() {
        let broker = InMemoryBroker::new();
        let queue = JobQueue::<Ping, _>::new(QueueConfig::new("pings").lazy(), broker.clone());
        for _ in 0..3 {
            queue.send(&Ping { n: 1, tag: "a" }, None).await.unwrap();
        }
        queue.send(&Ping { n: 2, tag: "a" }, None).await.unwrap();
        assert_eq!(broker.ready_messages("pings").len(), 2);
    }

    #[tokio::test]
    async fn eager_queues_keep_duplicates_unless_a_job_id_is_given() {
        let broker = InMemoryBroker::new();
        let queue = JobQueue::<Ping, _>::new(QueueConfig::new("pings").persistent(), broker.clone());
        queue.send(&Ping { n: 1, tag: "a" }, None).await.unwrap();
        queue.send(&Ping { n: 1, tag: "a" }, None).await.unwrap();
        assert_eq!(queue.send(&Ping { n: 1, tag: "a" }, Some("x")).await.unwrap(), PublishOutcome::Published);
        assert_eq!(queue.send(&Ping { n: 9, tag: "b" }, Some("x")).await.unwrap(), PublishOutcome::Coalesced);
        let ready = broker.ready_messages("pings");
        assert_eq!(ready.len(), 3);
        assert!(ready.iter().all(|m| m.persistent));
    }

    #[tokio::test]
    async fn batch_report_counts_each_item() {
        let broker = InMemoryBroker::new();
        let queue = JobQueue::new(QueueConfig::new("pings").lazy(), broker.clone());
        let payloads = vec![Ping { n: 1, tag: "a" }, Ping { n: 1, tag: "a" }, Ping { n: 2, tag: "a" }];
        let report = queue.send_batch(&payloads).await;
        assert_eq!(report, BatchReport { published: 2, coalesced: 1, failed: 0 });
        assert!(report.into_result().is_ok());
        let failed = BatchReport { published: 1, coalesced: 0, failed: 2 };
        assert!(matches!(failed.into_result(), Err(BrokerError::PartialBatch(2))));
    }
}
