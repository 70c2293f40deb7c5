use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use log::*;
use tokio::sync::Notify;

use crate::jobs::{BrokerError, JobMessage, MessageBroker, PublishOutcome};

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub message: JobMessage,
    pub reason: String,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<JobMessage>,
    /// Dedup keys of messages that are ready or delayed, but not yet delivered.
    waiting_keys: HashSet<String>,
    delayed: usize,
    in_flight: usize,
    published: usize,
    dead: Vec<DeadLetter>,
    notify: Arc<Notify>,
}

impl QueueState {
    fn push_ready(&mut self, message: JobMessage) {
        self.ready.push_back(message);
        self.notify.notify_one();
    }

    /// Claims the dedup key of a message that is going back to the queue. Returns false when another pending message
    /// already holds the key, in which case the retried message is folded into it.
    fn reclaim_key(&mut self, message: &JobMessage) -> bool {
        match &message.dedup_key {
            Some(key) => self.waiting_keys.insert(key.clone()),
            None => true,
        }
    }
}

/// A process-local broker.
///
/// Suitable for single-replica deployments and tests. Messages do not survive a restart, so the `persistent` flag
/// of an envelope is carried but has no effect here.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    queues: Arc<Mutex<HashMap<String, QueueState>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_queue<R>(&self, queue: &str, f: impl FnOnce(&mut QueueState) -> R) -> Result<R, BrokerError> {
        let mut queues = self.queues.lock().map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        let state = queues.entry(queue.to_string()).or_default();
        Ok(f(state))
    }

    /// Messages currently waiting for delivery on `queue`, in delivery order.
    pub fn ready_messages(&self, queue: &str) -> Vec<JobMessage> {
        self.with_queue(queue, |q| q.ready.iter().cloned().collect()).unwrap_or_default()
    }

    /// Removes and returns every message waiting on `queue`, as if a consumer had taken and acknowledged them.
    pub fn take_ready(&self, queue: &str) -> Vec<JobMessage> {
        self.with_queue(queue, |q| {
            q.waiting_keys.clear();
            q.ready.drain(..).collect()
        })
        .unwrap_or_default()
    }

    pub fn dead_letters(&self, queue: &str) -> Vec<DeadLetter> {
        self.with_queue(queue, |q| q.dead.clone()).unwrap_or_default()
    }

    /// Number of messages accepted on `queue` since the broker was created. Coalesced publishes are not counted.
    pub fn published_count(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.published).unwrap_or_default()
    }

    pub fn in_flight(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.in_flight).unwrap_or_default()
    }

    pub fn delayed(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.delayed).unwrap_or_default()
    }
}

impl MessageBroker for InMemoryBroker {
    async fn publish(&self, message: JobMessage) -> Result<PublishOutcome, BrokerError> {
        let queue = message.queue.clone();
        self.with_queue(&queue, |state| {
            if let Some(key) = &message.dedup_key {
                if !state.waiting_keys.insert(key.clone()) {
                    trace!("📨️ [{queue}] Message with key {key} is already waiting. Coalesced.");
                    return PublishOutcome::Coalesced;
                }
            }
            state.published += 1;
            state.push_ready(message);
            PublishOutcome::Published
        })
    }

    async fn consume(&self, queue: &str) -> Result<JobMessage, BrokerError> {
        loop {
            let notify = self.with_queue(queue, |state| match state.ready.pop_front() {
                Some(message) => {
                    if let Some(key) = &message.dedup_key {
                        state.waiting_keys.remove(key);
                    }
                    state.in_flight += 1;
                    Ok(message)
                },
                None => Err(Arc::clone(&state.notify)),
            })?;
            match notify {
                Ok(message) => return Ok(message),
                Err(notify) => notify.notified().await,
            }
        }
    }

    async fn ack(&self, message: &JobMessage) -> Result<(), BrokerError> {
        self.with_queue(&message.queue, |state| {
            state.in_flight = state.in_flight.saturating_sub(1);
        })
    }

    async fn requeue(&self, message: JobMessage, delay: Duration) -> Result<(), BrokerError> {
        let queue = message.queue.clone();
        let reclaimed = self.with_queue(&queue, |state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            state.reclaim_key(&message)
        })?;
        if !reclaimed {
            let id = &message.message_id;
            trace!("📨️ [{queue}] A message with the same key is already waiting. Retry of {id} coalesced.");
            return Ok(());
        }
        if delay.is_zero() {
            return self.with_queue(&queue, |state| state.push_ready(message));
        }
        self.with_queue(&queue, |state| state.delayed += 1)?;
        let broker = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = broker.with_queue(&queue, |state| {
                state.delayed = state.delayed.saturating_sub(1);
                state.push_ready(message);
            });
            if let Err(e) = result {
                error!("📨️ [{queue}] Could not redeliver a delayed message: {e}");
            }
        });
        Ok(())
    }

    async fn dead_letter(&self, message: JobMessage, reason: &str) -> Result<(), BrokerError> {
        let queue = message.queue.clone();
        self.with_queue(&queue, |state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            state.dead.push(DeadLetter { message, reason: reason.to_string() });
        })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn message(key: Option<&str>) -> JobMessage {
        JobMessage::new("q", json!({"n": 1})).with_dedup_key(key.map(String::from))
    }

    #[tokio::test]
    async fn messages_with_the_same_key_coalesce_while_waiting() {
        let broker = InMemoryBroker::new();
        assert_eq!(broker.publish(message(Some("a"))).await.unwrap(), PublishOutcome::Published);
        assert_eq!(broker.publish(message(Some("a"))).await.unwrap(), PublishOutcome::Coalesced);
        assert_eq!(broker.publish(message(Some("b"))).await.unwrap(), PublishOutcome::Published);
        assert_eq!(broker.publish(message(None)).await.unwrap(), PublishOutcome::Published);
        assert_eq!(broker.publish(message(None)).await.unwrap(), PublishOutcome::Published);
        assert_eq!(broker.ready_messages("q").len(), 4);
        assert_eq!(broker.published_count("q"), 4);
    }

    #[tokio::test]
    async fn a_delivered_key_can_be_queued_again() {
        let broker = InMemoryBroker::new();
        broker.publish(message(Some("a"))).await.unwrap();
        let m = broker.consume("q").await.unwrap();
        assert_eq!(broker.in_flight("q"), 1);
        assert_eq!(broker.publish(message(Some("a"))).await.unwrap(), PublishOutcome::Published);
        broker.ack(&m).await.unwrap();
        assert_eq!(broker.in_flight("q"), 0);
        assert_eq!(broker.ready_messages("q").len(), 1);
    }

    #[tokio::test]
    async fn retried_messages_keep_their_key() {
        let broker = InMemoryBroker::new();
        broker.publish(message(Some("a"))).await.unwrap();
        let m = broker.consume("q").await.unwrap();
        broker.requeue(m, Duration::ZERO).await.unwrap();
        assert_eq!(broker.publish(message(Some("a"))).await.unwrap(), PublishOutcome::Coalesced);
        assert_eq!(broker.ready_messages("q").len(), 1);
        assert_eq!(broker.in_flight("q"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_messages_keep_their_key() {
        let broker = InMemoryBroker::new();
        broker.publish(message(Some("a"))).await.unwrap();
        let m = broker.consume("q").await.unwrap();
        broker.requeue(m, Duration::from_secs(10)).await.unwrap();
        assert_eq!(broker.publish(message(Some("a"))).await.unwrap(), PublishOutcome::Coalesced);
        let m = broker.consume("q").await.unwrap();
        assert_eq!(m.dedup_key.as_deref(), Some("a"));
        assert!(broker.ready_messages("q").is_empty());
        assert_eq!(broker.publish(message(Some("a"))).await.unwrap(), PublishOutcome::Published);
    }

    #[tokio::test]
    async fn a_retry_folds_into_a_newer_duplicate() {
        let broker = InMemoryBroker::new();
        broker.publish(message(Some("a"))).await.unwrap();
        let m = broker.consume("q").await.unwrap();
        assert_eq!(broker.publish(message(Some("a"))).await.unwrap(), PublishOutcome::Published);
        broker.requeue(m, Duration::ZERO).await.unwrap();
        assert_eq!(broker.ready_messages("q").len(), 1);
        assert_eq!(broker.in_flight("q"), 0);
    }

    #[tokio::test]
    async fn consume_waits_for_a_publish() {
        let broker = InMemoryBroker::new();
        let b2 = broker.clone();
        let consumer = tokio::spawn(async move { b2.consume("q").await });
        tokio::task::yield_now().await;
        broker.publish(message(None)).await.unwrap();
        let m = consumer.await.unwrap().unwrap();
        assert_eq!(m.payload, json!({"n": 1}));
    }

    #[tokio::test(start_paused = true)]
    async fn requeued_messages_come_back_after_the_delay() {
        let broker = InMemoryBroker::new();
        broker.publish(message(None)).await.unwrap();
        let mut m = broker.consume("q").await.unwrap();
        m.retry_count = 1;
        let start = tokio::time::Instant::now();
        broker.requeue(m, Duration::from_secs(10)).await.unwrap();
        assert_eq!(broker.delayed("q"), 1);
        let m = broker.consume("q").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(m.retry_count, 1);
        assert_eq!(broker.delayed("q"), 0);
    }

    #[tokio::test]
    async fn dead_letters_are_kept() {
        let broker = InMemoryBroker::new();
        broker.publish(message(None)).await.unwrap();
        let m = broker.consume("q").await.unwrap();
        broker.dead_letter(m, "boom").await.unwrap();
        let dead = broker.dead_letters("q");
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, "boom");
        assert_eq!(broker.in_flight("q"), 0);
    }
}
