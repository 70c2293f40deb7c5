use std::{future::Future, time::Duration};

use crate::jobs::{BrokerError, JobMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// A message with the same dedup key is already waiting; nothing new was queued.
    Coalesced,
}

/// The contract the job framework needs from a message broker.
///
/// Implementations provide at-least-once delivery: a message that is consumed but never acknowledged,
/// requeued or dead-lettered (because the consumer crashed) must eventually be delivered again. No ordering is
/// guaranteed between messages of the same queue.
pub trait MessageBroker: Clone + Send + Sync + 'static {
    fn publish(&self, message: JobMessage) -> impl Future<Output = Result<PublishOutcome, BrokerError>> + Send;

    /// Waits for the next message on `queue`.
    fn consume(&self, queue: &str) -> impl Future<Output = Result<JobMessage, BrokerError>> + Send;

    fn ack(&self, message: &JobMessage) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Schedules the message for redelivery after `delay`. The caller has already bumped `retry_count`.
    fn requeue(&self, message: JobMessage, delay: Duration) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Parks a message that will not be retried any further.
    fn dead_letter(&self, message: JobMessage, reason: &str) -> impl Future<Output = Result<(), BrokerError>> + Send;
}
