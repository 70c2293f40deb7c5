use std::{sync::Arc, time::Duration};

use log::*;
use tokio::{sync::Semaphore, task::JoinHandle};

use crate::jobs::{JobError, JobHandler, JobMessage, MessageBroker};

/// What happened to a message after one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acknowledged,
    Retried { attempt: u32, delay: Duration },
    DeadLettered,
}

/// The consumer side of a queue. Pulls messages from the broker and dispatches them to the handler, never running
/// more than the handler's declared concurrency at once.
pub struct JobRunner<H, B> {
    handler: Arc<H>,
    broker: B,
}

impl<H, B: Clone> Clone for JobRunner<H, B> {
    fn clone(&self) -> Self {
        Self { handler: Arc::clone(&self.handler), broker: self.broker.clone() }
    }
}

impl<H: JobHandler, B: MessageBroker> JobRunner<H, B> {
    pub fn new(handler: Arc<H>, broker: B) -> Self {
        Self { handler, broker }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Spawns the consumer loop. The loop runs until the task is aborted.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let config = self.handler.config();
            let queue = config.queue_name();
            let slots = Arc::new(Semaphore::new(config.concurrency()));
            info!("📨️ [{queue}] Consumer started with {} slots", config.concurrency());
            loop {
                let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                    break;
                };
                let message = match self.broker.consume(queue).await {
                    Ok(m) => m,
                    Err(e) => {
                        error!("📨️ [{queue}] Could not fetch the next message. {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    },
                };
                let runner = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = runner.handle_delivery(message).await {
                        error!("📨️ [{queue}] Could not settle message with the broker. {e}");
                    }
                    drop(permit);
                });
            }
            info!("📨️ [{queue}] Consumer stopped");
        })
    }

    /// Runs the handler against one delivered message and settles it with the broker.
    pub async fn handle_delivery(&self, mut message: JobMessage) -> Result<DeliveryOutcome, JobError> {
        let config = self.handler.config();
        let queue = config.queue_name();
        let payload = match serde_json::from_value::<H::Payload>(message.payload.clone()) {
            Ok(p) => p,
            Err(e) => {
                error!(
                    "📨️ [{queue}] Discarding undecodable message {}: {e}. Payload: {}",
                    message.message_id, message.payload
                );
                self.broker.dead_letter(message, &format!("Invalid payload. {e}")).await?;
                return Ok(DeliveryOutcome::DeadLettered);
            },
        };
        trace!("📨️ [{queue}] Processing message {} (retry {})", message.message_id, message.retry_count);
        match self.handler.process(payload).await {
            Ok(()) => {
                self.broker.ack(&message).await?;
                Ok(DeliveryOutcome::Acknowledged)
            },
            Err(e) if message.retry_count < config.max_retries() => {
                let attempt = message.retry_count + 1;
                let delay = config.backoff().delay_for(attempt);
                warn!(
                    "📨️ [{queue}] Message {} failed: {e}. Retry {attempt}/{} in {delay:?}. Payload: {}",
                    message.message_id,
                    config.max_retries(),
                    message.payload
                );
                message.retry_count = attempt;
                self.broker.requeue(message, delay).await?;
                Ok(DeliveryOutcome::Retried { attempt, delay })
            },
            Err(e) => {
                error!(
                    "📨️ [{queue}] Message {} failed permanently after {} retries: {e}. Payload: {}",
                    message.message_id, message.retry_count, message.payload
                );
                self.broker.dead_letter(message, &e.to_string()).await?;
                Ok(DeliveryOutcome::DeadLettered)
            },
        }
    }
}
