use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The envelope a broker carries for every queued job.
///
/// The broker owns the message from publication until it is acknowledged or dead-lettered by the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    pub message_id: String,
    pub queue: String,
    pub payload: serde_json::Value,
    /// Number of times this message has already been retried. Zero on first delivery.
    pub retry_count: u32,
    /// Messages with the same key coalesce while one of them is still waiting to be delivered.
    pub dedup_key: Option<String>,
    pub persistent: bool,
    pub published_at: DateTime<Utc>,
}

impl JobMessage {
    pub fn new(queue: &str, payload: serde_json::Value) -> Self {
        Self {
            message_id: format!("{:016x}", rand::random::<u64>()),
            queue: queue.to_string(),
            payload,
            retry_count: 0,
            dedup_key: None,
            persistent: false,
            published_at: Utc::now(),
        }
    }

    pub fn with_dedup_key(mut self, key: Option<String>) -> Self {
        self.dedup_key = key;
        self
    }

    pub fn with_persistence(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}
