use crate::jobs::Backoff;

/// The delivery policy a job type declares for its queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    queue_name: &'static str,
    max_retries: u32,
    concurrency: usize,
    backoff: Backoff,
    persistent: bool,
    lazy_mode: bool,
}

impl QueueConfig {
    pub fn new(queue_name: &'static str) -> Self {
        Self {
            queue_name,
            max_retries: 0,
            concurrency: 1,
            backoff: Backoff::default(),
            persistent: false,
            lazy_mode: false,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Values below 1 are raised to 1; a queue always has at least one consumer slot.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy_mode = true;
        self
    }

    pub fn queue_name(&self) -> &'static str {
        self.queue_name
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy_mode
    }
}
