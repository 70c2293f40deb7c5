use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("The message broker is unavailable. {0}")]
    Unavailable(String),
    #[error("Could not serialize payload for queue {queue}. {reason}")]
    Serialization { queue: String, reason: String },
    #[error("{0} of the messages in the batch could not be published")]
    PartialBatch(usize),
}

/// Errors raised by the job framework itself, as opposed to those returned by a handler's `process` method.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),
    #[error("Could not decode payload for queue {queue}. {reason}")]
    InvalidPayload { queue: String, reason: String },
}
