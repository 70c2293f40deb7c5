use order_reconciler::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Could not initialize the worker. {0}")]
    InitializeError(String),
    #[error("Invalid worker configuration. {0}")]
    ConfigurationError(String),
    #[error("Store error. {0}")]
    StoreError(#[from] StoreError),
    #[error("An I/O error happened in the worker. {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Clone, Error)]
pub enum HttpAdapterError {
    #[error("Could not build the HTTP client. {0}")]
    Initialization(String),
    #[error("The request failed. {0}")]
    Transport(String),
    #[error("The service returned status {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not parse the response. {0}")]
    JsonError(String),
}
