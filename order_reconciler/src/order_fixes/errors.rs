use thiserror::Error;

use crate::{checkers::CheckError, jobs::BrokerError, traits::StoreError};

/// Infrastructure failures while fixing orders. These are returned from the job so that it is retried.
#[derive(Debug, Clone, Error)]
pub enum OrderFixError {
    #[error("Order store error. {0}")]
    Store(#[from] StoreError),
    #[error("Could not enqueue follow-up work. {0}")]
    Broker(#[from] BrokerError),
    #[error("Could not complete the re-check. {0}")]
    Check(#[from] CheckError),
}
