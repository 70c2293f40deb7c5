use thiserror::Error;

use crate::{jobs::BrokerError, traits::StoreError};

#[derive(Debug, Clone, Error)]
#[error("Search index error. {0}")]
pub struct IndexError(pub String);

#[derive(Debug, Clone, Error)]
#[error("Mint refresh failed. {0}")]
pub struct MintRefreshError(pub String);

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Store error. {0}")]
    Store(#[from] StoreError),
    #[error("Broker error. {0}")]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    MintRefresh(#[from] MintRefreshError),
}
