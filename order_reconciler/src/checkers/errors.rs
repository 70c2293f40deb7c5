use thiserror::Error;

use crate::{chain::ChainError, fanout::RefreshError, traits::StoreError};

/// Infrastructure failures during a check. Unlike [`CheckOutcome::Unrecognized`](crate::checkers::CheckOutcome),
/// these say nothing about the order, and the check is worth repeating once the collaborator is back.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("Order store error. {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Refresh(#[from] RefreshError),
    #[error("The RPC provider is unreachable. {0}")]
    Chain(ChainError),
}
