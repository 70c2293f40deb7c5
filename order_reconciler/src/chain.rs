//! Read-only access to on-chain state.
use async_trait::async_trait;
use reconcile_common::Address;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Could not reach the RPC provider. {0}")]
    Transport(String),
    #[error("The RPC provider returned an error. {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Could not decode the call result. {0}")]
    Decode(String),
    #[error("No RPC provider is configured. {0}")]
    NotConfigured(String),
}

impl ChainError {
    /// Only transport failures are worth repeating. A revert, a malformed result or a missing provider will look the
    /// same on the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Transport(_))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Calls `getAllHeldIds()` on a collection pool and returns the token ids it recognises, as decimal strings.
    async fn get_all_held_ids(&self, pool: &Address) -> Result<Vec<String>, ChainError>;
}
