use alloy::{
    contract::Error as ContractError,
    primitives::{Address as EvmAddress, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    sol,
    transports::{http::reqwest::Url, RpcError},
};
use async_trait::async_trait;
use log::*;
use order_reconciler::chain::{ChainError, ChainReader};
use reconcile_common::{Address, Secret};

use crate::errors::HttpAdapterError;

sol! {
    #[sol(rpc)]
    interface ICollectionPool {
        function getAllHeldIds() external view returns (uint256[] memory);
    }
}

/// Read-only contract calls through an alloy provider.
#[derive(Clone)]
pub struct AlloyChainReader {
    provider: DynProvider,
}

impl AlloyChainReader {
    pub fn new(url: &Secret<String>) -> Result<Self, HttpAdapterError> {
        let url = url
            .reveal()
            .parse::<Url>()
            .map_err(|e| HttpAdapterError::Initialization(format!("Invalid RPC URL. {e}")))?;
        Ok(Self::with_provider(ProviderBuilder::new().connect_http(url)))
    }

    pub fn with_provider<P: Provider + 'static>(provider: P) -> Self {
        Self { provider: provider.erased() }
    }
}

fn chain_error(e: ContractError) -> ChainError {
    match e {
        ContractError::TransportError(RpcError::ErrorResp(payload)) => {
            ChainError::Rpc { code: payload.code, message: payload.message.to_string() }
        },
        ContractError::TransportError(RpcError::Transport(kind)) => ChainError::Transport(kind.to_string()),
        other => ChainError::Decode(other.to_string()),
    }
}

#[async_trait]
impl ChainReader for AlloyChainReader {
    async fn get_all_held_ids(&self, pool: &Address) -> Result<Vec<String>, ChainError> {
        let address = pool.as_str().parse::<EvmAddress>().map_err(|e| ChainError::Decode(e.to_string()))?;
        trace!("⛓️ Calling getAllHeldIds() on {pool}");
        let contract = ICollectionPool::new(address, self.provider.clone());
        let ids = contract.getAllHeldIds().call().await.map_err(chain_error)?;
        debug!("⛓️ Pool {pool} holds {} tokens", ids.len());
        Ok(ids.iter().map(U256::to_string).collect())
    }
}
