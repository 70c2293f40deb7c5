//! Adapters for the collaborators the reconciler talks to. The JSON-RPC provider is reached through alloy, the
//! protocol SDK service and the search index over plain HTTP.
mod rpc;
mod sdk;
mod search;

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
pub use rpc::AlloyChainReader;
pub use sdk::SdkClient;
pub use search::HttpSearchIndex;

use crate::errors::HttpAdapterError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A JSON client shared by every adapter.
pub(crate) fn json_client() -> Result<Client, HttpAdapterError> {
    let mut headers = HeaderMap::with_capacity(1);
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| HttpAdapterError::Initialization(e.to_string()))
}
