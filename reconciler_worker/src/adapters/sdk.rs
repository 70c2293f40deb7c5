use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use order_reconciler::{
    checkers::{CheckContext, CheckFailure, OffChainValidator},
    db_types::Order,
    pipelines::{MintRefresher, MintRefreshError},
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{adapters::json_client, errors::HttpAdapterError};

/// The verdict of an off-chain check. `reason` is only present when the order is not valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckVerdict {
    pub valid: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl CheckVerdict {
    pub fn into_result(self) -> Result<(), CheckFailure> {
        match (self.valid, self.reason) {
            (true, _) => Ok(()),
            (false, Some(reason)) => Err(CheckFailure::from_reason(&reason)),
            (false, None) => Err(CheckFailure::Other("invalid order without a reason".into())),
        }
    }
}

/// Client for the protocol SDK service, which rebuilds protocol orders from their raw data to run the off-chain
/// checks, and re-derives collection mint configurations.
#[derive(Clone)]
pub struct SdkClient {
    base_url: String,
    client: Arc<Client>,
}

impl SdkClient {
    pub fn new(base_url: &str) -> Result<Self, HttpAdapterError> {
        let client = json_client()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, HttpAdapterError> {
        let url = self.url(path);
        trace!("🧾️ POST {url}");
        let response =
            self.client.post(url).json(body).send().await.map_err(|e| HttpAdapterError::Transport(e.to_string()))?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| HttpAdapterError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| HttpAdapterError::Transport(e.to_string()))?;
            Err(HttpAdapterError::QueryError { status, message })
        }
    }
}

#[async_trait]
impl OffChainValidator for SdkClient {
    async fn check(&self, order: &Order, context: &CheckContext) -> Result<(), CheckFailure> {
        let raw_data =
            order.raw_data().ok_or_else(|| CheckFailure::Other(format!("order {} has no raw data", order.id)))?;
        let body = json!({
            "id": order.id,
            "kind": order.kind,
            "side": order.side,
            "rawData": raw_data,
            "context": context,
        });
        let verdict: CheckVerdict =
            self.post("/orders/check", &body).await.map_err(|e| CheckFailure::Other(e.to_string()))?;
        trace!("🧾️ {} order {} check: {verdict:?}", order.kind, order.id);
        verdict.into_result()
    }
}

#[async_trait]
impl MintRefresher for SdkClient {
    async fn refresh_mints_for_collection(&self, collection: &str) -> Result<(), MintRefreshError> {
        let body = json!({ "collection": collection });
        let _: Value = self.post("/mints/refresh", &body).await.map_err(|e| MintRefreshError(e.to_string()))?;
        debug!("🧾️ Mints refreshed for collection {collection}");
        Ok(())
    }
}
