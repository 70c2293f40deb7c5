use std::sync::Arc;

use async_trait::async_trait;
use log::*;
use order_reconciler::pipelines::{IndexError, ListingIndex, TokenListingDocument};
use reqwest::Client;

use crate::{adapters::json_client, errors::HttpAdapterError};

/// Writes listing documents to the search index's bulk endpoint.
#[derive(Clone)]
pub struct HttpSearchIndex {
    base_url: String,
    client: Arc<Client>,
}

impl HttpSearchIndex {
    pub fn new(base_url: &str) -> Result<Self, HttpAdapterError> {
        let client = json_client()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn listings_url(&self) -> String {
        format!("{}/token-listings/_bulk", self.base_url)
    }
}

#[async_trait]
impl ListingIndex for HttpSearchIndex {
    async fn save(&self, documents: &[TokenListingDocument]) -> Result<(), IndexError> {
        if documents.is_empty() {
            return Ok(());
        }
        let response = self
            .client
            .post(self.listings_url())
            .json(documents)
            .send()
            .await
            .map_err(|e| IndexError(e.to_string()))?;
        if response.status().is_success() {
            debug!("📇️ Saved {} listing documents", documents.len());
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(IndexError(format!("The index returned status {status}. {message}")))
        }
    }
}
