use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use reconcile_common::Address;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    db_types::{ListingSource, OrderId},
    jobs::{BatchReport, JobHandler, JobQueue, MessageBroker, QueueConfig},
    pipelines::{ActivityCollection, ActivityToken, IndexError, PipelineError},
    traits::ListingStore,
};

pub const PROCESS_TOKEN_LISTING_EVENT_QUEUE: &str = "process-token-listing-event-queue";

pub fn process_token_listing_event_config() -> QueueConfig {
    QueueConfig::new(PROCESS_TOKEN_LISTING_EVENT_QUEUE).with_max_retries(10).with_concurrency(15).persistent().lazy()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenListingEventKind {
    NewSellOrder,
}

/// The order snapshot carried by a listing event, as emitted by the order book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingOrderInfo {
    pub id: OrderId,
    pub side: String,
    pub contract: Address,
    pub currency: String,
    pub price: String,
    pub value: String,
    pub currency_price: Option<String>,
    pub currency_value: Option<String>,
    pub normalized_value: Option<String>,
    pub currency_normalized_value: Option<String>,
    pub source_id_int: Option<i64>,
    pub quantity_filled: i64,
    pub quantity_remaining: i64,
    pub fee_bps: Option<i64>,
    pub fillability_status: String,
    pub approval_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenListingEvent {
    pub kind: TokenListingEventKind,
    pub data: ListingOrderInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingOwnership {
    pub address: Address,
    pub amount: i64,
    pub acquired_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPricing {
    pub currency: String,
    pub fee_bps: Option<i64>,
    pub price: String,
    pub currency_price: Option<String>,
    pub value: String,
    pub currency_value: Option<String>,
    pub normalized_value: Option<String>,
    pub currency_normalized_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListingDocument {
    pub id: String,
    pub timestamp: i64,
    pub contract: Address,
    pub ownership: ListingOwnership,
    pub token: ActivityToken,
    pub collection: Option<ActivityCollection>,
    pub order_id: OrderId,
    pub order_source_id_int: Option<i64>,
    pub order_quantity: i64,
    pub order_pricing: ListingPricing,
}

impl TokenListingDocument {
    /// The document for `order` listed by the owner described in `source`. The id is
    /// `owner:contract:tokenId:orderId`, so each owner's listing of a token is a separate document.
    pub fn build(order: &ListingOrderInfo, source: &ListingSource) -> Self {
        let id = format!("{}:{}:{}:{}", source.ownership_owner, order.contract, source.token_id, order.id);
        let collection = source.collection_id.as_ref().map(|id| ActivityCollection {
            id: id.clone(),
            name: source.collection_name.clone(),
            image: source.collection_image.clone(),
        });
        Self {
            id,
            timestamp: order.created_at.timestamp(),
            contract: order.contract.clone(),
            ownership: ListingOwnership {
                address: source.ownership_owner.clone(),
                amount: source.ownership_amount,
                acquired_at: source.ownership_acquired_at,
            },
            token: ActivityToken {
                id: source.token_id.clone(),
                name: source.token_name.clone(),
                image: source.token_image.clone(),
                media: source.token_media.clone(),
            },
            collection,
            order_id: order.id.clone(),
            order_source_id_int: order.source_id_int,
            order_quantity: order.quantity_filled + order.quantity_remaining,
            order_pricing: ListingPricing {
                currency: order.currency.clone(),
                fee_bps: order.fee_bps,
                price: order.price.clone(),
                currency_price: order.currency_price.clone(),
                value: order.value.clone(),
                currency_value: order.currency_value.clone(),
                normalized_value: order.normalized_value.clone(),
                currency_normalized_value: order.currency_normalized_value.clone(),
            },
        }
    }
}

/// The listing search index.
#[async_trait]
pub trait ListingIndex: Send + Sync {
    async fn save(&self, documents: &[TokenListingDocument]) -> Result<(), IndexError>;
}

pub struct ProcessTokenListingEventJob<S, B> {
    config: QueueConfig,
    store: S,
    index: Arc<dyn ListingIndex>,
    queue: JobQueue<TokenListingEvent, B>,
}

impl<S: ListingStore, B: MessageBroker> ProcessTokenListingEventJob<S, B> {
    pub fn new(store: S, index: Arc<dyn ListingIndex>, broker: B) -> Self {
        let config = process_token_listing_event_config();
        let queue = JobQueue::new(config.clone(), broker);
        Self { config, store, index, queue }
    }

    pub async fn add_to_queue(&self, events: &[TokenListingEvent]) -> Result<BatchReport, PipelineError> {
        Ok(self.queue.send_batch(events).await.into_result()?)
    }

    async fn build_document(&self, event: &TokenListingEvent) -> Result<Option<TokenListingDocument>, PipelineError> {
        let source = self.store.fetch_listing_source(&event.data.id).await?;
        Ok(source.map(|s| TokenListingDocument::build(&event.data, &s)))
    }
}

impl<S: ListingStore, B: MessageBroker> JobHandler for ProcessTokenListingEventJob<S, B> {
    type Error = PipelineError;
    type Payload = TokenListingEvent;

    fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn process(&self, payload: TokenListingEvent) -> Result<(), PipelineError> {
        let queue = PROCESS_TOKEN_LISTING_EVENT_QUEUE;
        info!("📇️ [{queue}] Start. kind={:?} order={}", payload.kind, payload.data.id);
        let document = self.build_document(&payload).await.map_err(|e| {
            let data = serde_json::to_string(&payload.data).unwrap_or_default();
            error!("📇️ [{queue}] Error generating token listing. kind={:?}, error={e}, data={data}", payload.kind);
            e
        })?;
        match document {
            Some(document) => {
                debug!("📇️ [{queue}] Saving listing {}", document.id);
                self.index.save(&[document]).await?;
            },
            None => {
                let id = &payload.data.id;
                debug!("📇️ [{queue}] No ownership or token record for order {id}. Nothing to index.")
            },
        }
        Ok(())
    }
}
