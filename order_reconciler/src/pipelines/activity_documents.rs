use std::collections::HashSet;

use blake2::{digest::consts::U32, Blake2b, Digest};
use reconcile_common::Address;
use serde::{Deserialize, Serialize};

use crate::db_types::TransferEventRow;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

type Blake2b256 = Blake2b<U32>;

/// The stable document id of an activity: the hex BLAKE2b-256 digest of `txHash:logIndex:batchIndex`.
pub fn activity_id(tx_hash: &str, log_index: i64, batch_index: i64) -> String {
    let digest = Blake2b256::digest(format!("{tx_hash}:{log_index}:{batch_index}").as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Transfer,
    Mint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityToken {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub media: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCollection {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub tx_hash: String,
    pub log_index: i64,
    pub batch_index: i64,
    pub block_hash: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub timestamp: i64,
    pub contract: Address,
    pub from_address: Address,
    pub to_address: Address,
    pub amount: i64,
    pub token: ActivityToken,
    pub collection: Option<ActivityCollection>,
    pub event: ActivityEvent,
}

/// Builds activity documents from NFT transfer rows.
#[derive(Debug, Clone)]
pub struct ActivitySynthesizer {
    mint_addresses: HashSet<Address>,
}

impl Default for ActivitySynthesizer {
    fn default() -> Self {
        let zero = Address::try_from(ZERO_ADDRESS.to_string()).into_iter();
        Self { mint_addresses: zero.collect() }
    }
}

impl ActivitySynthesizer {
    /// Transfers out of any of `mint_addresses` are recorded as mints.
    pub fn new<I: IntoIterator<Item = Address>>(mint_addresses: I) -> Self {
        Self { mint_addresses: mint_addresses.into_iter().collect() }
    }

    /// Adds to the current set of mint addresses.
    pub fn with_mint_addresses<I: IntoIterator<Item = Address>>(mut self, mint_addresses: I) -> Self {
        self.mint_addresses.extend(mint_addresses);
        self
    }

    pub fn activity_type(&self, from: &Address) -> ActivityType {
        if self.mint_addresses.contains(from) {
            ActivityType::Mint
        } else {
            ActivityType::Transfer
        }
    }

    pub fn build(&self, row: &TransferEventRow) -> ActivityDocument {
        let collection = row.collection_id.as_ref().map(|id| ActivityCollection {
            id: id.clone(),
            name: row.collection_name.clone(),
            image: row.collection_image.clone(),
        });
        ActivityDocument {
            id: activity_id(&row.tx_hash, row.log_index, row.batch_index),
            activity_type: self.activity_type(&row.from_address),
            timestamp: row.timestamp,
            contract: row.contract.clone(),
            from_address: row.from_address.clone(),
            to_address: row.to_address.clone(),
            amount: row.amount,
            token: ActivityToken {
                id: row.token_id.clone(),
                name: row.token_name.clone(),
                image: row.token_image.clone(),
                media: row.token_media.clone(),
            },
            collection,
            event: ActivityEvent {
                tx_hash: row.tx_hash.clone(),
                log_index: row.log_index,
                batch_index: row.batch_index,
                block_hash: row.block_hash.clone(),
                timestamp: row.timestamp,
            },
        }
    }

    pub fn build_all(&self, rows: &[TransferEventRow]) -> Vec<ActivityDocument> {
        rows.iter().map(|r| self.build(r)).collect()
    }
}
