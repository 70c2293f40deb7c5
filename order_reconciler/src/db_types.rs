use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use reconcile_common::{Address, TokenSetId};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid value for {field}: {value}")]
pub struct ConversionError {
    pub field: &'static str,
    pub value: String,
}

impl ConversionError {
    fn new(field: &'static str, value: &str) -> Self {
        Self { field, value: value.to_string() }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The stable order hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------          Side         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Sell,
    Buy,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Sell, Side::Buy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Sell => "sell",
            Side::Buy => "buy",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sell" => Ok(Self::Sell),
            "buy" => Ok(Self::Buy),
            s => Err(ConversionError::new("side", s)),
        }
    }
}

impl TryFrom<String> for Side {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------       OrderKind       ---------------------------------------------------------
/// The marketplace protocol an order was created on.
///
/// Kinds the engine does not know about are kept as [`OrderKind::Unknown`] so that a single unsupported row never
/// poisons a query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderKind {
    LooksRareV2,
    X2Y2,
    ZeroExV4Erc721,
    ZeroExV4Erc1155,
    Seaport,
    SeaportV14,
    SeaportV15,
    Rarible,
    Nftx,
    Sudoswap,
    SudoswapV2,
    CollectionXyz,
    Unknown(String),
}

impl OrderKind {
    pub const AUCTION_KINDS: [OrderKind; 8] = [
        OrderKind::LooksRareV2,
        OrderKind::X2Y2,
        OrderKind::ZeroExV4Erc721,
        OrderKind::ZeroExV4Erc1155,
        OrderKind::Seaport,
        OrderKind::SeaportV14,
        OrderKind::SeaportV15,
        OrderKind::Rarible,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            OrderKind::LooksRareV2 => "looks-rare-v2",
            OrderKind::X2Y2 => "x2y2",
            OrderKind::ZeroExV4Erc721 => "zeroex-v4-erc721",
            OrderKind::ZeroExV4Erc1155 => "zeroex-v4-erc1155",
            OrderKind::Seaport => "seaport",
            OrderKind::SeaportV14 => "seaport-v1.4",
            OrderKind::SeaportV15 => "seaport-v1.5",
            OrderKind::Rarible => "rarible",
            OrderKind::Nftx => "nftx",
            OrderKind::Sudoswap => "sudoswap",
            OrderKind::SudoswapV2 => "sudoswap-v2",
            OrderKind::CollectionXyz => "collectionxyz",
            OrderKind::Unknown(s) => s.as_str(),
        }
    }

    /// Seaport-family orders can be partially filled, so their checks need the remaining quantity.
    pub fn is_seaport(&self) -> bool {
        matches!(self, OrderKind::Seaport | OrderKind::SeaportV14 | OrderKind::SeaportV15)
    }
}

impl From<String> for OrderKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "looks-rare-v2" => OrderKind::LooksRareV2,
            "x2y2" => OrderKind::X2Y2,
            "zeroex-v4-erc721" => OrderKind::ZeroExV4Erc721,
            "zeroex-v4-erc1155" => OrderKind::ZeroExV4Erc1155,
            "seaport" => OrderKind::Seaport,
            "seaport-v1.4" => OrderKind::SeaportV14,
            "seaport-v1.5" => OrderKind::SeaportV15,
            "rarible" => OrderKind::Rarible,
            "nftx" => OrderKind::Nftx,
            "sudoswap" => OrderKind::Sudoswap,
            "sudoswap-v2" => OrderKind::SudoswapV2,
            "collectionxyz" => OrderKind::CollectionXyz,
            _ => OrderKind::Unknown(value),
        }
    }
}

impl From<OrderKind> for String {
    fn from(value: OrderKind) -> Self {
        value.as_str().to_string()
    }
}

impl Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------   FillabilityStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FillabilityStatus {
    /// The maker holds enough balance for the order to be executed.
    Fillable,
    /// The maker (or pool) no longer holds what the order sells or pays with.
    NoBalance,
    Filled,
    Cancelled,
}

impl FillabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillabilityStatus::Fillable => "fillable",
            FillabilityStatus::NoBalance => "no-balance",
            FillabilityStatus::Filled => "filled",
            FillabilityStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FillabilityStatus::Filled | FillabilityStatus::Cancelled)
    }
}

impl Display for FillabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillabilityStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fillable" => Ok(Self::Fillable),
            "no-balance" => Ok(Self::NoBalance),
            "filled" => Ok(Self::Filled),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError::new("fillability_status", s)),
        }
    }
}

impl TryFrom<String> for FillabilityStatus {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------     ApprovalStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalStatus {
    Approved,
    NoApproval,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::NoApproval => "no-approval",
        }
    }
}

impl Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "no-approval" => Ok(Self::NoApproval),
            s => Err(ConversionError::new("approval_status", s)),
        }
    }
}

impl TryFrom<String> for ApprovalStatus {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------      OrderStatus      ---------------------------------------------------------
/// The `(fillability, approval)` pair that the reconciliation engine maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderStatus {
    pub fillability: FillabilityStatus,
    pub approval: ApprovalStatus,
}

impl OrderStatus {
    pub const ACTIVE: OrderStatus =
        OrderStatus { fillability: FillabilityStatus::Fillable, approval: ApprovalStatus::Approved };

    pub fn new(fillability: FillabilityStatus, approval: ApprovalStatus) -> Self {
        Self { fillability, approval }
    }

    /// An order is active (and so has an open expiration) only while it is both fillable and approved.
    pub fn is_active(&self) -> bool {
        *self == Self::ACTIVE
    }

    /// Orders in these states are re-checked by `{by: id}` fix requests. Filled and cancelled orders never are.
    pub fn is_recheckable(&self) -> bool {
        matches!(self.fillability, FillabilityStatus::Fillable | FillabilityStatus::NoBalance)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.fillability, self.approval)
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Order {
    pub id: OrderId,
    #[sqlx(try_from = "String")]
    pub side: Side,
    #[sqlx(try_from = "String")]
    pub kind: OrderKind,
    pub maker: Address,
    pub contract: Option<Address>,
    pub token_set_id: TokenSetId,
    pub quantity_filled: i64,
    pub quantity_remaining: i64,
    /// The protocol-specific order payload. Orders without it cannot be re-validated.
    pub raw_data: Option<Json<serde_json::Value>>,
    pub block_number: Option<i64>,
    pub log_index: Option<i64>,
    pub originated_at: Option<DateTime<Utc>>,
    /// Upper bound of the order's validity window. `None` means open-ended.
    pub valid_until: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub fillability_status: FillabilityStatus,
    #[sqlx(try_from = "String")]
    pub approval_status: ApprovalStatus,
    pub expiration: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        OrderStatus::new(self.fillability_status, self.approval_status)
    }

    pub fn raw_data(&self) -> Option<&serde_json::Value> {
        self.raw_data.as_ref().map(|j| &j.0)
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// An order as handed over by the ingestion path. The reconciliation engine never creates orders itself; this type
/// exists so that the store can be seeded.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub side: Side,
    pub kind: OrderKind,
    pub maker: Address,
    pub contract: Option<Address>,
    pub token_set_id: TokenSetId,
    pub quantity_filled: i64,
    pub quantity_remaining: i64,
    pub raw_data: Option<serde_json::Value>,
    pub block_number: Option<i64>,
    pub log_index: Option<i64>,
    pub originated_at: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub status: OrderStatus,
}

impl NewOrder {
    pub fn new(id: OrderId, kind: OrderKind, side: Side, maker: Address, token_set_id: TokenSetId) -> Self {
        let contract = token_set_id.as_single_token().map(|(c, _)| c);
        Self {
            id,
            side,
            kind,
            maker,
            contract,
            token_set_id,
            quantity_filled: 0,
            quantity_remaining: 1,
            raw_data: None,
            block_number: None,
            log_index: None,
            originated_at: None,
            valid_until: None,
            status: OrderStatus::ACTIVE,
        }
    }

    pub fn with_raw_data(mut self, raw_data: serde_json::Value) -> Self {
        self.raw_data = Some(raw_data);
        self
    }

    pub fn with_contract(mut self, contract: Address) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_quantity_remaining(mut self, quantity: i64) -> Self {
        self.quantity_remaining = quantity;
        self
    }

    pub fn with_valid_until(mut self, valid_until: DateTime<Utc>) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn with_origin(mut self, block_number: i64, log_index: i64, originated_at: DateTime<Utc>) -> Self {
        self.block_number = Some(block_number);
        self.log_index = Some(log_index);
        self.originated_at = Some(originated_at);
        self
    }
}

//--------------------------------------       NftBalance      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct NftBalance {
    pub contract: Address,
    pub token_id: String,
    pub owner: Address,
    pub amount: i64,
    pub acquired_at: Option<DateTime<Utc>>,
}

//--------------------------------------      ListingSource    ---------------------------------------------------------
/// The ownership, token and collection details joined onto a sell order when a listing document is built.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ListingSource {
    pub ownership_owner: Address,
    pub ownership_amount: i64,
    pub ownership_acquired_at: Option<DateTime<Utc>>,
    pub token_id: String,
    pub token_name: Option<String>,
    pub token_image: Option<String>,
    pub token_media: Option<String>,
    pub collection_id: Option<String>,
    pub collection_name: Option<String>,
    pub collection_image: Option<String>,
}

//--------------------------------------     TransferEvents    ---------------------------------------------------------
/// Identifies a single NFT transfer: batch transfers emit several transfers from the same log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEventKey {
    pub tx_hash: String,
    pub log_index: i64,
    pub batch_index: i64,
}

impl TransferEventKey {
    pub fn new<S: Into<String>>(tx_hash: S, log_index: i64, batch_index: i64) -> Self {
        Self { tx_hash: tx_hash.into(), log_index, batch_index }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TransferEventRow {
    pub contract: Address,
    pub token_id: String,
    pub from_address: Address,
    pub to_address: Address,
    pub amount: i64,
    pub tx_hash: String,
    pub log_index: i64,
    pub batch_index: i64,
    pub block_hash: String,
    pub timestamp: i64,
    pub token_name: Option<String>,
    pub token_image: Option<String>,
    pub token_media: Option<String>,
    pub collection_id: Option<String>,
    pub collection_name: Option<String>,
    pub collection_image: Option<String>,
}

//--------------------------------------  Token metadata     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TokenRecord {
    pub contract: Address,
    pub token_id: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub media: Option<String>,
    pub collection_id: Option<String>,
}

impl TokenRecord {
    pub fn new(contract: Address, token_id: &str) -> Self {
        Self { contract, token_id: token_id.to_string(), name: None, image: None, media: None, collection_id: None }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_collection(mut self, collection_id: &str) -> Self {
        self.collection_id = Some(collection_id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CollectionRecord {
    pub id: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// An NFT transfer as recorded by the ingestion path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransferEvent {
    pub contract: Address,
    pub token_id: String,
    pub from_address: Address,
    pub to_address: Address,
    pub amount: i64,
    pub key: TransferEventKey,
    pub block_hash: String,
    pub timestamp: i64,
}

//--------------------------------------   ActivityEventKind   ---------------------------------------------------------
/// The kinds of raw events that feed the activity pipeline. Each kind has its own pending backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityEventKind {
    NftTransferEvent,
}

impl ActivityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityEventKind::NftTransferEvent => "nftTransferEvent",
        }
    }
}

impl Display for ActivityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
