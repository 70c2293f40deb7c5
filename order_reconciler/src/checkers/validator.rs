use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Order, OrderKind};

/// The reasons a protocol's off-chain check can reject an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckFailure {
    #[error("cancelled")]
    Cancelled,
    #[error("filled")]
    Filled,
    #[error("no-balance")]
    NoBalance,
    #[error("no-approval")]
    NoApproval,
    #[error("no-balance-no-approval")]
    NoBalanceNoApproval,
    #[error("{0}")]
    Other(String),
}

impl CheckFailure {
    /// Parses the reason string a protocol SDK reports.
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "cancelled" => CheckFailure::Cancelled,
            "filled" => CheckFailure::Filled,
            "no-balance" => CheckFailure::NoBalance,
            "no-approval" => CheckFailure::NoApproval,
            "no-balance-no-approval" => CheckFailure::NoBalanceNoApproval,
            other => CheckFailure::Other(other.to_string()),
        }
    }
}

/// Flags and protocol-specific extras passed along with every off-chain check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckContext {
    pub on_chain_approval_recheck: bool,
    pub check_filled_or_cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originated_at: Option<DateTime<Utc>>,
}

impl CheckContext {
    /// A full re-check: approvals are read from chain again and the fill/cancel state is verified.
    pub fn recheck() -> Self {
        Self {
            on_chain_approval_recheck: true,
            check_filled_or_cancelled: true,
            quantity_remaining: None,
            originated_at: None,
        }
    }

    /// A full re-check with the extras the order's protocol needs. Seaport-family orders carry the remaining
    /// quantity, X2Y2 orders carry their origination time.
    pub fn recheck_for(order: &Order) -> Self {
        let mut context = Self::recheck();
        if order.kind.is_seaport() {
            context.quantity_remaining = Some(order.quantity_remaining);
        }
        if order.kind == OrderKind::X2Y2 {
            context.originated_at = order.originated_at;
        }
        context
    }
}

/// The protocol SDK boundary. Implementations rebuild the protocol order from the raw data and run its off-chain
/// check.
#[async_trait]
pub trait OffChainValidator: Send + Sync {
    async fn check(&self, order: &Order, context: &CheckContext) -> Result<(), CheckFailure>;
}
