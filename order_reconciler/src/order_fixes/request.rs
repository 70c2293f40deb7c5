use reconcile_common::Address;
use serde::{Deserialize, Serialize};

use crate::db_types::OrderId;

/// A unit of work for the `order-fixes` queue.
///
/// Serialized as `{"by": "<variant>", "data": {...}}`. Only [`FixRequest::Id`] ever changes an order; the other
/// variants are expanded into `Id` requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "data", rename_all = "lowercase")]
pub enum FixRequest {
    Id { id: OrderId },
    /// `token` is a `<contract>:<tokenId>` key.
    Token { token: String },
    Maker { maker: Address },
    Contract { contract: Address },
}

impl FixRequest {
    pub fn by_id(id: OrderId) -> Self {
        FixRequest::Id { id }
    }
}
