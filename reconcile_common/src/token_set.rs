use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::Address;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid token set id: {0}")]
pub struct TokenSetParseError(String);

/// Identifies the scope of tokens an order applies to.
///
/// Single-token scopes have the form `token:<contract>:<tokenId>`. Collection-wide bids use `contract:<contract>`.
/// Any other scope (ranges, lists, attribute sets) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct TokenSetId(String);

impl TokenSetId {
    pub fn single_token(contract: &Address, token_id: &str) -> Self {
        Self(format!("token:{contract}:{token_id}"))
    }

    pub fn contract(contract: &Address) -> Self {
        Self(format!("contract:{contract}"))
    }

    /// Builds the token set id for a `<contract>:<tokenId>` token key.
    pub fn from_token_key(token: &str) -> Result<Self, TokenSetParseError> {
        let (contract, token_id) = token.split_once(':').ok_or_else(|| TokenSetParseError(token.to_string()))?;
        let contract = Address::from_str(contract).map_err(|_| TokenSetParseError(token.to_string()))?;
        if token_id.is_empty() {
            return Err(TokenSetParseError(token.to_string()));
        }
        Ok(Self::single_token(&contract, token_id))
    }

    /// Returns the contract and token id if this is a single-token scope.
    pub fn as_single_token(&self) -> Option<(Address, &str)> {
        let mut parts = self.0.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("token"), Some(contract), Some(token_id)) if !token_id.is_empty() => {
                Address::from_str(contract).ok().map(|c| (c, token_id))
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TokenSetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for TokenSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
