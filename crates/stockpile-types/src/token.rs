// Token identifiers
//
// Storage tokens carry balances and capacity; primary tokens are the game
// assets (crew, structures) that a storage token backs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Identifier of a non-fungible token within one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u64);

impl TokenId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TokenId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A primary game asset: a token in a specific collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimaryRef {
    /// Collection the primary token belongs to
    pub collection: Address,
    /// Token id within that collection
    pub token_id: TokenId,
}

impl PrimaryRef {
    pub fn new(collection: Address, token_id: impl Into<TokenId>) -> Self {
        Self {
            collection,
            token_id: token_id.into(),
        }
    }
}

impl fmt::Display for PrimaryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.collection, self.token_id)
    }
}
