// Migration identity and exportable record

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stockpile_types::{Address, TokenId};

use crate::progress::MigrationProgress;

/// Identifier of a migration: hex SHA-256 of `old || new || collection`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(String);

impl MigrationId {
    pub fn derive(old_ledger: &Address, new_ledger: &Address, collection: &Address) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(old_ledger.as_bytes());
        hasher.update(new_ledger.as_bytes());
        hasher.update(collection.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exported state of a migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub migration_id: MigrationId,
    pub old_ledger: Address,
    pub new_ledger: Address,
    pub collection: Address,
    pub completed_globally: bool,
    pub per_token_progress: BTreeMap<TokenId, MigrationProgress>,
    pub migrated_owners: Vec<Address>,
}
