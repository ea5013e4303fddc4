// Per-token migration progress
//
// Progress is a table keyed by storage token id. Whether a token is still in
// progress is derived from its entry, never tracked separately.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use stockpile_types::PrimaryRef;

/// Progress entry of one storage token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenProgress {
    /// Primaries whose assignment has been copied to the new ledger
    pub migrated: BTreeSet<PrimaryRef>,
    /// Migrated plus still-pending assignments
    pub total: usize,
    pub completed: bool,
}

impl TokenProgress {
    pub fn migrated_count(&self) -> usize {
        self.migrated.len()
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.migrated.len())
    }

    /// Recompute the totals against the old ledger's current primaries
    pub(crate) fn refresh(&mut self, old_primaries: &[PrimaryRef]) {
        let pending = old_primaries
            .iter()
            .filter(|primary| !self.migrated.contains(primary))
            .count();
        self.total = self.migrated.len() + pending;
        self.completed = pending == 0;
    }

    pub fn snapshot(&self) -> MigrationProgress {
        MigrationProgress {
            total: self.total,
            migrated: self.migrated_count(),
            remaining: self.remaining(),
            completed: self.completed,
        }
    }
}

/// Summary answer to "how far along is this token"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationProgress {
    pub total: usize,
    pub migrated: usize,
    pub remaining: usize,
    pub completed: bool,
}
