// Ledger events
//
// Every successful mutation appends one event to the ledger's journal with a
// per-ledger sequence number, and the same event is logged through tracing.

use serde::{Deserialize, Serialize};
use stockpile_types::{Address, Amount, PrimaryRef, ResourceType, TokenId};

/// What happened in a single mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEventKind {
    ResourceAdded {
        token_id: TokenId,
        owner: Address,
        resource: ResourceType,
        amount: Amount,
    },
    ResourceRemoved {
        token_id: TokenId,
        owner: Address,
        resource: ResourceType,
        amount: Amount,
    },
    /// Debit side of a transfer; `to_ledger` differs from the emitting
    /// ledger when the credit landed elsewhere
    ResourceTransferred {
        from_token_id: TokenId,
        from_owner: Address,
        to_token_id: TokenId,
        to_owner: Address,
        to_ledger: Address,
        resource: ResourceType,
        amount: Amount,
    },
    StorageAssigned {
        primary: PrimaryRef,
        storage_token_id: TokenId,
    },
    StorageUnassigned {
        primary: PrimaryRef,
        storage_token_id: TokenId,
    },
    CapacityUpdated {
        token_id: TokenId,
        previous: Amount,
        capacity: Amount,
    },
}

/// A journaled ledger event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Monotonic per-ledger sequence number, starting at 1
    pub sequence: u64,
    /// Address of the emitting ledger
    pub ledger: Address,
    pub kind: LedgerEventKind,
}

impl LedgerEvent {
    /// Short name of the event kind, used as a log field
    pub fn name(&self) -> &'static str {
        match self.kind {
            LedgerEventKind::ResourceAdded { .. } => "ResourceAdded",
            LedgerEventKind::ResourceRemoved { .. } => "ResourceRemoved",
            LedgerEventKind::ResourceTransferred { .. } => "ResourceTransferred",
            LedgerEventKind::StorageAssigned { .. } => "StorageAssigned",
            LedgerEventKind::StorageUnassigned { .. } => "StorageUnassigned",
            LedgerEventKind::CapacityUpdated { .. } => "CapacityUpdated",
        }
    }
}
