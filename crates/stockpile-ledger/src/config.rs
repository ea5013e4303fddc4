// Ledger configuration
//
// This module defines the per-ledger settings: identity, the storage
// collection whose tokens carry balances, default capacity, and the
// assignment policy of the domain.

use serde::{Deserialize, Serialize};
use stockpile_types::{Address, Amount};

/// Default number of events kept in a ledger's in-memory journal
pub const DEFAULT_MAX_RETAINED_EVENTS: usize = 10_000;

/// How many primaries a single storage token may back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// A storage token backs at most one primary
    OneToOne,
    /// A storage token backs up to `max_primaries` primaries
    ManyToOne { max_primaries: usize },
}

impl AssignmentPolicy {
    /// Maximum number of primaries one storage token may back
    pub fn max_primaries(&self) -> usize {
        match self {
            AssignmentPolicy::OneToOne => 1,
            AssignmentPolicy::ManyToOne { max_primaries } => *max_primaries,
        }
    }
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        AssignmentPolicy::OneToOne
    }
}

/// Configuration for a single resource ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Domain name, e.g. `crew` or `land`
    pub domain: String,

    /// Address the ledger acts under
    pub address: Address,

    /// Collection whose tokens hold balances
    pub storage_collection: Address,

    /// Capacity of tokens without an explicit capacity
    #[serde(default)]
    pub default_capacity: Amount,

    #[serde(default)]
    pub policy: AssignmentPolicy,

    /// Events kept in the journal before the oldest are dropped
    #[serde(default = "default_max_retained_events")]
    pub max_retained_events: usize,
}

fn default_max_retained_events() -> usize {
    DEFAULT_MAX_RETAINED_EVENTS
}

impl LedgerConfig {
    pub fn new(domain: impl Into<String>, address: Address, storage_collection: Address) -> Self {
        Self {
            domain: domain.into(),
            address,
            storage_collection,
            default_capacity: Amount::ZERO,
            policy: AssignmentPolicy::default(),
            max_retained_events: DEFAULT_MAX_RETAINED_EVENTS,
        }
    }

    /// Set the capacity used for tokens without an explicit one
    pub fn with_default_capacity(mut self, capacity: Amount) -> Self {
        self.default_capacity = capacity;
        self
    }

    pub fn with_policy(mut self, policy: AssignmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_retained_events(mut self, max: usize) -> Self {
        self.max_retained_events = max;
        self
    }
}
