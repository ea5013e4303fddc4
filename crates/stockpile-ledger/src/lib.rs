// Resource ledgers for the Stockpile system
//
// A ledger holds fungible resource balances on the storage tokens of one
// domain, bounds them by per-token capacity, and records which storage token
// backs each primary game asset.

pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod memory;

pub use config::{AssignmentPolicy, LedgerConfig, DEFAULT_MAX_RETAINED_EVENTS};
pub use error::{LedgerError, LedgerResult};
pub use event::{LedgerEvent, LedgerEventKind};
pub use ledger::{ResourceLedger, ResourceTransfer};
pub use memory::InMemoryResourceLedger;
