// Stockpile
//
// Resource custody and storage migration for on-chain game assets. This crate
// re-exports the component crates and adds configuration loading, wiring of
// ledgers into a registry, and tracing setup.

pub mod config;
pub mod system;
pub mod test_logging;
pub mod tracing;

pub use stockpile_error as error;
pub use stockpile_ledger as ledger;
pub use stockpile_migration as migration;
pub use stockpile_registry as registry;
pub use stockpile_types as types;

pub use config::{CollectionRoute, LoggingConfig, RegistryConfig, StockpileConfig};
pub use system::Stockpile;

pub use stockpile_error::{ErrorCategory, ErrorCode, StockpileError};
pub use stockpile_ledger::{
    AssignmentPolicy, InMemoryResourceLedger, LedgerConfig, LedgerError, ResourceLedger,
    ResourceTransfer,
};
pub use stockpile_migration::{
    MigrationConfig, MigrationController, MigrationError, MigrationProgress, MigrationTarget,
};
pub use stockpile_registry::{MigratorGrant, RegistryError, StorageRegistry};
pub use stockpile_types::{Address, Amount, Collaborators, PrimaryRef, ResourceType, TokenId};
