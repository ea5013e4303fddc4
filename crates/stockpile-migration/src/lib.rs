// Storage migration for the Stockpile system
//
// Moves a collection's assignments and balances from a retiring ledger to its
// replacement through batched, resumable calls, then repoints the registry.

pub mod config;
pub mod controller;
pub mod error;
mod journal;
pub mod progress;
pub mod record;
pub mod report;

pub use config::MigrationConfig;
pub use controller::{MigrationController, MigrationTarget};
pub use error::{MigrationError, MigrationResult};
pub use progress::{MigrationProgress, TokenProgress};
pub use record::{MigrationId, MigrationRecord};
pub use report::{AllOwnersReport, BatchReport, ItemFailure, MovedBalance, OwnerMigrationReport};
