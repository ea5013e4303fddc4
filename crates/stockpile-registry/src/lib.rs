// Storage registry for the Stockpile system
//
// Answers which ledger backs a collection, routes operations to it, and
// authorizes callers before forwarding.

pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::{MigratorGrant, StorageRegistry};
