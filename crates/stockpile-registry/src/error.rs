// Error types for the storage registry

use stockpile_error::{CommonError, ErrorCategory, ErrorCode, StockpileError};
use stockpile_ledger::LedgerError;
use stockpile_types::{Address, TokenId, TypesError};
use thiserror::Error;

pub const NO_ACTIVE_LEDGER: ErrorCode = ErrorCode(3001);
pub const COLLECTION_ALREADY_MAPPED: ErrorCode = ErrorCode(3002);
pub const STALE_LEDGER: ErrorCode = ErrorCode(3003);
pub const UNAUTHORIZED: ErrorCode = ErrorCode(3004);
pub const NOT_TOKEN_OWNER: ErrorCode = ErrorCode(3005);
pub const NOT_MIGRATOR: ErrorCode = ErrorCode(3006);

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while routing or administering collections
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The collection has no ledger, or its mapping was removed
    #[error("No active ledger for collection {0}")]
    NoActiveLedger(Address),

    #[error("Collection {collection} is already mapped to ledger {ledger}")]
    CollectionAlreadyMapped { collection: Address, ledger: Address },

    /// Compare-and-swap lost: the mapping is not what the caller expected
    #[error("Collection {collection} maps to {actual}, expected {expected}")]
    StaleLedger {
        collection: Address,
        expected: Address,
        actual: Address,
    },

    #[error("Caller {caller} is not authorized to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("Caller {caller} does not own token {token_id} in {collection}")]
    NotTokenOwner {
        caller: Address,
        collection: Address,
        token_id: TokenId,
    },

    /// The caller holds no matching migrator grant for the collection
    #[error("Caller {caller} is not the registered migrator of collection {collection}")]
    NotMigrator { caller: Address, collection: Address },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl StockpileError for RegistryError {
    fn code(&self) -> ErrorCode {
        match self {
            RegistryError::NoActiveLedger(_) => NO_ACTIVE_LEDGER,
            RegistryError::CollectionAlreadyMapped { .. } => COLLECTION_ALREADY_MAPPED,
            RegistryError::StaleLedger { .. } => STALE_LEDGER,
            RegistryError::Unauthorized { .. } => UNAUTHORIZED,
            RegistryError::NotTokenOwner { .. } => NOT_TOKEN_OWNER,
            RegistryError::NotMigrator { .. } => NOT_MIGRATOR,
            RegistryError::Ledger(err) => err.code(),
            RegistryError::Types(err) => err.code(),
            RegistryError::Common(err) => err.code(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            RegistryError::NoActiveLedger(_) => ErrorCategory::Routing,
            RegistryError::CollectionAlreadyMapped { .. } | RegistryError::StaleLedger { .. } => {
                ErrorCategory::State
            }
            RegistryError::Unauthorized { .. }
            | RegistryError::NotTokenOwner { .. }
            | RegistryError::NotMigrator { .. } => ErrorCategory::Authorization,
            RegistryError::Ledger(err) => err.category(),
            RegistryError::Types(err) => err.category(),
            RegistryError::Common(err) => err.category(),
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            RegistryError::NoActiveLedger(_) => "NoActiveLedger",
            RegistryError::CollectionAlreadyMapped { .. } => "CollectionAlreadyMapped",
            RegistryError::StaleLedger { .. } => "StaleLedger",
            RegistryError::Unauthorized { .. } => "Unauthorized",
            RegistryError::NotTokenOwner { .. } => "NotTokenOwner",
            RegistryError::NotMigrator { .. } => "NotMigrator",
            RegistryError::Ledger(err) => err.reason(),
            RegistryError::Types(err) => err.reason(),
            RegistryError::Common(err) => err.reason(),
        }
    }
}
