// Error types for storage migration
//
// This module defines the errors raised by the migration controller and
// implements the StockpileError trait for them.

use stockpile_error::{CommonError, ErrorCategory, ErrorCode, StockpileError};
use stockpile_ledger::LedgerError;
use stockpile_registry::RegistryError;
use stockpile_types::{Address, PrimaryRef, TokenId, TypesError};
use thiserror::Error;

/// Error codes for migration-related errors
pub const MIGRATION_ALREADY_COMPLETED: ErrorCode = ErrorCode(4001);
pub const INVALID_MIGRATION: ErrorCode = ErrorCode(4002);
pub const ASSIGNMENT_CONFLICT: ErrorCode = ErrorCode(4003);
pub const BATCH_TOO_LARGE: ErrorCode = ErrorCode(4004);
pub const NOT_TOKEN_OWNER: ErrorCode = ErrorCode(4005);
pub const CONSISTENCY: ErrorCode = ErrorCode(4006);
pub const UNAUTHORIZED: ErrorCode = ErrorCode(4007);
pub const ROLLBACK_FAILED: ErrorCode = ErrorCode(4008);

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// The migration was finalized; no further migrate calls are accepted
    #[error("Migration already completed")]
    MigrationAlreadyCompleted,

    #[error("Invalid migration: {0}")]
    InvalidMigration(String),

    /// The new ledger assigns the primary to a different storage token
    #[error("Primary {primary} is assigned to {found} on the new ledger, expected {expected}")]
    AssignmentConflict {
        primary: PrimaryRef,
        expected: TokenId,
        found: TokenId,
    },

    #[error("Batch of {requested} items exceeds the limit of {limit}")]
    BatchTooLarge { requested: usize, limit: usize },

    #[error("Owner {owner} does not own storage token {token_id}")]
    NotTokenOwner { owner: Address, token_id: TokenId },

    /// Old and new ledgers disagree about a token's assignments
    #[error(
        "Assignments of token {token_id} diverge: {} missing, {} unexpected",
        .missing.len(),
        .unexpected.len()
    )]
    Consistency {
        token_id: TokenId,
        missing: Vec<PrimaryRef>,
        unexpected: Vec<PrimaryRef>,
    },

    #[error("Caller {caller} is not authorized to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    /// An item failed and undoing its applied writes failed too, so the
    /// item is left partially applied
    #[error("Rollback after \"{original}\" failed: {undo}")]
    RollbackFailed {
        original: Box<MigrationError>,
        undo: Box<MigrationError>,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl StockpileError for MigrationError {
    fn code(&self) -> ErrorCode {
        match self {
            MigrationError::MigrationAlreadyCompleted => MIGRATION_ALREADY_COMPLETED,
            MigrationError::InvalidMigration(_) => INVALID_MIGRATION,
            MigrationError::AssignmentConflict { .. } => ASSIGNMENT_CONFLICT,
            MigrationError::BatchTooLarge { .. } => BATCH_TOO_LARGE,
            MigrationError::NotTokenOwner { .. } => NOT_TOKEN_OWNER,
            MigrationError::Consistency { .. } => CONSISTENCY,
            MigrationError::Unauthorized { .. } => UNAUTHORIZED,
            MigrationError::RollbackFailed { .. } => ROLLBACK_FAILED,
            MigrationError::Ledger(err) => err.code(),
            MigrationError::Registry(err) => err.code(),
            MigrationError::Types(err) => err.code(),
            MigrationError::Common(err) => err.code(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            MigrationError::MigrationAlreadyCompleted | MigrationError::AssignmentConflict { .. } => {
                ErrorCategory::State
            }
            MigrationError::InvalidMigration(_) | MigrationError::BatchTooLarge { .. } => {
                ErrorCategory::Validation
            }
            MigrationError::NotTokenOwner { .. } | MigrationError::Unauthorized { .. } => {
                ErrorCategory::Authorization
            }
            MigrationError::Consistency { .. } | MigrationError::RollbackFailed { .. } => {
                ErrorCategory::Consistency
            }
            MigrationError::Ledger(err) => err.category(),
            MigrationError::Registry(err) => err.category(),
            MigrationError::Types(err) => err.category(),
            MigrationError::Common(err) => err.category(),
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            MigrationError::MigrationAlreadyCompleted => "MigrationAlreadyCompleted",
            MigrationError::InvalidMigration(_) => "InvalidMigration",
            MigrationError::AssignmentConflict { .. } => "AssignmentConflict",
            MigrationError::BatchTooLarge { .. } => "BatchTooLarge",
            MigrationError::NotTokenOwner { .. } => "NotTokenOwner",
            MigrationError::Consistency { .. } => "ConsistencyError",
            MigrationError::Unauthorized { .. } => "Unauthorized",
            MigrationError::RollbackFailed { .. } => "RollbackFailed",
            MigrationError::Ledger(err) => err.reason(),
            MigrationError::Registry(err) => err.reason(),
            MigrationError::Types(err) => err.reason(),
            MigrationError::Common(err) => err.reason(),
        }
    }
}
