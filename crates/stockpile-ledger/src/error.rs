// Error types for the ledger system
//
// This module defines error types specifically for resource ledgers
// and implements the StockpileError trait for these types.

use stockpile_error::{CommonError, ErrorCategory, ErrorCode, StockpileError};
use stockpile_types::{Address, Amount, PrimaryRef, ResourceType, TokenId, TypesError};
use thiserror::Error;

/// Error codes for ledger-related errors
pub const ZERO_AMOUNT: ErrorCode = ErrorCode(2001);
pub const INVALID_RESOURCE: ErrorCode = ErrorCode(2002);
pub const CAPACITY_EXCEEDED: ErrorCode = ErrorCode(2003);
pub const CAPACITY_BELOW_BALANCE: ErrorCode = ErrorCode(2004);
pub const AMOUNT_OVERFLOW: ErrorCode = ErrorCode(2005);
pub const UNAUTHORIZED: ErrorCode = ErrorCode(2006);
pub const NOT_TOKEN_OWNER: ErrorCode = ErrorCode(2007);
pub const INSUFFICIENT_BALANCE: ErrorCode = ErrorCode(2008);
pub const ALREADY_ASSIGNED: ErrorCode = ErrorCode(2009);
pub const NOT_ASSIGNED: ErrorCode = ErrorCode(2010);
pub const STORAGE_FULL: ErrorCode = ErrorCode(2011);
pub const SELF_TRANSFER: ErrorCode = ErrorCode(2012);
pub const OWNER_MISMATCH: ErrorCode = ErrorCode(2013);

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Error type that encapsulates all ledger-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Add, dump and transfer require a positive amount
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Resource type is not registered with the resource type registry
    #[error("Invalid resource: {0}")]
    InvalidResource(ResourceType),

    /// Crediting would push the token's total above its capacity
    #[error("Capacity exceeded for token {token_id}: capacity {capacity}, would hold {requested}")]
    CapacityExceeded {
        token_id: TokenId,
        capacity: Amount,
        requested: Amount,
    },

    /// Capacity cannot be set below what the token already holds
    #[error("Capacity {capacity} for token {token_id} is below its current total {current}")]
    CapacityBelowBalance {
        token_id: TokenId,
        capacity: Amount,
        current: Amount,
    },

    #[error("Amount overflow on token {0}")]
    AmountOverflow(TokenId),

    /// Caller is not allowlisted for a privileged action
    #[error("Caller {caller} is not authorized to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    /// Caller is neither allowlisted nor the owner of the token
    #[error("Caller {caller} does not own token {token_id} in {collection}")]
    NotTokenOwner {
        caller: Address,
        collection: Address,
        token_id: TokenId,
    },

    #[error("Insufficient {resource} on token {token_id}: available {available}, requested {requested}")]
    InsufficientBalance {
        token_id: TokenId,
        resource: ResourceType,
        available: Amount,
        requested: Amount,
    },

    /// Primary already has a storage assignment; it must be unassigned first
    #[error("Primary {primary} is already assigned to storage {storage_token_id}")]
    AlreadyAssigned {
        primary: PrimaryRef,
        storage_token_id: TokenId,
    },

    #[error("Primary {0} has no storage assignment")]
    NotAssigned(PrimaryRef),

    /// Assignment policy forbids another primary on this storage token
    #[error("Storage {storage_token_id} already backs {backed} primaries (limit {limit})")]
    StorageFull {
        storage_token_id: TokenId,
        backed: usize,
        limit: usize,
    },

    /// Source and destination are the same token on the same ledger
    #[error("Cannot transfer token {0} to itself")]
    SelfTransfer(TokenId),

    /// The owner named by a debit does not hold the storage token
    #[error("Token {token_id} is not held by {claimed}")]
    OwnerMismatch {
        token_id: TokenId,
        claimed: Address,
        actual: Option<Address>,
    },

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl StockpileError for LedgerError {
    fn code(&self) -> ErrorCode {
        match self {
            LedgerError::ZeroAmount => ZERO_AMOUNT,
            LedgerError::InvalidResource(_) => INVALID_RESOURCE,
            LedgerError::CapacityExceeded { .. } => CAPACITY_EXCEEDED,
            LedgerError::CapacityBelowBalance { .. } => CAPACITY_BELOW_BALANCE,
            LedgerError::AmountOverflow(_) => AMOUNT_OVERFLOW,
            LedgerError::Unauthorized { .. } => UNAUTHORIZED,
            LedgerError::NotTokenOwner { .. } => NOT_TOKEN_OWNER,
            LedgerError::InsufficientBalance { .. } => INSUFFICIENT_BALANCE,
            LedgerError::AlreadyAssigned { .. } => ALREADY_ASSIGNED,
            LedgerError::NotAssigned(_) => NOT_ASSIGNED,
            LedgerError::StorageFull { .. } => STORAGE_FULL,
            LedgerError::SelfTransfer(_) => SELF_TRANSFER,
            LedgerError::OwnerMismatch { .. } => OWNER_MISMATCH,
            LedgerError::Types(err) => err.code(),
            LedgerError::Common(err) => err.code(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::ZeroAmount
            | LedgerError::InvalidResource(_)
            | LedgerError::CapacityExceeded { .. }
            | LedgerError::CapacityBelowBalance { .. }
            | LedgerError::AmountOverflow(_)
            | LedgerError::SelfTransfer(_)
            | LedgerError::OwnerMismatch { .. } => ErrorCategory::Validation,
            LedgerError::Unauthorized { .. } | LedgerError::NotTokenOwner { .. } => {
                ErrorCategory::Authorization
            }
            LedgerError::InsufficientBalance { .. }
            | LedgerError::AlreadyAssigned { .. }
            | LedgerError::NotAssigned(_)
            | LedgerError::StorageFull { .. } => ErrorCategory::State,
            LedgerError::Types(err) => err.category(),
            LedgerError::Common(err) => err.category(),
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            LedgerError::ZeroAmount => "ZeroAmount",
            LedgerError::InvalidResource(_) => "InvalidResource",
            LedgerError::CapacityExceeded { .. } => "CapacityExceeded",
            LedgerError::CapacityBelowBalance { .. } => "CapacityBelowBalance",
            LedgerError::AmountOverflow(_) => "AmountOverflow",
            LedgerError::Unauthorized { .. } => "Unauthorized",
            LedgerError::NotTokenOwner { .. } => "NotTokenOwner",
            LedgerError::InsufficientBalance { .. } => "InsufficientBalance",
            LedgerError::AlreadyAssigned { .. } => "AlreadyAssigned",
            LedgerError::NotAssigned(_) => "NotAssigned",
            LedgerError::StorageFull { .. } => "StorageFull",
            LedgerError::SelfTransfer(_) => "SelfTransfer",
            LedgerError::OwnerMismatch { .. } => "OwnerMismatch",
            LedgerError::Types(err) => err.reason(),
            LedgerError::Common(err) => err.reason(),
        }
    }
}
