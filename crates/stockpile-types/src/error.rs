// Error types for core value types

use stockpile_error::{ErrorCategory, ErrorCode, StockpileError};
use thiserror::Error;

use crate::address::Address;

pub const INVALID_ADDRESS: ErrorCode = ErrorCode(1001);
pub const INVALID_AMOUNT: ErrorCode = ErrorCode(1002);
pub const AMOUNT_OVERFLOW: ErrorCode = ErrorCode(1003);
pub const INVALID_RESOURCE_NAME: ErrorCode = ErrorCode(1004);
pub const UNKNOWN_COLLECTION: ErrorCode = ErrorCode(1005);
pub const COLLECTION_ALREADY_KNOWN: ErrorCode = ErrorCode(1006);
pub const TOKEN_ALREADY_MINTED: ErrorCode = ErrorCode(1007);
pub const TOKEN_NOT_FOUND: ErrorCode = ErrorCode(1008);

/// Errors raised while constructing or combining core values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount overflow")]
    AmountOverflow,

    #[error("Invalid resource name: {0}")]
    InvalidResourceName(String),

    /// No token contract is registered for the collection
    #[error("Unknown collection: {0}")]
    UnknownCollection(Address),

    #[error("Collection already registered: {0}")]
    CollectionAlreadyKnown(Address),

    #[error("Token {0} already minted")]
    TokenAlreadyMinted(u64),

    #[error("Token {0} does not exist")]
    TokenNotFound(u64),
}

impl StockpileError for TypesError {
    fn code(&self) -> ErrorCode {
        match self {
            TypesError::InvalidAddress(_) => INVALID_ADDRESS,
            TypesError::InvalidAmount(_) => INVALID_AMOUNT,
            TypesError::AmountOverflow => AMOUNT_OVERFLOW,
            TypesError::InvalidResourceName(_) => INVALID_RESOURCE_NAME,
            TypesError::UnknownCollection(_) => UNKNOWN_COLLECTION,
            TypesError::CollectionAlreadyKnown(_) => COLLECTION_ALREADY_KNOWN,
            TypesError::TokenAlreadyMinted(_) => TOKEN_ALREADY_MINTED,
            TypesError::TokenNotFound(_) => TOKEN_NOT_FOUND,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            TypesError::UnknownCollection(_) => ErrorCategory::Routing,
            TypesError::CollectionAlreadyKnown(_)
            | TypesError::TokenAlreadyMinted(_)
            | TypesError::TokenNotFound(_) => ErrorCategory::State,
            _ => ErrorCategory::Validation,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            TypesError::InvalidAddress(_) => "InvalidAddress",
            TypesError::InvalidAmount(_) => "InvalidAmount",
            TypesError::AmountOverflow => "AmountOverflow",
            TypesError::InvalidResourceName(_) => "InvalidResource",
            TypesError::UnknownCollection(_) => "UnknownCollection",
            TypesError::CollectionAlreadyKnown(_) => "CollectionAlreadyKnown",
            TypesError::TokenAlreadyMinted(_) => "TokenAlreadyMinted",
            TypesError::TokenNotFound(_) => "TokenNotFound",
        }
    }
}
