// Stockpile Error Handling Framework
// Central location for error categories, codes, and the shared error trait
//
// Every crate in the workspace defines its own `thiserror` enum and implements
// `StockpileError` for it, so callers can log a stable reason string and make
// retry decisions without matching on concrete types.

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

// Re-export so downstream crates derive against the same version
pub use thiserror;

mod macros;

/// Broad classes of failure shared by all components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Input rejected before any mutation (bad name, zero amount, capacity)
    Validation,
    /// Caller is neither allowlisted nor the verified owner
    Authorization,
    /// Operation is not valid in the current state
    State,
    /// Two views of the same state disagree
    Consistency,
    /// No ledger is registered for the requested collection
    Routing,
    /// Infrastructure failure such as a poisoned lock
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Authorization => write!(f, "authorization"),
            ErrorCategory::State => write!(f, "state"),
            ErrorCategory::Consistency => write!(f, "consistency"),
            ErrorCategory::Routing => write!(f, "routing"),
            ErrorCategory::Internal => write!(f, "internal"),
        }
    }
}

/// Numeric error code.
///
/// Ranges: types 1xxx, ledger 2xxx, registry 3xxx, migration 4xxx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorCode(pub u32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Standard error message format for serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub reason: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorMessage {
    /// Attach structured details to the message
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Base trait for all errors in the Stockpile system.
pub trait StockpileError: StdError + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Numeric code, unique across the workspace
    fn code(&self) -> ErrorCode;

    /// Which class of failure this is
    fn category(&self) -> ErrorCategory;

    /// Short stable reason string, e.g. `"InsufficientBalance"`.
    fn reason(&self) -> &'static str;

    /// Whether resubmitting the same call later could succeed.
    ///
    /// Validation, authorization, state and consistency failures are
    /// deterministic for a given state and are never retryable as-is.
    fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Internal)
    }

    /// Convert into the serializable message form
    fn to_message(&self) -> ErrorMessage {
        ErrorMessage {
            code: self.code(),
            category: self.category(),
            reason: self.reason().to_string(),
            message: self.to_string(),
            details: None,
        }
    }
}

/// Common infrastructure errors shared by every component
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommonError {
    /// A lock guarding component state was poisoned by a panicking writer
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Internal invariant failure
    #[error("Internal error: {0}")]
    Internal(String),
}

pub const LOCK_POISONED: ErrorCode = ErrorCode(9001);
pub const INTERNAL: ErrorCode = ErrorCode(9002);

impl StockpileError for CommonError {
    fn code(&self) -> ErrorCode {
        match self {
            CommonError::LockPoisoned(_) => LOCK_POISONED,
            CommonError::Internal(_) => INTERNAL,
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Internal
    }

    fn reason(&self) -> &'static str {
        match self {
            CommonError::LockPoisoned(_) => "LockPoisoned",
            CommonError::Internal(_) => "Internal",
        }
    }
}

/// Create a lock-poisoned error naming the guarded component
pub fn lock_poisoned(component: impl Into<String>) -> CommonError {
    CommonError::LockPoisoned(component.into())
}
