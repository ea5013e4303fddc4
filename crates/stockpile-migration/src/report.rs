// Migration call reports
//
// Batch operations apply each item independently; reports list what applied
// and which items failed so the caller can retry only the failed subset.

use stockpile_error::StockpileError;
use stockpile_types::{Address, Amount, ResourceType, TokenId};

use crate::error::MigrationError;

/// A single failed item and why it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure<T> {
    pub item: T,
    pub error: MigrationError,
}

impl<T> ItemFailure<T> {
    pub fn new(item: T, error: MigrationError) -> Self {
        Self { item, error }
    }

    /// Short reason string of the underlying error
    pub fn reason(&self) -> &'static str {
        self.error.reason()
    }
}

/// Outcome of one `migrate_batch` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Assignments counted as migrated in this call
    pub assignments_migrated: usize,
    /// Tokens that are complete after this call
    pub completed: Vec<TokenId>,
    /// Tokens that were already complete and left untouched
    pub skipped: Vec<TokenId>,
    /// Tokens interrupted by the per-call bound
    pub in_progress: Vec<TokenId>,
    pub failures: Vec<ItemFailure<TokenId>>,
}

/// A balance moved from the old ledger to the new one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedBalance {
    pub token_id: TokenId,
    pub resource: ResourceType,
    pub amount: Amount,
}

/// Outcome of migrating one owner's tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerMigrationReport {
    pub owner: Address,
    /// Tokens examined, after de-duplication
    pub tokens: Vec<TokenId>,
    pub moved: Vec<MovedBalance>,
    pub failures: Vec<ItemFailure<TokenId>>,
}

impl OwnerMigrationReport {
    pub(crate) fn new(owner: Address) -> Self {
        Self {
            owner,
            tokens: Vec::new(),
            moved: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Whether every token of the owner migrated
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of `migrate_all_owners`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllOwnersReport {
    pub reports: Vec<OwnerMigrationReport>,
    /// Owners that could not be processed at all
    pub failures: Vec<ItemFailure<Address>>,
}

impl AllOwnersReport {
    /// Owners that should be resubmitted: outright failures and owners with
    /// failed tokens
    pub fn owners_to_retry(&self) -> Vec<Address> {
        self.failures
            .iter()
            .map(|failure| failure.item)
            .chain(
                self.reports
                    .iter()
                    .filter(|report| !report.is_complete())
                    .map(|report| report.owner),
            )
            .collect()
    }
}
