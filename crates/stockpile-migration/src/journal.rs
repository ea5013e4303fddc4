// Compensation journal
//
// Records each write made while applying one migration item. If a later step
// of the item fails, the recorded writes are undone in reverse order so the
// item leaves no trace.

use stockpile_ledger::ResourceLedger;
use stockpile_types::{Address, Amount, PrimaryRef, ResourceType, TokenId};
use tracing::error;

use crate::error::{MigrationError, MigrationResult};

/// A write that can be undone
#[derive(Debug, Clone)]
pub(crate) enum Compensation {
    /// Assignment created on the new ledger
    Assigned { primary: PrimaryRef },
    /// Explicit capacity raised on the new ledger from `previous`
    CapacityRaised { token_id: TokenId, previous: Amount },
    /// Balance removed from the old ledger
    Debited {
        token_id: TokenId,
        owner: Address,
        resource: ResourceType,
        amount: Amount,
    },
    /// Balance added to the new ledger
    Credited {
        token_id: TokenId,
        owner: Address,
        resource: ResourceType,
        amount: Amount,
    },
}

pub(crate) struct CompensationJournal<'a> {
    actor: Address,
    old: &'a dyn ResourceLedger,
    new: &'a dyn ResourceLedger,
    entries: Vec<Compensation>,
}

impl<'a> CompensationJournal<'a> {
    pub(crate) fn new(actor: Address, old: &'a dyn ResourceLedger, new: &'a dyn ResourceLedger) -> Self {
        Self {
            actor,
            old,
            new,
            entries: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, entry: Compensation) {
        self.entries.push(entry);
    }

    /// Undo every recorded write, newest first, after `original` failed.
    ///
    /// Every entry is attempted. If any undo fails the item is left
    /// partially applied, and `original` is returned wrapped in
    /// `RollbackFailed` with the first undo error.
    pub(crate) fn abort(self, original: MigrationError) -> MigrationError {
        let mut failure = None;
        for entry in self.entries.iter().rev() {
            if let Err(err) = undo(self.actor, self.old, self.new, entry) {
                error!(?entry, error = %err, cause = %original, "Failed to undo migration write");
                failure.get_or_insert(err);
            }
        }

        match failure {
            None => original,
            Some(undo) => MigrationError::RollbackFailed {
                original: Box::new(original),
                undo: Box::new(undo),
            },
        }
    }
}

fn undo(
    actor: Address,
    old: &dyn ResourceLedger,
    new: &dyn ResourceLedger,
    entry: &Compensation,
) -> MigrationResult<()> {
    match entry {
        Compensation::Assigned { primary } => {
            new.unassign_storage_from_primary(&actor, primary)?;
        }
        Compensation::CapacityRaised { token_id, previous } => {
            new.set_storage_capacity(&actor, *token_id, *previous)?;
        }
        Compensation::Debited {
            token_id,
            owner,
            resource,
            amount,
        } => {
            old.add_resource(&actor, *token_id, owner, resource, *amount)?;
        }
        Compensation::Credited {
            token_id,
            owner,
            resource,
            amount,
        } => {
            new.dump_resource(&actor, *token_id, owner, resource, *amount)?;
        }
    }
    Ok(())
}
