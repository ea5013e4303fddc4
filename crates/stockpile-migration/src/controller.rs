// Migration controller
//
// This module moves all ledger state of one collection from a retiring ledger
// to its replacement. Assignments are copied in bounded batches, balances are
// moved per owner, and finalization flips the registry pointer exactly once.
//
// State machine: Open -> Finalized. Every migrate call is rejected once
// Finalized. Each item (a storage token, or an owner's token) either applies
// fully or is rolled back through a compensation journal.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockpile_error::{ensure, lock_poisoned, StockpileError};
use stockpile_ledger::{LedgerError, ResourceLedger};
use stockpile_registry::{RegistryError, StorageRegistry};
use stockpile_types::{
    Address, Amount, AssetToken, Collaborators, PrimaryRef, ResourceType, TokenId,
};
use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::error::{MigrationError, MigrationResult};
use crate::journal::{Compensation, CompensationJournal};
use crate::progress::{MigrationProgress, TokenProgress};
use crate::record::{MigrationId, MigrationRecord};
use crate::report::{AllOwnersReport, BatchReport, ItemFailure, MovedBalance, OwnerMigrationReport};

/// Mutable controller state
#[derive(Debug, Default)]
struct MigrationState {
    completed: bool,
    /// Progress table keyed by storage token id
    progress: BTreeMap<TokenId, TokenProgress>,
    migrated_owners: BTreeSet<Address>,
}

/// The ledgers a migration moves between
#[derive(Debug, Clone)]
pub struct MigrationTarget {
    /// Collection whose registry entry is repointed at finalize
    pub collection: Address,
    pub old_ledger: Arc<dyn ResourceLedger>,
    pub new_ledger: Arc<dyn ResourceLedger>,
}

impl MigrationTarget {
    pub fn new(
        collection: Address,
        old_ledger: Arc<dyn ResourceLedger>,
        new_ledger: Arc<dyn ResourceLedger>,
    ) -> Self {
        Self {
            collection,
            old_ledger,
            new_ledger,
        }
    }
}

/// Moves one collection from an old ledger to a new one
///
/// The controller writes to both ledgers and swaps the registry entry under
/// its own `address`, which must be allowlisted with the central
/// authorization.
#[derive(Debug)]
pub struct MigrationController {
    id: MigrationId,
    address: Address,
    collection: Address,
    old: Arc<dyn ResourceLedger>,
    new: Arc<dyn ResourceLedger>,
    registry: Arc<StorageRegistry>,
    collaborators: Collaborators,
    config: MigrationConfig,
    state: RwLock<MigrationState>,
}

impl MigrationController {
    /// Create a controller in the `Open` state.
    ///
    /// Fails `InvalidMigration` if the ledgers are the same, belong to
    /// different domains, or the old ledger is not the collection's current
    /// ledger in the registry.
    pub fn new(
        address: Address,
        target: MigrationTarget,
        registry: Arc<StorageRegistry>,
        collaborators: Collaborators,
        config: MigrationConfig,
    ) -> MigrationResult<Self> {
        let MigrationTarget {
            collection,
            old_ledger: old,
            new_ledger: new,
        } = target;

        ensure!(
            old.address() != new.address(),
            MigrationError::InvalidMigration(format!(
                "old and new ledger are both {}",
                old.address()
            ))
        );
        ensure!(
            old.domain() == new.domain(),
            MigrationError::InvalidMigration(format!(
                "domain mismatch: {} vs {}",
                old.domain(),
                new.domain()
            ))
        );

        let current = match registry.get_ledger(&collection) {
            Ok(ledger) => ledger.address(),
            Err(RegistryError::NoActiveLedger(_)) => {
                return Err(MigrationError::InvalidMigration(format!(
                    "collection {} has no active ledger",
                    collection
                )))
            }
            Err(err) => return Err(err.into()),
        };
        ensure!(
            current == old.address(),
            MigrationError::InvalidMigration(format!(
                "collection {} is served by {}, not {}",
                collection,
                current,
                old.address()
            ))
        );

        let id = MigrationId::derive(&old.address(), &new.address(), &collection);
        info!(
            migration_id = %id,
            collection = %collection,
            old_ledger = %old.address(),
            new_ledger = %new.address(),
            domain = old.domain(),
            "Migration opened"
        );

        Ok(Self {
            id,
            address,
            collection,
            old,
            new,
            registry,
            collaborators,
            config,
            state: RwLock::new(MigrationState::default()),
        })
    }

    pub fn id(&self) -> &MigrationId {
        &self.id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn collection(&self) -> Address {
        self.collection
    }

    pub fn old_ledger(&self) -> &Arc<dyn ResourceLedger> {
        &self.old
    }

    pub fn new_ledger(&self) -> &Arc<dyn ResourceLedger> {
        &self.new
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    fn read_state(&self) -> MigrationResult<RwLockReadGuard<'_, MigrationState>> {
        self.state
            .read()
            .map_err(|_| lock_poisoned(format!("migration {}", self.id)).into())
    }

    fn write_state(&self) -> MigrationResult<RwLockWriteGuard<'_, MigrationState>> {
        self.state
            .write()
            .map_err(|_| lock_poisoned(format!("migration {}", self.id)).into())
    }

    fn reject(&self, caller: &Address, action: &'static str) -> MigrationError {
        warn!(migration_id = %self.id, caller = %caller, action, "Rejected unauthorized caller");
        MigrationError::Unauthorized {
            caller: *caller,
            action,
        }
    }

    fn require_operator(&self, caller: &Address, action: &'static str) -> MigrationResult<()> {
        if self.collaborators.is_authorized(caller) {
            Ok(())
        } else {
            Err(self.reject(caller, action))
        }
    }

    fn require_admin(&self, caller: &Address, action: &'static str) -> MigrationResult<()> {
        if self.collaborators.is_admin(caller) {
            Ok(())
        } else {
            Err(self.reject(caller, action))
        }
    }

    fn require_open(&self, state: &MigrationState) -> MigrationResult<()> {
        ensure!(!state.completed, MigrationError::MigrationAlreadyCompleted);
        Ok(())
    }

    fn require_batch_size(&self, requested: usize) -> MigrationResult<()> {
        if let Some(limit) = self.config.max_tokens_per_call {
            ensure!(
                requested <= limit,
                MigrationError::BatchTooLarge { requested, limit }
            );
        }
        Ok(())
    }

    //-------------------------------------------------------------------------
    // Assignment migration
    //-------------------------------------------------------------------------

    /// Copy the assignments of each storage token from the old ledger to the
    /// new one.
    ///
    /// Completed tokens are skipped. Tokens interrupted by
    /// `max_assignments_per_call` stay in progress and resume on the next
    /// call. A failing token is rolled back and reported without affecting
    /// the others.
    pub fn migrate_batch(
        &self,
        caller: &Address,
        token_ids: &[TokenId],
    ) -> MigrationResult<BatchReport> {
        self.require_operator(caller, "migrate assignments")?;
        self.require_batch_size(token_ids.len())?;

        let mut state = self.write_state()?;
        self.require_open(&state)?;

        let mut budget = self.config.max_assignments_per_call;
        let mut report = BatchReport::default();

        for &token_id in token_ids {
            let progress = state.progress.entry(token_id).or_default();
            if progress.completed {
                debug!(migration_id = %self.id, token_id = token_id.value(), "Token already migrated, skipping");
                report.skipped.push(token_id);
                continue;
            }

            match self.migrate_token_assignments(token_id, progress, &mut budget) {
                Ok(migrated) => {
                    report.assignments_migrated += migrated;
                    if progress.completed {
                        info!(
                            migration_id = %self.id,
                            token_id = token_id.value(),
                            total = progress.total,
                            "Token assignments migrated"
                        );
                        report.completed.push(token_id);
                    } else {
                        report.in_progress.push(token_id);
                    }
                }
                Err(err) => {
                    warn!(
                        migration_id = %self.id,
                        token_id = token_id.value(),
                        reason = err.reason(),
                        error = %err,
                        "Token migration failed"
                    );
                    report.failures.push(ItemFailure::new(token_id, err));
                }
            }
        }

        Ok(report)
    }

    /// Migrate the pending assignments of one token, all or nothing.
    ///
    /// Returns how many assignments were counted as migrated.
    fn migrate_token_assignments(
        &self,
        token_id: TokenId,
        progress: &mut TokenProgress,
        budget: &mut Option<usize>,
    ) -> MigrationResult<usize> {
        let old_primaries = self.old.get_primaries_for_storage(token_id)?;
        let pending: Vec<PrimaryRef> = old_primaries
            .iter()
            .filter(|primary| !progress.migrated.contains(primary))
            .copied()
            .collect();
        progress.refresh(&old_primaries);

        let mut journal = CompensationJournal::new(self.address, self.old.as_ref(), self.new.as_ref());
        let mut copied = Vec::with_capacity(pending.len());
        if let Err(err) = self.copy_assignments(token_id, &pending, budget, &mut journal, &mut copied) {
            return Err(journal.abort(err));
        }

        let migrated = copied.len();
        progress.migrated.extend(copied);
        progress.refresh(&old_primaries);
        Ok(migrated)
    }

    fn copy_assignments(
        &self,
        token_id: TokenId,
        pending: &[PrimaryRef],
        budget: &mut Option<usize>,
        journal: &mut CompensationJournal<'_>,
        copied: &mut Vec<PrimaryRef>,
    ) -> MigrationResult<()> {
        for primary in pending {
            match self.new.get_assigned_storage(primary)? {
                Some(found) if found == token_id => {
                    debug!(migration_id = %self.id, primary = %primary, "Assignment already present on new ledger");
                }
                Some(found) => {
                    return Err(MigrationError::AssignmentConflict {
                        primary: *primary,
                        expected: token_id,
                        found,
                    })
                }
                None => {
                    if *budget == Some(0) {
                        debug!(migration_id = %self.id, token_id = token_id.value(), "Assignment budget exhausted");
                        return Ok(());
                    }
                    self.new
                        .assign_storage_to_primary(&self.address, *primary, token_id)?;
                    journal.record(Compensation::Assigned { primary: *primary });
                    if let Some(remaining) = budget.as_mut() {
                        *remaining -= 1;
                    }
                }
            }
            copied.push(*primary);
        }
        Ok(())
    }

    //-------------------------------------------------------------------------
    // Balance migration
    //-------------------------------------------------------------------------

    /// Move every balance of an owner's storage tokens to the new ledger.
    ///
    /// With `token_ids` the listed tokens are used after checking that
    /// `owner` holds each one; otherwise the owner's tokens are enumerated
    /// from the storage collection. Callable by operators or the owner.
    pub fn migrate_owner_tokens(
        &self,
        caller: &Address,
        owner: &Address,
        token_ids: Option<&[TokenId]>,
    ) -> MigrationResult<OwnerMigrationReport> {
        if caller != owner {
            self.require_operator(caller, "migrate owner tokens")?;
        }
        if let Some(ids) = token_ids {
            self.require_batch_size(ids.len())?;
        }

        let mut state = self.write_state()?;
        self.require_open(&state)?;
        self.migrate_owner(&mut state, owner, token_ids)
    }

    /// Run `migrate_owner_tokens` for each owner. Operators only.
    ///
    /// Owners are independent: a failing owner is reported and the rest
    /// still apply.
    pub fn migrate_all_owners(
        &self,
        caller: &Address,
        owners: &[Address],
    ) -> MigrationResult<AllOwnersReport> {
        self.require_operator(caller, "migrate all owners")?;

        let mut state = self.write_state()?;
        self.require_open(&state)?;

        let mut report = AllOwnersReport::default();
        let mut seen = BTreeSet::new();
        for owner in owners {
            if !seen.insert(*owner) {
                continue;
            }
            match self.migrate_owner(&mut state, owner, None) {
                Ok(owner_report) => report.reports.push(owner_report),
                Err(err) => {
                    warn!(
                        migration_id = %self.id,
                        owner = %owner,
                        reason = err.reason(),
                        error = %err,
                        "Owner migration failed"
                    );
                    report.failures.push(ItemFailure::new(*owner, err));
                }
            }
        }
        Ok(report)
    }

    fn migrate_owner(
        &self,
        state: &mut MigrationState,
        owner: &Address,
        token_ids: Option<&[TokenId]>,
    ) -> MigrationResult<OwnerMigrationReport> {
        let storage_collection = self.old.storage_collection();
        let explicit = token_ids.is_some();
        let candidates = match token_ids {
            Some(ids) => ids.to_vec(),
            None => self
                .collaborators
                .tokens
                .get(&storage_collection)?
                .tokens_of_owner(owner),
        };

        let mut report = OwnerMigrationReport::new(*owner);
        let mut seen = BTreeSet::new();
        for token_id in candidates {
            if !seen.insert(token_id) {
                continue;
            }
            report.tokens.push(token_id);

            if explicit
                && !self
                    .collaborators
                    .tokens
                    .is_owner(&storage_collection, token_id, owner)?
            {
                warn!(migration_id = %self.id, owner = %owner, token_id = token_id.value(), "Owner does not hold token");
                report.failures.push(ItemFailure::new(
                    token_id,
                    MigrationError::NotTokenOwner {
                        owner: *owner,
                        token_id,
                    },
                ));
                continue;
            }

            match self.move_token_balances(owner, token_id) {
                Ok(moved) => report.moved.extend(moved),
                Err(err) => {
                    warn!(
                        migration_id = %self.id,
                        owner = %owner,
                        token_id = token_id.value(),
                        reason = err.reason(),
                        error = %err,
                        "Balance migration failed"
                    );
                    report.failures.push(ItemFailure::new(token_id, err));
                }
            }
        }

        if report.is_complete() && state.migrated_owners.insert(*owner) {
            info!(migration_id = %self.id, owner = %owner, tokens = report.tokens.len(), "Owner migrated");
        }
        Ok(report)
    }

    /// Move all balances of one token, all or nothing
    fn move_token_balances(
        &self,
        owner: &Address,
        token_id: TokenId,
    ) -> MigrationResult<Vec<MovedBalance>> {
        let balances = self.old.get_all_resource_balances(token_id)?;
        if balances.is_empty() {
            debug!(migration_id = %self.id, token_id = token_id.value(), "No balances to move");
            return Ok(Vec::new());
        }

        let mut journal = CompensationJournal::new(self.address, self.old.as_ref(), self.new.as_ref());
        match self.apply_balance_move(owner, token_id, &balances, &mut journal) {
            Ok(moved) => {
                info!(
                    migration_id = %self.id,
                    owner = %owner,
                    token_id = token_id.value(),
                    resources = moved.len(),
                    "Token balances moved"
                );
                Ok(moved)
            }
            Err(err) => Err(journal.abort(err)),
        }
    }

    fn apply_balance_move(
        &self,
        owner: &Address,
        token_id: TokenId,
        balances: &BTreeMap<ResourceType, Amount>,
        journal: &mut CompensationJournal<'_>,
    ) -> MigrationResult<Vec<MovedBalance>> {
        // Validate the whole move, at the capacity the new ledger will have,
        // before the first write
        let current_capacity = self.new.get_storage_capacity(token_id)?;
        let carried_capacity = self
            .old
            .get_explicit_capacity(token_id)?
            .filter(|old_capacity| *old_capacity > current_capacity);
        let capacity = carried_capacity.unwrap_or(current_capacity);

        let incoming = Amount::try_sum(balances.values().copied())?;
        let requested = self
            .new
            .get_total_resources_in_storage(token_id)?
            .try_add(incoming)?;
        ensure!(
            requested <= capacity,
            LedgerError::CapacityExceeded {
                token_id,
                capacity,
                requested,
            }
        );
        for (resource, amount) in balances {
            self.new.check_movement(resource, *amount)?;
        }

        if let Some(raised) = carried_capacity {
            self.new
                .set_storage_capacity(&self.address, token_id, raised)?;
            journal.record(Compensation::CapacityRaised {
                token_id,
                previous: current_capacity,
            });
        }

        let mut moved = Vec::with_capacity(balances.len());
        for (resource, amount) in balances {
            self.old
                .dump_resource(&self.address, token_id, owner, resource, *amount)?;
            journal.record(Compensation::Debited {
                token_id,
                owner: *owner,
                resource: resource.clone(),
                amount: *amount,
            });

            self.new
                .add_resource(&self.address, token_id, owner, resource, *amount)?;
            journal.record(Compensation::Credited {
                token_id,
                owner: *owner,
                resource: resource.clone(),
                amount: *amount,
            });

            moved.push(MovedBalance {
                token_id,
                resource: resource.clone(),
                amount: *amount,
            });
        }
        Ok(moved)
    }

    //-------------------------------------------------------------------------
    // Corrections and verification
    //-------------------------------------------------------------------------

    /// Clear a primary's assignment on the new ledger. Admin only.
    ///
    /// If the migration had counted the primary, its storage token returns to
    /// in progress so it can be migrated again.
    pub fn remove_assignment(
        &self,
        caller: &Address,
        primary: &PrimaryRef,
    ) -> MigrationResult<TokenId> {
        self.require_admin(caller, "remove assignments")?;

        let mut state = self.write_state()?;
        self.require_open(&state)?;

        let storage_token_id = self
            .new
            .unassign_storage_from_primary(&self.address, primary)?;
        if let Some(progress) = state.progress.get_mut(&storage_token_id) {
            if progress.migrated.remove(primary) {
                let old_primaries = self.old.get_primaries_for_storage(storage_token_id)?;
                progress.refresh(&old_primaries);
            }
        }

        info!(
            migration_id = %self.id,
            primary = %primary,
            token_id = storage_token_id.value(),
            "Assignment removed from new ledger"
        );
        Ok(storage_token_id)
    }

    /// Compare a token's assignments on both ledgers.
    ///
    /// Fails `Consistency` listing the primaries missing from the new ledger
    /// and those only the new ledger has.
    pub fn check_migration(&self, token_id: TokenId) -> MigrationResult<()> {
        let old: BTreeSet<_> = self
            .old
            .get_primaries_for_storage(token_id)?
            .into_iter()
            .collect();
        let new: BTreeSet<_> = self
            .new
            .get_primaries_for_storage(token_id)?
            .into_iter()
            .collect();

        let missing: Vec<_> = old.difference(&new).copied().collect();
        let unexpected: Vec<_> = new.difference(&old).copied().collect();
        ensure!(
            missing.is_empty() && unexpected.is_empty(),
            MigrationError::Consistency {
                token_id,
                missing,
                unexpected,
            }
        );
        Ok(())
    }

    /// Whether a token's assignments match on both ledgers. Never mutates.
    pub fn verify_migration(&self, token_id: TokenId) -> MigrationResult<bool> {
        match self.check_migration(token_id) {
            Ok(()) => Ok(true),
            Err(MigrationError::Consistency { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    //-------------------------------------------------------------------------
    // Finalization
    //-------------------------------------------------------------------------

    /// Repoint the collection to the new ledger and close the migration.
    /// Admin only, once.
    ///
    /// The registry swap happens first; if it fails the migration stays open.
    pub fn update_storage_management(&self, caller: &Address) -> MigrationResult<()> {
        self.require_admin(caller, "finalize the migration")?;

        let mut state = self.write_state()?;
        self.require_open(&state)?;

        self.registry.swap_storage_contract(
            &self.address,
            &self.collection,
            &self.old.address(),
            Arc::clone(&self.new),
        )?;
        state.completed = true;

        info!(
            migration_id = %self.id,
            collection = %self.collection,
            new_ledger = %self.new.address(),
            tokens = state.progress.len(),
            owners = state.migrated_owners.len(),
            "Migration finalized"
        );
        Ok(())
    }

    //-------------------------------------------------------------------------
    // Queries
    //-------------------------------------------------------------------------

    pub fn is_completed(&self) -> MigrationResult<bool> {
        Ok(self.read_state()?.completed)
    }

    /// Progress of one token. Tokens never batched report their old-ledger
    /// assignments as remaining.
    pub fn get_migration_progress(&self, token_id: TokenId) -> MigrationResult<MigrationProgress> {
        if let Some(progress) = self.read_state()?.progress.get(&token_id) {
            return Ok(progress.snapshot());
        }

        let total = self.old.get_primaries_for_storage(token_id)?.len();
        Ok(MigrationProgress {
            total,
            migrated: 0,
            remaining: total,
            completed: false,
        })
    }

    /// Tokens that have started but not finished migrating
    pub fn get_storage_tokens_in_progress(&self) -> MigrationResult<Vec<TokenId>> {
        Ok(self
            .read_state()?
            .progress
            .iter()
            .filter(|(_, progress)| !progress.completed)
            .map(|(token_id, _)| *token_id)
            .collect())
    }

    pub fn get_migrated_owners(&self) -> MigrationResult<Vec<Address>> {
        Ok(self.read_state()?.migrated_owners.iter().copied().collect())
    }

    /// Export the migration record
    pub fn record(&self) -> MigrationResult<MigrationRecord> {
        let state = self.read_state()?;
        Ok(MigrationRecord {
            migration_id: self.id.clone(),
            old_ledger: self.old.address(),
            new_ledger: self.new.address(),
            collection: self.collection,
            completed_globally: state.completed,
            per_token_progress: state
                .progress
                .iter()
                .map(|(token_id, progress)| (*token_id, progress.snapshot()))
                .collect(),
            migrated_owners: state.migrated_owners.iter().copied().collect(),
        })
    }
}
