// Storage registry
//
// This module provides the keyed store from collection address to its active
// resource ledger. Routed operations resolve the ledger on every call and
// forward under the registry's own address after checking the caller.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockpile_error::{ensure, lock_poisoned};
use stockpile_ledger::{ResourceLedger, ResourceTransfer};
use stockpile_types::{Address, Amount, Collaborators, PrimaryRef, ResourceType, TokenId};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, RegistryResult};

/// Permission for one controller to repoint a collection once, from
/// `old_ledger` to `new_ledger`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigratorGrant {
    pub migrator: Address,
    pub old_ledger: Address,
    pub new_ledger: Address,
}

impl MigratorGrant {
    pub fn new(migrator: Address, old_ledger: Address, new_ledger: Address) -> Self {
        Self {
            migrator,
            old_ledger,
            new_ledger,
        }
    }

    fn permits(&self, caller: &Address, old_ledger: &Address, new_ledger: &Address) -> bool {
        self.migrator == *caller && self.old_ledger == *old_ledger && self.new_ledger == *new_ledger
    }
}

/// Routes collections to their active ledgers
///
/// The registry must itself be allowlisted with the central authorization,
/// since ledgers see every forwarded mutation as coming from it.
///
/// Lock order is `entries` before `migrators`.
#[derive(Debug)]
pub struct StorageRegistry {
    /// Address the registry forwards under
    address: Address,
    collaborators: Collaborators,
    /// Collection -> active ledger
    entries: RwLock<BTreeMap<Address, Arc<dyn ResourceLedger>>>,
    /// Collection -> the single pending swap an admin has allowed
    migrators: RwLock<BTreeMap<Address, MigratorGrant>>,
}

impl StorageRegistry {
    pub fn new(address: Address, collaborators: Collaborators) -> Self {
        Self {
            address,
            collaborators,
            entries: RwLock::new(BTreeMap::new()),
            migrators: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn read_entries(
        &self,
    ) -> RegistryResult<RwLockReadGuard<'_, BTreeMap<Address, Arc<dyn ResourceLedger>>>> {
        self.entries
            .read()
            .map_err(|_| lock_poisoned("storage registry").into())
    }

    fn write_entries(
        &self,
    ) -> RegistryResult<RwLockWriteGuard<'_, BTreeMap<Address, Arc<dyn ResourceLedger>>>> {
        self.entries
            .write()
            .map_err(|_| lock_poisoned("storage registry").into())
    }

    fn read_migrators(&self) -> RegistryResult<RwLockReadGuard<'_, BTreeMap<Address, MigratorGrant>>> {
        self.migrators
            .read()
            .map_err(|_| lock_poisoned("storage registry migrators").into())
    }

    fn write_migrators(&self) -> RegistryResult<RwLockWriteGuard<'_, BTreeMap<Address, MigratorGrant>>> {
        self.migrators
            .write()
            .map_err(|_| lock_poisoned("storage registry migrators").into())
    }

    fn require_admin(&self, caller: &Address, action: &'static str) -> RegistryResult<()> {
        if !self.collaborators.is_admin(caller) {
            warn!(registry = %self.address, caller = %caller, action, "Rejected non-admin caller");
            return Err(RegistryError::Unauthorized {
                caller: *caller,
                action,
            });
        }
        Ok(())
    }

    fn require_authorized(&self, caller: &Address, action: &'static str) -> RegistryResult<()> {
        if !self.collaborators.is_authorized(caller) {
            warn!(registry = %self.address, caller = %caller, action, "Rejected unauthorized caller");
            return Err(RegistryError::Unauthorized {
                caller: *caller,
                action,
            });
        }
        Ok(())
    }

    fn owns(&self, caller: &Address, collection: &Address, token_id: TokenId) -> RegistryResult<bool> {
        Ok(self.collaborators.tokens.is_owner(collection, token_id, caller)?)
    }

    fn not_owner(&self, caller: &Address, collection: Address, token_id: TokenId) -> RegistryError {
        warn!(
            registry = %self.address,
            caller = %caller,
            collection = %collection,
            token_id = token_id.value(),
            "Rejected caller that does not own the token"
        );
        RegistryError::NotTokenOwner {
            caller: *caller,
            collection,
            token_id,
        }
    }

    /// Pass if the caller is allowlisted or owns the storage token
    fn require_storage_owner(
        &self,
        caller: &Address,
        ledger: &dyn ResourceLedger,
        token_id: TokenId,
    ) -> RegistryResult<()> {
        let collection = ledger.storage_collection();
        if self.collaborators.is_authorized(caller) || self.owns(caller, &collection, token_id)? {
            return Ok(());
        }
        Err(self.not_owner(caller, collection, token_id))
    }

    //-------------------------------------------------------------------------
    // Administration
    //-------------------------------------------------------------------------

    /// Map a collection to a ledger. Admin only.
    pub fn add_storage_contract(
        &self,
        caller: &Address,
        collection: Address,
        ledger: Arc<dyn ResourceLedger>,
    ) -> RegistryResult<()> {
        self.require_admin(caller, "add storage contracts")?;

        let mut entries = self.write_entries()?;
        if let Some(existing) = entries.get(&collection) {
            return Err(RegistryError::CollectionAlreadyMapped {
                collection,
                ledger: existing.address(),
            });
        }

        info!(
            registry = %self.address,
            collection = %collection,
            ledger = %ledger.address(),
            domain = ledger.domain(),
            "Storage contract added"
        );
        entries.insert(collection, ledger);
        Ok(())
    }

    /// Drop a collection's mapping, returning the ledger it had. Admin only.
    pub fn remove_storage_contract(
        &self,
        caller: &Address,
        collection: &Address,
    ) -> RegistryResult<Arc<dyn ResourceLedger>> {
        self.require_admin(caller, "remove storage contracts")?;

        let removed = self
            .write_entries()?
            .remove(collection)
            .ok_or(RegistryError::NoActiveLedger(*collection))?;
        info!(
            registry = %self.address,
            collection = %collection,
            ledger = %removed.address(),
            "Storage contract removed"
        );
        Ok(removed)
    }

    /// Allow `grant.migrator` to swap a collection from `grant.old_ledger`
    /// to `grant.new_ledger`. Admin only.
    ///
    /// The collection must currently map to `grant.old_ledger`. A collection
    /// has at most one grant; registering another replaces it.
    pub fn register_migrator(
        &self,
        caller: &Address,
        collection: Address,
        grant: MigratorGrant,
    ) -> RegistryResult<()> {
        self.require_admin(caller, "register migrators")?;

        let entries = self.read_entries()?;
        let current = entries
            .get(&collection)
            .map(|ledger| ledger.address())
            .ok_or(RegistryError::NoActiveLedger(collection))?;
        ensure!(
            current == grant.old_ledger,
            RegistryError::StaleLedger {
                collection,
                expected: grant.old_ledger,
                actual: current,
            }
        );

        let replaced = self.write_migrators()?.insert(collection, grant);
        info!(
            registry = %self.address,
            collection = %collection,
            migrator = %grant.migrator,
            old_ledger = %grant.old_ledger,
            new_ledger = %grant.new_ledger,
            replaced = replaced.is_some(),
            "Migrator registered"
        );
        Ok(())
    }

    /// Withdraw a collection's pending grant, returning it. Admin only.
    pub fn revoke_migrator(
        &self,
        caller: &Address,
        collection: &Address,
    ) -> RegistryResult<Option<MigratorGrant>> {
        self.require_admin(caller, "revoke migrators")?;

        let revoked = self.write_migrators()?.remove(collection);
        if let Some(grant) = &revoked {
            info!(
                registry = %self.address,
                collection = %collection,
                migrator = %grant.migrator,
                "Migrator revoked"
            );
        }
        Ok(revoked)
    }

    /// The pending grant of a collection, if any
    pub fn get_migrator(&self, collection: &Address) -> RegistryResult<Option<MigratorGrant>> {
        Ok(self.read_migrators()?.get(collection).copied())
    }

    /// Repoint a collection from `expected_old` to `new_ledger` in one step.
    /// Only the migrator registered for exactly this swap may call it, and
    /// the grant is consumed by a successful swap.
    ///
    /// Fails `NotMigrator` without a matching grant, and `StaleLedger` if
    /// the collection currently maps elsewhere.
    pub fn swap_storage_contract(
        &self,
        caller: &Address,
        collection: &Address,
        expected_old: &Address,
        new_ledger: Arc<dyn ResourceLedger>,
    ) -> RegistryResult<()> {
        let mut entries = self.write_entries()?;
        let mut migrators = self.write_migrators()?;

        let granted = migrators
            .get(collection)
            .is_some_and(|grant| grant.permits(caller, expected_old, &new_ledger.address()));
        if !granted {
            warn!(
                registry = %self.address,
                caller = %caller,
                collection = %collection,
                "Rejected swap without a matching migrator grant"
            );
            return Err(RegistryError::NotMigrator {
                caller: *caller,
                collection: *collection,
            });
        }

        let current = entries
            .get(collection)
            .map(|ledger| ledger.address())
            .ok_or(RegistryError::NoActiveLedger(*collection))?;
        ensure!(
            current == *expected_old,
            RegistryError::StaleLedger {
                collection: *collection,
                expected: *expected_old,
                actual: current,
            }
        );

        info!(
            registry = %self.address,
            collection = %collection,
            migrator = %caller,
            old_ledger = %current,
            new_ledger = %new_ledger.address(),
            "Storage contract swapped"
        );
        migrators.remove(collection);
        entries.insert(*collection, new_ledger);
        Ok(())
    }

    /// Resolve the active ledger of a collection
    pub fn get_ledger(&self, collection: &Address) -> RegistryResult<Arc<dyn ResourceLedger>> {
        self.read_entries()?
            .get(collection)
            .cloned()
            .ok_or(RegistryError::NoActiveLedger(*collection))
    }

    /// The full (collection, ledger address) table
    pub fn get_all_storage_contracts(&self) -> RegistryResult<Vec<(Address, Address)>> {
        Ok(self
            .read_entries()?
            .iter()
            .map(|(collection, ledger)| (*collection, ledger.address()))
            .collect())
    }

    //-------------------------------------------------------------------------
    // Routed mutations
    //-------------------------------------------------------------------------

    /// Credit resources. Allowlisted callers only.
    pub fn add_resource(
        &self,
        caller: &Address,
        collection: &Address,
        token_id: TokenId,
        owner: &Address,
        resource: &ResourceType,
        amount: Amount,
    ) -> RegistryResult<()> {
        self.require_authorized(caller, "add resources")?;
        let ledger = self.get_ledger(collection)?;
        ledger.add_resource(&self.address, token_id, owner, resource, amount)?;
        Ok(())
    }

    /// Burn resources. Allowlisted callers or the storage token owner.
    pub fn dump_resource(
        &self,
        caller: &Address,
        collection: &Address,
        token_id: TokenId,
        owner: &Address,
        resource: &ResourceType,
        amount: Amount,
    ) -> RegistryResult<()> {
        let ledger = self.get_ledger(collection)?;
        self.require_storage_owner(caller, ledger.as_ref(), token_id)?;
        ledger.dump_resource(&self.address, token_id, owner, resource, amount)?;
        Ok(())
    }

    /// Move resources from a token of `collection` to a token of
    /// `destination_collection`. Allowlisted callers or the source owner.
    pub fn transfer_resource(
        &self,
        caller: &Address,
        collection: &Address,
        transfer: &ResourceTransfer,
        destination_collection: &Address,
    ) -> RegistryResult<()> {
        let source = self.get_ledger(collection)?;
        let destination = self.get_ledger(destination_collection)?;
        self.require_storage_owner(caller, source.as_ref(), transfer.from_token_id)?;
        source.transfer_resource(&self.address, transfer, destination.as_ref())?;
        Ok(())
    }

    /// Back a primary with a storage token. Allowlisted callers or a caller
    /// owning both tokens.
    pub fn assign_storage_to_primary(
        &self,
        caller: &Address,
        collection: &Address,
        primary: PrimaryRef,
        storage_token_id: TokenId,
    ) -> RegistryResult<()> {
        let ledger = self.get_ledger(collection)?;
        if !self.collaborators.is_authorized(caller) {
            if !self.owns(caller, &primary.collection, primary.token_id)? {
                return Err(self.not_owner(caller, primary.collection, primary.token_id));
            }
            self.require_storage_owner(caller, ledger.as_ref(), storage_token_id)?;
        }
        ledger.assign_storage_to_primary(&self.address, primary, storage_token_id)?;
        Ok(())
    }

    /// Clear a primary's assignment. Allowlisted callers, the primary owner
    /// or the owner of the backing storage token.
    pub fn unassign_storage_from_primary(
        &self,
        caller: &Address,
        collection: &Address,
        primary: &PrimaryRef,
    ) -> RegistryResult<TokenId> {
        let ledger = self.get_ledger(collection)?;
        let allowed = self.collaborators.is_authorized(caller)
            || self.owns(caller, &primary.collection, primary.token_id)?
            || match ledger.get_assigned_storage(primary)? {
                Some(storage_token_id) => {
                    self.owns(caller, &ledger.storage_collection(), storage_token_id)?
                }
                None => false,
            };
        if !allowed {
            return Err(self.not_owner(caller, primary.collection, primary.token_id));
        }
        Ok(ledger.unassign_storage_from_primary(&self.address, primary)?)
    }

    //-------------------------------------------------------------------------
    // Routed reads
    //-------------------------------------------------------------------------

    pub fn get_resource_balance(
        &self,
        collection: &Address,
        token_id: TokenId,
        resource: &ResourceType,
    ) -> RegistryResult<Amount> {
        Ok(self.get_ledger(collection)?.get_resource_balance(token_id, resource)?)
    }

    pub fn get_all_resource_balances(
        &self,
        collection: &Address,
        token_id: TokenId,
    ) -> RegistryResult<BTreeMap<ResourceType, Amount>> {
        Ok(self.get_ledger(collection)?.get_all_resource_balances(token_id)?)
    }

    pub fn get_total_resources_in_storage(
        &self,
        collection: &Address,
        token_id: TokenId,
    ) -> RegistryResult<Amount> {
        Ok(self.get_ledger(collection)?.get_total_resources_in_storage(token_id)?)
    }

    pub fn get_storage_capacity(
        &self,
        collection: &Address,
        token_id: TokenId,
    ) -> RegistryResult<Amount> {
        Ok(self.get_ledger(collection)?.get_storage_capacity(token_id)?)
    }

    pub fn get_assigned_storage(
        &self,
        collection: &Address,
        primary: &PrimaryRef,
    ) -> RegistryResult<Option<TokenId>> {
        let assigned = self.get_ledger(collection)?.get_assigned_storage(primary)?;
        debug!(collection = %collection, primary = %primary, ?assigned, "Resolved assignment");
        Ok(assigned)
    }
}

#[cfg(test)]
mod tests {
    use stockpile_error::{ErrorCategory, StockpileError};
    use stockpile_ledger::{InMemoryResourceLedger, LedgerConfig, LedgerError};
    use stockpile_types::{AccessControlList, AssetTokenDirectory, InMemoryAssetToken, ResourceTypeSet};

    use super::*;

    const COLLECTION: u64 = 100;

    struct Fixture {
        registry: StorageRegistry,
        collaborators: Collaborators,
        acl: Arc<AccessControlList>,
        admin: Address,
        operator: Address,
        migrator: Address,
        alice: Address,
        bob: Address,
    }

    fn wood() -> ResourceType {
        ResourceType::new("wood").unwrap()
    }

    fn ledger(f: &Fixture, address: u64) -> Arc<dyn ResourceLedger> {
        Arc::new(InMemoryResourceLedger::new(
            LedgerConfig::new("crew", Address::from_low_u64(address), Address::from_low_u64(COLLECTION))
                .with_default_capacity(Amount::from_whole(1_000)),
            f.collaborators.clone(),
        ))
    }

    fn fixture() -> Fixture {
        let admin = Address::from_low_u64(1);
        let operator = Address::from_low_u64(2);
        let migrator = Address::from_low_u64(3);
        let alice = Address::from_low_u64(10);
        let bob = Address::from_low_u64(11);
        let registry_address = Address::from_low_u64(5);

        let acl = Arc::new(AccessControlList::with_admin(admin));
        for who in [operator, migrator, registry_address] {
            acl.grant_authorized(who);
        }

        let storage = Arc::new(InMemoryAssetToken::new(Address::from_low_u64(COLLECTION)));
        storage.mint(alice, 1).unwrap();
        storage.mint(bob, 2).unwrap();
        let crew = Arc::new(InMemoryAssetToken::new(Address::from_low_u64(200)));
        crew.mint(alice, 7).unwrap();

        let tokens = AssetTokenDirectory::new();
        tokens.register(storage).unwrap();
        tokens.register(crew).unwrap();

        let collaborators = Collaborators::new(
            acl.clone(),
            Arc::new(ResourceTypeSet::from_names(["wood"]).unwrap()),
            tokens,
        );
        Fixture {
            registry: StorageRegistry::new(registry_address, collaborators.clone()),
            collaborators,
            acl,
            admin,
            operator,
            migrator,
            alice,
            bob,
        }
    }

    #[test]
    fn test_admin_manages_mappings() {
        let f = fixture();
        let collection = Address::from_low_u64(COLLECTION);
        let first = ledger(&f, 50);

        let err = f
            .registry
            .add_storage_contract(&f.operator, collection, first.clone())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { .. }));

        f.registry
            .add_storage_contract(&f.admin, collection, first.clone())
            .unwrap();
        assert_eq!(
            f.registry.add_storage_contract(&f.admin, collection, ledger(&f, 51)),
            Err(RegistryError::CollectionAlreadyMapped {
                collection,
                ledger: first.address(),
            })
        );
        assert_eq!(
            f.registry.get_all_storage_contracts().unwrap(),
            vec![(collection, first.address())]
        );

        f.registry.remove_storage_contract(&f.admin, &collection).unwrap();
        assert!(matches!(
            f.registry.get_ledger(&collection),
            Err(RegistryError::NoActiveLedger(_))
        ));
        assert!(matches!(
            f.registry.add_resource(&f.operator, &collection, TokenId(1), &f.alice, &wood(), Amount::ONE),
            Err(RegistryError::NoActiveLedger(_))
        ));
    }

    #[test]
    fn test_swap_is_compare_and_swap() {
        let f = fixture();
        let collection = Address::from_low_u64(COLLECTION);
        let old = ledger(&f, 50);
        let new = ledger(&f, 51);
        let elsewhere = ledger(&f, 52);
        f.registry.add_storage_contract(&f.admin, collection, old.clone()).unwrap();
        f.registry
            .register_migrator(
                &f.admin,
                collection,
                MigratorGrant::new(f.migrator, old.address(), new.address()),
            )
            .unwrap();

        // The route moves behind the grant's back
        f.registry.remove_storage_contract(&f.admin, &collection).unwrap();
        f.registry
            .add_storage_contract(&f.admin, collection, elsewhere.clone())
            .unwrap();
        let err = f
            .registry
            .swap_storage_contract(&f.migrator, &collection, &old.address(), new.clone())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::StaleLedger {
                collection,
                expected: old.address(),
                actual: elsewhere.address(),
            }
        );
        assert_eq!(
            f.registry.get_ledger(&collection).unwrap().address(),
            elsewhere.address()
        );
        // A failed swap leaves the grant in place
        assert!(f.registry.get_migrator(&collection).unwrap().is_some());

        f.registry.remove_storage_contract(&f.admin, &collection).unwrap();
        f.registry.add_storage_contract(&f.admin, collection, old.clone()).unwrap();
        f.registry
            .swap_storage_contract(&f.migrator, &collection, &old.address(), new.clone())
            .unwrap();
        assert_eq!(f.registry.get_ledger(&collection).unwrap().address(), new.address());
        assert_eq!(f.registry.get_migrator(&collection).unwrap(), None);
    }

    #[test]
    fn test_only_the_registered_migrator_swaps() {
        let f = fixture();
        let collection = Address::from_low_u64(COLLECTION);
        let old = ledger(&f, 50);
        let new = ledger(&f, 51);
        f.registry.add_storage_contract(&f.admin, collection, old.clone()).unwrap();
        // An allowlisted ledger address, as used for cross-ledger credits
        f.acl.grant_authorized(new.address());

        let not_migrator = |caller: Address| RegistryError::NotMigrator { caller, collection };

        // Without a grant nobody swaps, admins included
        for caller in [f.admin, f.operator, f.migrator] {
            assert_eq!(
                f.registry.swap_storage_contract(&caller, &collection, &old.address(), new.clone()),
                Err(not_migrator(caller))
            );
        }

        assert!(matches!(
            f.registry.register_migrator(
                &f.operator,
                collection,
                MigratorGrant::new(f.operator, old.address(), new.address()),
            ),
            Err(RegistryError::Unauthorized { .. })
        ));
        assert!(matches!(
            f.registry.register_migrator(
                &f.admin,
                collection,
                MigratorGrant::new(f.migrator, new.address(), old.address()),
            ),
            Err(RegistryError::StaleLedger { .. })
        ));
        f.registry
            .register_migrator(
                &f.admin,
                collection,
                MigratorGrant::new(f.migrator, old.address(), new.address()),
            )
            .unwrap();

        for caller in [f.operator, new.address(), f.registry.address()] {
            let err = f
                .registry
                .swap_storage_contract(&caller, &collection, &old.address(), new.clone())
                .unwrap_err();
            assert_eq!(err, not_migrator(caller));
            assert_eq!(err.category(), ErrorCategory::Authorization);
        }
        // The grant names its target ledger
        assert_eq!(
            f.registry
                .swap_storage_contract(&f.migrator, &collection, &old.address(), ledger(&f, 52)),
            Err(not_migrator(f.migrator))
        );
        assert_eq!(f.registry.get_ledger(&collection).unwrap().address(), old.address());

        f.registry
            .swap_storage_contract(&f.migrator, &collection, &old.address(), new.clone())
            .unwrap();

        // The grant is spent; the collection cannot be pointed back
        assert_eq!(
            f.registry
                .swap_storage_contract(&f.migrator, &collection, &new.address(), old.clone()),
            Err(not_migrator(f.migrator))
        );
        assert_eq!(
            f.registry
                .swap_storage_contract(&f.migrator, &collection, &old.address(), new.clone()),
            Err(not_migrator(f.migrator))
        );
        assert_eq!(f.registry.get_ledger(&collection).unwrap().address(), new.address());
    }

    #[test]
    fn test_revoked_grant_no_longer_swaps() {
        let f = fixture();
        let collection = Address::from_low_u64(COLLECTION);
        let old = ledger(&f, 50);
        let new = ledger(&f, 51);
        f.registry.add_storage_contract(&f.admin, collection, old.clone()).unwrap();
        let grant = MigratorGrant::new(f.migrator, old.address(), new.address());
        f.registry.register_migrator(&f.admin, collection, grant).unwrap();

        assert!(matches!(
            f.registry.revoke_migrator(&f.operator, &collection),
            Err(RegistryError::Unauthorized { .. })
        ));
        assert_eq!(f.registry.revoke_migrator(&f.admin, &collection).unwrap(), Some(grant));
        assert_eq!(f.registry.revoke_migrator(&f.admin, &collection).unwrap(), None);
        assert!(matches!(
            f.registry.swap_storage_contract(&f.migrator, &collection, &old.address(), new),
            Err(RegistryError::NotMigrator { .. })
        ));
        assert_eq!(f.registry.get_ledger(&collection).unwrap().address(), old.address());
    }

    #[test]
    fn test_routed_mutations_authorize_callers() {
        let f = fixture();
        let collection = Address::from_low_u64(COLLECTION);
        f.registry.add_storage_contract(&f.admin, collection, ledger(&f, 50)).unwrap();

        // Owners cannot credit themselves
        assert!(matches!(
            f.registry.add_resource(&f.alice, &collection, TokenId(1), &f.alice, &wood(), Amount::ONE),
            Err(RegistryError::Unauthorized { .. })
        ));

        f.registry
            .add_resource(&f.operator, &collection, TokenId(1), &f.alice, &wood(), Amount::from_whole(10))
            .unwrap();

        let err = f
            .registry
            .dump_resource(&f.bob, &collection, TokenId(1), &f.alice, &wood(), Amount::ONE)
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotTokenOwner { .. }));
        assert_eq!(
            f.registry.get_resource_balance(&collection, TokenId(1), &wood()).unwrap(),
            Amount::from_whole(10)
        );

        f.registry
            .dump_resource(&f.alice, &collection, TokenId(1), &f.alice, &wood(), Amount::ONE)
            .unwrap();

        let transfer = ResourceTransfer::new(
            (TokenId(1), f.alice),
            (TokenId(2), f.bob),
            wood(),
            Amount::from_whole(4),
        );
        f.registry
            .transfer_resource(&f.alice, &collection, &transfer, &collection)
            .unwrap();
        assert_eq!(
            f.registry.get_resource_balance(&collection, TokenId(2), &wood()).unwrap(),
            Amount::from_whole(4)
        );
        assert_eq!(
            f.registry.get_total_resources_in_storage(&collection, TokenId(1)).unwrap(),
            Amount::from_whole(5)
        );

        // Ledger errors surface through the registry unchanged
        let err = f
            .registry
            .dump_resource(&f.alice, &collection, TokenId(1), &f.alice, &wood(), Amount::from_whole(6))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Ledger(LedgerError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_self_service_assignment() {
        let f = fixture();
        let collection = Address::from_low_u64(COLLECTION);
        f.registry.add_storage_contract(&f.admin, collection, ledger(&f, 50)).unwrap();
        let primary = PrimaryRef::new(Address::from_low_u64(200), 7);

        // Alice owns primary 7 but not storage token 2
        assert!(matches!(
            f.registry.assign_storage_to_primary(&f.alice, &collection, primary, TokenId(2)),
            Err(RegistryError::NotTokenOwner { .. })
        ));

        f.registry
            .assign_storage_to_primary(&f.alice, &collection, primary, TokenId(1))
            .unwrap();
        assert_eq!(
            f.registry.get_assigned_storage(&collection, &primary).unwrap(),
            Some(TokenId(1))
        );

        assert!(matches!(
            f.registry.unassign_storage_from_primary(&f.bob, &collection, &primary),
            Err(RegistryError::NotTokenOwner { .. })
        ));
        assert_eq!(
            f.registry
                .unassign_storage_from_primary(&f.alice, &collection, &primary)
                .unwrap(),
            TokenId(1)
        );
    }

    #[test]
    fn test_reads_follow_the_current_mapping() {
        let f = fixture();
        let collection = Address::from_low_u64(COLLECTION);
        let old = ledger(&f, 50);
        let new = ledger(&f, 51);
        f.registry.add_storage_contract(&f.admin, collection, old.clone()).unwrap();
        f.registry
            .add_resource(&f.operator, &collection, TokenId(1), &f.alice, &wood(), Amount::ONE)
            .unwrap();

        f.registry
            .register_migrator(
                &f.admin,
                collection,
                MigratorGrant::new(f.migrator, old.address(), new.address()),
            )
            .unwrap();
        f.registry
            .swap_storage_contract(&f.migrator, &collection, &old.address(), new.clone())
            .unwrap();
        assert_eq!(
            f.registry.get_resource_balance(&collection, TokenId(1), &wood()).unwrap(),
            Amount::ZERO
        );
        assert_eq!(
            f.registry.get_storage_capacity(&collection, TokenId(1)).unwrap(),
            Amount::from_whole(1_000)
        );
        assert!(f
            .registry
            .get_all_resource_balances(&collection, TokenId(1))
            .unwrap()
            .is_empty());
        assert_eq!(old.get_resource_balance(TokenId(1), &wood()).unwrap(), Amount::ONE);
    }
}
