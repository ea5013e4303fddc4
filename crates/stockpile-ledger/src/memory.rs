// In-memory resource ledger
//
// This module provides `InMemoryResourceLedger`, the `ResourceLedger`
// implementation used by the registry, the migration controller and tests.
// All state sits behind one `RwLock`; each mutation validates and applies
// under a single write guard, so a failed call leaves no partial write.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockpile_error::lock_poisoned;
use stockpile_types::{Address, Amount, Collaborators, PrimaryRef, ResourceType, TokenId};
use tracing::{debug, info, warn};

use crate::config::{AssignmentPolicy, LedgerConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::event::{LedgerEvent, LedgerEventKind};
use crate::ledger::{ResourceLedger, ResourceTransfer};

/// Mutable ledger state guarded by the ledger lock
#[derive(Debug, Default)]
struct LedgerState {
    /// Non-zero balances per storage token
    balances: HashMap<TokenId, BTreeMap<ResourceType, Amount>>,
    /// Explicit capacities; tokens without one use the configured default
    capacities: HashMap<TokenId, Amount>,
    /// Primary -> backing storage token
    assignments: HashMap<PrimaryRef, TokenId>,
    /// Storage token -> primaries it backs, kept in step with `assignments`
    backing: HashMap<TokenId, BTreeSet<PrimaryRef>>,
    events: VecDeque<LedgerEvent>,
    sequence: u64,
}

impl LedgerState {
    fn balance(&self, token_id: TokenId, resource: &ResourceType) -> Amount {
        self.balances
            .get(&token_id)
            .and_then(|balances| balances.get(resource))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn total(&self, token_id: TokenId) -> LedgerResult<Amount> {
        match self.balances.get(&token_id) {
            Some(balances) => Amount::try_sum(balances.values().copied())
                .map_err(|_| LedgerError::AmountOverflow(token_id)),
            None => Ok(Amount::ZERO),
        }
    }

    fn capacity(&self, token_id: TokenId, default_capacity: Amount) -> Amount {
        self.capacities
            .get(&token_id)
            .copied()
            .unwrap_or(default_capacity)
    }

    /// Credit without a capacity check
    fn credit(
        &mut self,
        token_id: TokenId,
        resource: &ResourceType,
        amount: Amount,
    ) -> LedgerResult<()> {
        let balance = self
            .balances
            .entry(token_id)
            .or_default()
            .entry(resource.clone())
            .or_insert(Amount::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow(token_id))?;
        Ok(())
    }

    fn debit(
        &mut self,
        token_id: TokenId,
        resource: &ResourceType,
        amount: Amount,
    ) -> LedgerResult<()> {
        let available = self.balance(token_id, resource);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                token_id,
                resource: resource.clone(),
                available,
                requested: amount,
            })?;

        if let Some(balances) = self.balances.get_mut(&token_id) {
            if remaining.is_zero() {
                balances.remove(resource);
            } else {
                balances.insert(resource.clone(), remaining);
            }
            if balances.is_empty() {
                self.balances.remove(&token_id);
            }
        }
        Ok(())
    }

    fn assign(&mut self, primary: PrimaryRef, storage_token_id: TokenId) {
        self.assignments.insert(primary, storage_token_id);
        self.backing.entry(storage_token_id).or_default().insert(primary);
    }

    fn unassign(&mut self, primary: &PrimaryRef) -> Option<TokenId> {
        let storage_token_id = self.assignments.remove(primary)?;
        if let Some(primaries) = self.backing.get_mut(&storage_token_id) {
            primaries.remove(primary);
            if primaries.is_empty() {
                self.backing.remove(&storage_token_id);
            }
        }
        Some(storage_token_id)
    }
}

/// Resource ledger holding its state in process memory
#[derive(Debug)]
pub struct InMemoryResourceLedger {
    config: LedgerConfig,
    collaborators: Collaborators,
    state: RwLock<LedgerState>,
}

impl InMemoryResourceLedger {
    pub fn new(config: LedgerConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
            state: RwLock::new(LedgerState::default()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn read_state(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| lock_poisoned(format!("ledger {}", self.config.address)).into())
    }

    fn write_state(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.state
            .write()
            .map_err(|_| lock_poisoned(format!("ledger {}", self.config.address)).into())
    }

    fn require_authorized(&self, caller: &Address, action: &'static str) -> LedgerResult<()> {
        if self.collaborators.is_authorized(caller) {
            return Ok(());
        }
        warn!(ledger = %self.config.address, caller = %caller, action, "Rejected unauthorized caller");
        Err(LedgerError::Unauthorized {
            caller: *caller,
            action,
        })
    }

    /// Pass if the caller is authorized or owns `token_id` in `collection`
    fn require_owner_or_authorized(
        &self,
        caller: &Address,
        collection: &Address,
        token_id: TokenId,
    ) -> LedgerResult<()> {
        if self.collaborators.is_authorized(caller)
            || self.collaborators.tokens.is_owner(collection, token_id, caller)?
        {
            return Ok(());
        }
        warn!(
            ledger = %self.config.address,
            caller = %caller,
            collection = %collection,
            token_id = token_id.value(),
            "Rejected caller that does not own the token"
        );
        Err(LedgerError::NotTokenOwner {
            caller: *caller,
            collection: *collection,
            token_id,
        })
    }

    fn validate_movement(&self, resource: &ResourceType, amount: Amount) -> LedgerResult<()> {
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        if !self.collaborators.resource_types.is_valid_resource_type(resource) {
            return Err(LedgerError::InvalidResource(resource.clone()));
        }
        Ok(())
    }

    /// Pass if `owner` currently holds the storage token
    fn require_holder(&self, token_id: TokenId, owner: &Address) -> LedgerResult<()> {
        let actual = self
            .collaborators
            .tokens
            .owner_of(&self.config.storage_collection, token_id)?;
        if actual.as_ref() == Some(owner) {
            return Ok(());
        }
        warn!(
            ledger = %self.config.address,
            token_id = token_id.value(),
            claimed = %owner,
            ?actual,
            "Rejected movement naming the wrong owner"
        );
        Err(LedgerError::OwnerMismatch {
            token_id,
            claimed: *owner,
            actual,
        })
    }

    fn ensure_headroom(
        &self,
        state: &LedgerState,
        token_id: TokenId,
        amount: Amount,
    ) -> LedgerResult<()> {
        let capacity = state.capacity(token_id, self.config.default_capacity);
        let requested = state
            .total(token_id)?
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow(token_id))?;
        if requested > capacity {
            return Err(LedgerError::CapacityExceeded {
                token_id,
                capacity,
                requested,
            });
        }
        Ok(())
    }

    /// Append an event to the journal and log it
    fn record(&self, state: &mut LedgerState, kind: LedgerEventKind) {
        state.sequence += 1;
        let event = LedgerEvent {
            sequence: state.sequence,
            ledger: self.config.address,
            kind,
        };
        info!(
            ledger = %self.config.address,
            domain = %self.config.domain,
            sequence = event.sequence,
            event = event.name(),
            details = ?event.kind,
            "Ledger state changed"
        );

        state.events.push_back(event);
        while state.events.len() > self.config.max_retained_events {
            state.events.pop_front();
        }
    }

    fn transfer_within(&self, transfer: &ResourceTransfer) -> LedgerResult<()> {
        if transfer.from_token_id == transfer.to_token_id {
            return Err(LedgerError::SelfTransfer(transfer.from_token_id));
        }

        let mut state = self.write_state()?;
        self.ensure_headroom(&state, transfer.to_token_id, transfer.amount)?;
        state.debit(transfer.from_token_id, &transfer.resource, transfer.amount)?;
        state.credit(transfer.to_token_id, &transfer.resource, transfer.amount)?;
        self.record(&mut state, transferred(transfer, self.config.address));
        Ok(())
    }

    fn transfer_across(
        &self,
        transfer: &ResourceTransfer,
        destination: &dyn ResourceLedger,
    ) -> LedgerResult<()> {
        destination.check_credit(transfer.to_token_id, &transfer.resource, transfer.amount)?;

        {
            let mut state = self.write_state()?;
            state.debit(transfer.from_token_id, &transfer.resource, transfer.amount)?;
        }

        let credited = destination.add_resource(
            &self.config.address,
            transfer.to_token_id,
            &transfer.to_owner,
            &transfer.resource,
            transfer.amount,
        );

        let mut state = self.write_state()?;
        match credited {
            Ok(()) => {
                self.record(&mut state, transferred(transfer, destination.address()));
                Ok(())
            }
            Err(err) => {
                // Reverse the debit; the amount was held a moment ago
                state.credit(transfer.from_token_id, &transfer.resource, transfer.amount)?;
                warn!(
                    ledger = %self.config.address,
                    destination = %destination.address(),
                    token_id = transfer.from_token_id.value(),
                    resource = %transfer.resource,
                    amount = %transfer.amount,
                    error = %err,
                    "Cross-ledger credit failed, debit reversed"
                );
                Err(err)
            }
        }
    }
}

fn transferred(transfer: &ResourceTransfer, to_ledger: Address) -> LedgerEventKind {
    LedgerEventKind::ResourceTransferred {
        from_token_id: transfer.from_token_id,
        from_owner: transfer.from_owner,
        to_token_id: transfer.to_token_id,
        to_owner: transfer.to_owner,
        to_ledger,
        resource: transfer.resource.clone(),
        amount: transfer.amount,
    }
}

impl ResourceLedger for InMemoryResourceLedger {
    fn address(&self) -> Address {
        self.config.address
    }

    fn domain(&self) -> &str {
        &self.config.domain
    }

    fn storage_collection(&self) -> Address {
        self.config.storage_collection
    }

    fn policy(&self) -> AssignmentPolicy {
        self.config.policy
    }

    fn add_resource(
        &self,
        caller: &Address,
        token_id: TokenId,
        owner: &Address,
        resource: &ResourceType,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.require_authorized(caller, "add resources")?;
        self.validate_movement(resource, amount)?;

        let mut state = self.write_state()?;
        self.ensure_headroom(&state, token_id, amount)?;
        state.credit(token_id, resource, amount)?;
        self.record(
            &mut state,
            LedgerEventKind::ResourceAdded {
                token_id,
                owner: *owner,
                resource: resource.clone(),
                amount,
            },
        );
        Ok(())
    }

    fn dump_resource(
        &self,
        caller: &Address,
        token_id: TokenId,
        owner: &Address,
        resource: &ResourceType,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.require_owner_or_authorized(caller, &self.config.storage_collection, token_id)?;
        self.require_holder(token_id, owner)?;
        self.validate_movement(resource, amount)?;

        let mut state = self.write_state()?;
        state.debit(token_id, resource, amount)?;
        self.record(
            &mut state,
            LedgerEventKind::ResourceRemoved {
                token_id,
                owner: *owner,
                resource: resource.clone(),
                amount,
            },
        );
        Ok(())
    }

    fn transfer_resource(
        &self,
        caller: &Address,
        transfer: &ResourceTransfer,
        destination: &dyn ResourceLedger,
    ) -> LedgerResult<()> {
        self.require_owner_or_authorized(
            caller,
            &self.config.storage_collection,
            transfer.from_token_id,
        )?;
        self.require_holder(transfer.from_token_id, &transfer.from_owner)?;
        self.validate_movement(&transfer.resource, transfer.amount)?;

        if destination.address() == self.config.address {
            self.transfer_within(transfer)
        } else {
            self.transfer_across(transfer, destination)
        }
    }

    fn set_storage_capacity(
        &self,
        caller: &Address,
        token_id: TokenId,
        capacity: Amount,
    ) -> LedgerResult<()> {
        self.require_authorized(caller, "set storage capacity")?;

        let mut state = self.write_state()?;
        let current = state.total(token_id)?;
        if capacity < current {
            return Err(LedgerError::CapacityBelowBalance {
                token_id,
                capacity,
                current,
            });
        }

        let previous = state.capacity(token_id, self.config.default_capacity);
        state.capacities.insert(token_id, capacity);
        self.record(
            &mut state,
            LedgerEventKind::CapacityUpdated {
                token_id,
                previous,
                capacity,
            },
        );
        Ok(())
    }

    fn assign_storage_to_primary(
        &self,
        caller: &Address,
        primary: PrimaryRef,
        storage_token_id: TokenId,
    ) -> LedgerResult<()> {
        if !self.collaborators.is_authorized(caller) {
            self.require_owner_or_authorized(caller, &primary.collection, primary.token_id)?;
            self.require_owner_or_authorized(
                caller,
                &self.config.storage_collection,
                storage_token_id,
            )?;
        }

        let mut state = self.write_state()?;
        if let Some(existing) = state.assignments.get(&primary) {
            return Err(LedgerError::AlreadyAssigned {
                primary,
                storage_token_id: *existing,
            });
        }

        let limit = self.config.policy.max_primaries();
        let backed = state.backing.get(&storage_token_id).map_or(0, BTreeSet::len);
        if backed >= limit {
            return Err(LedgerError::StorageFull {
                storage_token_id,
                backed,
                limit,
            });
        }

        state.assign(primary, storage_token_id);
        self.record(
            &mut state,
            LedgerEventKind::StorageAssigned {
                primary,
                storage_token_id,
            },
        );
        Ok(())
    }

    fn unassign_storage_from_primary(
        &self,
        caller: &Address,
        primary: &PrimaryRef,
    ) -> LedgerResult<TokenId> {
        let tokens = &self.collaborators.tokens;
        let privileged = self.collaborators.is_authorized(caller)
            || tokens.is_owner(&primary.collection, primary.token_id, caller)?;

        let mut state = self.write_state()?;
        let storage_token_id = match state.assignments.get(primary).copied() {
            Some(storage_token_id) => storage_token_id,
            None if privileged => return Err(LedgerError::NotAssigned(*primary)),
            // Do not reveal assignment state to strangers
            None => {
                return Err(LedgerError::NotTokenOwner {
                    caller: *caller,
                    collection: primary.collection,
                    token_id: primary.token_id,
                })
            }
        };

        if !privileged
            && !tokens.is_owner(&self.config.storage_collection, storage_token_id, caller)?
        {
            warn!(
                ledger = %self.config.address,
                caller = %caller,
                primary = %primary,
                "Rejected unassign by a caller owning neither token"
            );
            return Err(LedgerError::NotTokenOwner {
                caller: *caller,
                collection: primary.collection,
                token_id: primary.token_id,
            });
        }

        state.unassign(primary);
        self.record(
            &mut state,
            LedgerEventKind::StorageUnassigned {
                primary: *primary,
                storage_token_id,
            },
        );
        Ok(storage_token_id)
    }

    fn check_movement(&self, resource: &ResourceType, amount: Amount) -> LedgerResult<()> {
        self.validate_movement(resource, amount)
    }

    fn check_credit(
        &self,
        token_id: TokenId,
        resource: &ResourceType,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.validate_movement(resource, amount)?;
        let state = self.read_state()?;
        self.ensure_headroom(&state, token_id, amount)
    }

    fn get_resource_balance(
        &self,
        token_id: TokenId,
        resource: &ResourceType,
    ) -> LedgerResult<Amount> {
        Ok(self.read_state()?.balance(token_id, resource))
    }

    fn get_all_resource_balances(
        &self,
        token_id: TokenId,
    ) -> LedgerResult<BTreeMap<ResourceType, Amount>> {
        Ok(self
            .read_state()?
            .balances
            .get(&token_id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_total_resources_in_storage(&self, token_id: TokenId) -> LedgerResult<Amount> {
        self.read_state()?.total(token_id)
    }

    fn get_storage_capacity(&self, token_id: TokenId) -> LedgerResult<Amount> {
        Ok(self
            .read_state()?
            .capacity(token_id, self.config.default_capacity))
    }

    fn get_explicit_capacity(&self, token_id: TokenId) -> LedgerResult<Option<Amount>> {
        Ok(self.read_state()?.capacities.get(&token_id).copied())
    }

    fn get_assigned_storage(&self, primary: &PrimaryRef) -> LedgerResult<Option<TokenId>> {
        Ok(self.read_state()?.assignments.get(primary).copied())
    }

    fn get_primaries_for_storage(
        &self,
        storage_token_id: TokenId,
    ) -> LedgerResult<Vec<PrimaryRef>> {
        Ok(self
            .read_state()?
            .backing
            .get(&storage_token_id)
            .map(|primaries| primaries.iter().copied().collect())
            .unwrap_or_default())
    }

    fn events_since(&self, sequence: u64) -> LedgerResult<Vec<LedgerEvent>> {
        let state = self.read_state()?;
        let events: Vec<_> = state
            .events
            .iter()
            .filter(|event| event.sequence > sequence)
            .cloned()
            .collect();
        debug!(
            ledger = %self.config.address,
            since = sequence,
            count = events.len(),
            "Read ledger events"
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockpile_error::{ErrorCategory, StockpileError};
    use stockpile_types::{
        AccessControlList, AssetToken, AssetTokenDirectory, InMemoryAssetToken, ResourceTypeSet,
    };

    use super::*;

    struct Fixture {
        ledger: InMemoryResourceLedger,
        collaborators: Collaborators,
        acl: Arc<AccessControlList>,
        storage: Arc<InMemoryAssetToken>,
        crew: Arc<InMemoryAssetToken>,
        operator: Address,
        alice: Address,
        bob: Address,
    }

    fn wood() -> ResourceType {
        ResourceType::new("wood").unwrap()
    }

    fn stone() -> ResourceType {
        ResourceType::new("stone").unwrap()
    }

    fn units(n: u64) -> Amount {
        Amount::from_whole(n)
    }

    fn ledger_config(address: u64) -> LedgerConfig {
        LedgerConfig::new("crew", Address::from_low_u64(address), Address::from_low_u64(100))
            .with_default_capacity(units(1_000))
    }

    fn fixture() -> Fixture {
        let operator = Address::from_low_u64(1);
        let alice = Address::from_low_u64(10);
        let bob = Address::from_low_u64(11);

        let acl = Arc::new(AccessControlList::new());
        acl.grant_authorized(operator);

        let storage = Arc::new(InMemoryAssetToken::new(Address::from_low_u64(100)));
        let crew = Arc::new(InMemoryAssetToken::new(Address::from_low_u64(200)));
        storage.mint(alice, 1).unwrap();
        storage.mint(alice, 2).unwrap();
        storage.mint(bob, 3).unwrap();
        crew.mint(alice, 7).unwrap();
        crew.mint(bob, 8).unwrap();

        let tokens = AssetTokenDirectory::new();
        tokens.register(storage.clone()).unwrap();
        tokens.register(crew.clone()).unwrap();

        let collaborators = Collaborators::new(
            acl.clone(),
            Arc::new(ResourceTypeSet::from_names(["wood", "stone"]).unwrap()),
            tokens,
        );
        let ledger = InMemoryResourceLedger::new(ledger_config(50), collaborators.clone());

        Fixture {
            ledger,
            collaborators,
            acl,
            storage,
            crew,
            operator,
            alice,
            bob,
        }
    }

    #[test]
    fn test_add_and_read_balances() {
        let f = fixture();
        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(100))
            .unwrap();
        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &stone(), units(5))
            .unwrap();

        assert_eq!(f.ledger.get_resource_balance(TokenId(1), &wood()).unwrap(), units(100));
        assert_eq!(f.ledger.get_total_resources_in_storage(TokenId(1)).unwrap(), units(105));

        let all = f.ledger.get_all_resource_balances(TokenId(1)).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&stone()], units(5));
        assert!(f.ledger.get_all_resource_balances(TokenId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_add_rejections_leave_state_untouched() {
        let f = fixture();

        let err = f
            .ledger
            .add_resource(&f.alice, TokenId(1), &f.alice, &wood(), units(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        let gold = ResourceType::new("gold").unwrap();
        let err = f
            .ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &gold, units(1))
            .unwrap_err();
        assert_eq!(err, LedgerError::InvalidResource(gold));

        let err = f
            .ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), Amount::ZERO)
            .unwrap_err();
        assert_eq!(err, LedgerError::ZeroAmount);

        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(900))
            .unwrap();
        let err = f
            .ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &stone(), units(101))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::CapacityExceeded {
                token_id: TokenId(1),
                capacity: units(1_000),
                requested: units(1_001),
            }
        );

        assert_eq!(f.ledger.get_total_resources_in_storage(TokenId(1)).unwrap(), units(900));
        assert_eq!(f.ledger.events().unwrap().len(), 1);
    }

    #[test]
    fn test_dump_by_owner_and_stranger() {
        let f = fixture();
        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(10))
            .unwrap();

        f.ledger
            .dump_resource(&f.alice, TokenId(1), &f.alice, &wood(), units(4))
            .unwrap();
        assert_eq!(f.ledger.get_resource_balance(TokenId(1), &wood()).unwrap(), units(6));

        let err = f
            .ledger
            .dump_resource(&f.bob, TokenId(1), &f.alice, &wood(), units(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotTokenOwner { .. }));

        let err = f
            .ledger
            .dump_resource(&f.alice, TokenId(1), &f.alice, &wood(), units(7))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        f.ledger
            .dump_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(6))
            .unwrap();
        assert!(f.ledger.get_all_resource_balances(TokenId(1)).unwrap().is_empty());
    }

    #[test]
    fn test_debit_must_name_the_current_holder() {
        let f = fixture();
        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(10))
            .unwrap();
        let events = f.ledger.events().unwrap().len();

        let err = f
            .ledger
            .dump_resource(&f.operator, TokenId(1), &f.bob, &wood(), units(1))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::OwnerMismatch {
                token_id: TokenId(1),
                claimed: f.bob,
                actual: Some(f.alice),
            }
        );
        assert_eq!(err.category(), ErrorCategory::Validation);

        let misnamed = ResourceTransfer::new(
            (TokenId(1), f.bob),
            (TokenId(3), f.bob),
            wood(),
            units(1),
        );
        let err = f
            .ledger
            .transfer_resource(&f.operator, &misnamed, &f.ledger)
            .unwrap_err();
        assert!(matches!(err, LedgerError::OwnerMismatch { .. }));

        // An unminted token has no holder to match
        let err = f
            .ledger
            .dump_resource(&f.operator, TokenId(9), &f.alice, &wood(), units(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::OwnerMismatch { actual: None, .. }));

        assert_eq!(f.ledger.get_resource_balance(TokenId(1), &wood()).unwrap(), units(10));
        assert_eq!(f.ledger.get_resource_balance(TokenId(3), &wood()).unwrap(), units(0));
        assert_eq!(f.ledger.events().unwrap().len(), events);
    }

    #[test]
    fn test_transfer_within_ledger() {
        let f = fixture();
        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(10))
            .unwrap();

        let transfer = ResourceTransfer::new(
            (TokenId(1), f.alice),
            (TokenId(3), f.bob),
            wood(),
            units(4),
        );
        f.ledger.transfer_resource(&f.alice, &transfer, &f.ledger).unwrap();

        assert_eq!(f.ledger.get_resource_balance(TokenId(1), &wood()).unwrap(), units(6));
        assert_eq!(f.ledger.get_resource_balance(TokenId(3), &wood()).unwrap(), units(4));

        let to_self = ResourceTransfer::new(
            (TokenId(1), f.alice),
            (TokenId(1), f.alice),
            wood(),
            units(1),
        );
        assert_eq!(
            f.ledger.transfer_resource(&f.alice, &to_self, &f.ledger),
            Err(LedgerError::SelfTransfer(TokenId(1)))
        );
    }

    #[test]
    fn test_transfer_across_ledgers() {
        let f = fixture();
        let other = InMemoryResourceLedger::new(
            ledger_config(51).with_default_capacity(units(5)),
            f.collaborators.clone(),
        );
        // The source ledger credits the destination under its own address
        f.acl.grant_authorized(f.ledger.address());

        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(10))
            .unwrap();

        let transfer = ResourceTransfer::new(
            (TokenId(1), f.alice),
            (TokenId(1), f.alice),
            wood(),
            units(3),
        );
        f.ledger.transfer_resource(&f.operator, &transfer, &other).unwrap();
        assert_eq!(f.ledger.get_resource_balance(TokenId(1), &wood()).unwrap(), units(7));
        assert_eq!(other.get_resource_balance(TokenId(1), &wood()).unwrap(), units(3));

        // Destination has room for only 2 more
        let too_much = ResourceTransfer { amount: units(3), ..transfer };
        let err = f.ledger.transfer_resource(&f.operator, &too_much, &other).unwrap_err();
        assert!(matches!(err, LedgerError::CapacityExceeded { .. }));
        assert_eq!(f.ledger.get_resource_balance(TokenId(1), &wood()).unwrap(), units(7));
        assert_eq!(other.get_resource_balance(TokenId(1), &wood()).unwrap(), units(3));
    }

    #[test]
    fn test_failed_cross_credit_reverses_debit() {
        let f = fixture();
        let other = InMemoryResourceLedger::new(ledger_config(51), f.collaborators.clone());
        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(10))
            .unwrap();

        // Pre-validation passes but the source ledger is not allowlisted on
        // the destination, so the credit itself fails
        let transfer = ResourceTransfer::new(
            (TokenId(1), f.alice),
            (TokenId(2), f.alice),
            wood(),
            units(3),
        );
        let err = f.ledger.transfer_resource(&f.alice, &transfer, &other).unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        assert_eq!(f.ledger.get_resource_balance(TokenId(1), &wood()).unwrap(), units(10));
        assert_eq!(other.get_total_resources_in_storage(TokenId(2)).unwrap(), Amount::ZERO);
        assert_eq!(f.ledger.events().unwrap().len(), 1);
    }

    #[test]
    fn test_capacity_updates() {
        let f = fixture();
        assert_eq!(f.ledger.get_storage_capacity(TokenId(1)).unwrap(), units(1_000));
        assert_eq!(f.ledger.get_explicit_capacity(TokenId(1)).unwrap(), None);

        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(50))
            .unwrap();

        let err = f
            .ledger
            .set_storage_capacity(&f.operator, TokenId(1), units(49))
            .unwrap_err();
        assert!(matches!(err, LedgerError::CapacityBelowBalance { .. }));

        f.ledger
            .set_storage_capacity(&f.operator, TokenId(1), units(2_000))
            .unwrap();
        assert_eq!(f.ledger.get_storage_capacity(TokenId(1)).unwrap(), units(2_000));
        assert_eq!(f.ledger.get_explicit_capacity(TokenId(1)).unwrap(), Some(units(2_000)));

        let last = f.ledger.events().unwrap().pop().unwrap();
        assert_eq!(
            last.kind,
            LedgerEventKind::CapacityUpdated {
                token_id: TokenId(1),
                previous: units(1_000),
                capacity: units(2_000),
            }
        );
    }

    #[test]
    fn test_assignment_requires_unassign_first() {
        let f = fixture();
        let primary = PrimaryRef::new(f.crew.collection(), 7);

        f.ledger
            .assign_storage_to_primary(&f.alice, primary, TokenId(1))
            .unwrap();
        assert_eq!(f.ledger.get_assigned_storage(&primary).unwrap(), Some(TokenId(1)));
        assert_eq!(f.ledger.get_primaries_for_storage(TokenId(1)).unwrap(), vec![primary]);

        let err = f
            .ledger
            .assign_storage_to_primary(&f.alice, primary, TokenId(2))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::AlreadyAssigned {
                primary,
                storage_token_id: TokenId(1),
            }
        );

        assert_eq!(
            f.ledger.unassign_storage_from_primary(&f.alice, &primary).unwrap(),
            TokenId(1)
        );
        f.ledger
            .assign_storage_to_primary(&f.alice, primary, TokenId(2))
            .unwrap();
        assert!(f.ledger.get_primaries_for_storage(TokenId(1)).unwrap().is_empty());
    }

    #[test]
    fn test_assignment_ownership_and_policy() {
        let f = fixture();
        let alice_primary = PrimaryRef::new(f.crew.collection(), 7);
        let bob_primary = PrimaryRef::new(f.crew.collection(), 8);

        // Bob owns his primary but not storage token 1
        let err = f
            .ledger
            .assign_storage_to_primary(&f.bob, bob_primary, TokenId(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotTokenOwner { .. }));

        f.ledger
            .assign_storage_to_primary(&f.operator, alice_primary, TokenId(1))
            .unwrap();
        let err = f
            .ledger
            .assign_storage_to_primary(&f.operator, bob_primary, TokenId(1))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::StorageFull {
                storage_token_id: TokenId(1),
                backed: 1,
                limit: 1,
            }
        );
    }

    #[test]
    fn test_many_to_one_policy() {
        let f = fixture();
        let ledger = InMemoryResourceLedger::new(
            ledger_config(52).with_policy(AssignmentPolicy::ManyToOne { max_primaries: 2 }),
            f.collaborators.clone(),
        );
        let collection = f.crew.collection();

        for id in [7, 8] {
            ledger
                .assign_storage_to_primary(&f.operator, PrimaryRef::new(collection, id), TokenId(1))
                .unwrap();
        }
        assert_eq!(ledger.get_primaries_for_storage(TokenId(1)).unwrap().len(), 2);
        assert!(matches!(
            ledger.assign_storage_to_primary(&f.operator, PrimaryRef::new(collection, 9), TokenId(1)),
            Err(LedgerError::StorageFull { .. })
        ));
    }

    #[test]
    fn test_unassign_by_storage_owner_and_stranger() {
        let f = fixture();
        let primary = PrimaryRef::new(f.crew.collection(), 8);
        f.ledger
            .assign_storage_to_primary(&f.operator, primary, TokenId(1))
            .unwrap();

        // A stranger learns nothing about the assignment
        let stranger = Address::from_low_u64(99);
        assert!(matches!(
            f.ledger.unassign_storage_from_primary(&stranger, &primary),
            Err(LedgerError::NotTokenOwner { .. })
        ));

        // Alice owns the backing storage token but not the primary
        assert_eq!(
            f.ledger.unassign_storage_from_primary(&f.alice, &primary).unwrap(),
            TokenId(1)
        );
        assert_eq!(
            f.ledger.unassign_storage_from_primary(&f.operator, &primary),
            Err(LedgerError::NotAssigned(primary))
        );
    }

    #[test]
    fn test_ownership_follows_token_moves() {
        let f = fixture();
        f.ledger
            .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(10))
            .unwrap();
        f.storage.move_token(1, f.bob).unwrap();

        assert!(f
            .ledger
            .dump_resource(&f.alice, TokenId(1), &f.alice, &wood(), units(1))
            .is_err());
        f.ledger
            .dump_resource(&f.bob, TokenId(1), &f.bob, &wood(), units(1))
            .unwrap();
    }

    #[test]
    fn test_event_journal_sequence_and_retention() {
        let f = fixture();
        let ledger = InMemoryResourceLedger::new(
            ledger_config(53).with_max_retained_events(3),
            f.collaborators.clone(),
        );
        for _ in 0..5 {
            ledger
                .add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(1))
                .unwrap();
        }

        let events = ledger.events().unwrap();
        let sequences: Vec<_> = events.iter().map(|event| event.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);
        assert_eq!(ledger.events_since(4).unwrap().len(), 1);
        assert!(events.iter().all(|event| event.ledger == ledger.address()));
        assert_eq!(events[0].name(), "ResourceAdded");
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn capacity_holds_across_random_adds(amounts in proptest::collection::vec(1u64..400, 1..20)) {
                let f = fixture();
                for amount in amounts {
                    let before = f.ledger.get_total_resources_in_storage(TokenId(1)).unwrap();
                    let result = f.ledger.add_resource(&f.operator, TokenId(1), &f.alice, &wood(), units(amount));
                    let after = f.ledger.get_total_resources_in_storage(TokenId(1)).unwrap();

                    prop_assert!(after <= f.ledger.get_storage_capacity(TokenId(1)).unwrap());
                    if result.is_err() {
                        prop_assert_eq!(before, after);
                    }
                }
            }
        }
    }
}
