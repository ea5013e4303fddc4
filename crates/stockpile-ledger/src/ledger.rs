// Resource ledger interface
//
// This module defines the `ResourceLedger` trait that the registry and the
// migration controller depend on. Implementations hold per-token balances,
// capacities and primary-to-storage assignments for one domain.

use std::collections::BTreeMap;
use std::fmt;

use stockpile_types::{Address, Amount, PrimaryRef, ResourceType, TokenId};

use crate::config::AssignmentPolicy;
use crate::error::LedgerResult;
use crate::event::LedgerEvent;

/// A resource movement between two storage tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTransfer {
    pub from_token_id: TokenId,
    pub from_owner: Address,
    pub to_token_id: TokenId,
    pub to_owner: Address,
    pub resource: ResourceType,
    pub amount: Amount,
}

impl ResourceTransfer {
    pub fn new(
        from: (TokenId, Address),
        to: (TokenId, Address),
        resource: ResourceType,
        amount: Amount,
    ) -> Self {
        Self {
            from_token_id: from.0,
            from_owner: from.1,
            to_token_id: to.0,
            to_owner: to.1,
            resource,
            amount,
        }
    }
}

/// Per-domain store of resource balances and storage assignments
///
/// Every mutation names its `caller`; the ledger consults the central
/// authorization and the storage collection's token contract to decide
/// whether the caller may perform it. Each mutation either applies fully or
/// leaves no trace.
pub trait ResourceLedger: Send + Sync + fmt::Debug {
    /// Address the ledger acts under
    fn address(&self) -> Address;

    /// Domain name, e.g. `crew`
    fn domain(&self) -> &str;

    /// Collection whose tokens hold balances
    fn storage_collection(&self) -> Address;

    fn policy(&self) -> AssignmentPolicy;

    /// Credit `amount` of `resource` to a storage token. Authorized callers only.
    fn add_resource(
        &self,
        caller: &Address,
        token_id: TokenId,
        owner: &Address,
        resource: &ResourceType,
        amount: Amount,
    ) -> LedgerResult<()>;

    /// Debit and burn `amount` of `resource`. Authorized callers or the token owner.
    fn dump_resource(
        &self,
        caller: &Address,
        token_id: TokenId,
        owner: &Address,
        resource: &ResourceType,
        amount: Amount,
    ) -> LedgerResult<()>;

    /// Move resources from one of this ledger's tokens to a token on
    /// `destination`, which may be this ledger.
    ///
    /// A cross-ledger credit is performed with this ledger's address as the
    /// caller; if it fails the debit is reversed.
    fn transfer_resource(
        &self,
        caller: &Address,
        transfer: &ResourceTransfer,
        destination: &dyn ResourceLedger,
    ) -> LedgerResult<()>;

    /// Set the explicit capacity of a storage token. Authorized callers only.
    fn set_storage_capacity(
        &self,
        caller: &Address,
        token_id: TokenId,
        capacity: Amount,
    ) -> LedgerResult<()>;

    /// Back `primary` with a storage token
    fn assign_storage_to_primary(
        &self,
        caller: &Address,
        primary: PrimaryRef,
        storage_token_id: TokenId,
    ) -> LedgerResult<()>;

    /// Clear the assignment of `primary`, returning the storage token it had
    fn unassign_storage_from_primary(
        &self,
        caller: &Address,
        primary: &PrimaryRef,
    ) -> LedgerResult<TokenId>;

    /// Check, without mutating, that `amount` of `resource` is a valid
    /// movement on this ledger, regardless of any token's capacity.
    fn check_movement(&self, resource: &ResourceType, amount: Amount) -> LedgerResult<()>;

    /// Check, without mutating, that `amount` of `resource` could be credited
    /// to `token_id` right now.
    fn check_credit(
        &self,
        token_id: TokenId,
        resource: &ResourceType,
        amount: Amount,
    ) -> LedgerResult<()>;

    fn get_resource_balance(&self, token_id: TokenId, resource: &ResourceType)
        -> LedgerResult<Amount>;

    /// Every non-zero balance of a token
    fn get_all_resource_balances(
        &self,
        token_id: TokenId,
    ) -> LedgerResult<BTreeMap<ResourceType, Amount>>;

    fn get_total_resources_in_storage(&self, token_id: TokenId) -> LedgerResult<Amount>;

    /// Effective capacity: the explicit capacity, or the ledger default
    fn get_storage_capacity(&self, token_id: TokenId) -> LedgerResult<Amount>;

    /// Capacity set through `set_storage_capacity`, if any
    fn get_explicit_capacity(&self, token_id: TokenId) -> LedgerResult<Option<Amount>>;

    fn get_assigned_storage(&self, primary: &PrimaryRef) -> LedgerResult<Option<TokenId>>;

    /// Primaries currently backed by a storage token, in ascending order
    fn get_primaries_for_storage(&self, storage_token_id: TokenId) -> LedgerResult<Vec<PrimaryRef>>;

    /// Journaled events with a sequence number greater than `sequence`
    fn events_since(&self, sequence: u64) -> LedgerResult<Vec<LedgerEvent>>;

    /// Every retained event
    fn events(&self) -> LedgerResult<Vec<LedgerEvent>> {
        self.events_since(0)
    }
}
