// External collaborator interfaces
//
// The ledgers never own NFT ownership, resource type governance, or
// role management. They consult these traits instead. In-memory
// implementations are provided for tests and local simulation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::address::Address;
use crate::error::TypesError;
use crate::resource::ResourceType;
use crate::token::TokenId;

//-----------------------------------------------------------------------------
// Central authorization
//-----------------------------------------------------------------------------

/// Role lookups consulted on every privileged call
pub trait Authorization: Send + Sync + fmt::Debug {
    /// Whether the caller is on the operator allowlist
    fn is_authorized(&self, caller: &Address) -> bool;

    /// Whether the caller holds the admin role
    fn is_admin(&self, caller: &Address) -> bool;
}

/// Allowlist-backed authorization. Admins are implicitly authorized.
#[derive(Debug, Default)]
pub struct AccessControlList {
    admins: RwLock<HashSet<Address>>,
    authorized: RwLock<HashSet<Address>>,
}

impl AccessControlList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list with a single admin
    pub fn with_admin(admin: Address) -> Self {
        let acl = Self::new();
        acl.grant_admin(admin);
        acl
    }

    pub fn grant_admin(&self, who: Address) {
        self.admins.write().unwrap_or_else(PoisonError::into_inner).insert(who);
    }

    pub fn revoke_admin(&self, who: &Address) {
        self.admins.write().unwrap_or_else(PoisonError::into_inner).remove(who);
    }

    pub fn grant_authorized(&self, who: Address) {
        self.authorized.write().unwrap_or_else(PoisonError::into_inner).insert(who);
    }

    pub fn revoke_authorized(&self, who: &Address) {
        self.authorized.write().unwrap_or_else(PoisonError::into_inner).remove(who);
    }
}

impl Authorization for AccessControlList {
    fn is_authorized(&self, caller: &Address) -> bool {
        self.is_admin(caller)
            || self
                .authorized
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(caller)
    }

    fn is_admin(&self, caller: &Address) -> bool {
        self.admins.read().unwrap_or_else(PoisonError::into_inner).contains(caller)
    }
}

//-----------------------------------------------------------------------------
// Resource type registry
//-----------------------------------------------------------------------------

/// Governs which resource names may be credited or debited
pub trait ResourceTypeRegistry: Send + Sync + fmt::Debug {
    fn is_valid_resource_type(&self, resource: &ResourceType) -> bool;
}

/// A fixed set of valid resource types
#[derive(Debug, Default)]
pub struct ResourceTypeSet {
    types: RwLock<BTreeSet<ResourceType>>,
}

impl ResourceTypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from resource names, rejecting malformed ones
    pub fn from_names<'a, I>(names: I) -> Result<Self, TypesError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let set = Self::new();
        for name in names {
            set.register(ResourceType::new(name)?);
        }
        Ok(set)
    }

    pub fn register(&self, resource: ResourceType) {
        self.types.write().unwrap_or_else(PoisonError::into_inner).insert(resource);
    }

    pub fn deregister(&self, resource: &ResourceType) {
        self.types.write().unwrap_or_else(PoisonError::into_inner).remove(resource);
    }
}

impl ResourceTypeRegistry for ResourceTypeSet {
    fn is_valid_resource_type(&self, resource: &ResourceType) -> bool {
        self.types.read().unwrap_or_else(PoisonError::into_inner).contains(resource)
    }
}

//-----------------------------------------------------------------------------
// Asset token contracts
//-----------------------------------------------------------------------------

/// Read surface of an external NFT collection (ERC-721 style)
pub trait AssetToken: Send + Sync + fmt::Debug {
    /// Address of the collection contract
    fn collection(&self) -> Address;

    /// Current owner, or `None` if the token does not exist
    fn owner_of(&self, token_id: TokenId) -> Option<Address>;

    /// Number of tokens held by `owner`
    fn balance_of(&self, owner: &Address) -> u64;

    /// Enumerate an owner's tokens by index, `0..balance_of(owner)`
    fn token_of_owner_by_index(&self, owner: &Address, index: u64) -> Option<TokenId>;

    /// All tokens of an owner, in enumeration order
    fn tokens_of_owner(&self, owner: &Address) -> Vec<TokenId> {
        (0..self.balance_of(owner))
            .filter_map(|index| self.token_of_owner_by_index(owner, index))
            .collect()
    }

    /// Whether `who` currently owns `token_id`
    fn is_owner(&self, token_id: TokenId, who: &Address) -> bool {
        self.owner_of(token_id).as_ref() == Some(who)
    }
}

#[derive(Debug, Default)]
struct OwnershipState {
    owners: BTreeMap<TokenId, Address>,
    by_owner: BTreeMap<Address, Vec<TokenId>>,
}

impl OwnershipState {
    fn detach(&mut self, token_id: TokenId, owner: &Address) {
        if let Some(tokens) = self.by_owner.get_mut(owner) {
            tokens.retain(|id| *id != token_id);
            if tokens.is_empty() {
                self.by_owner.remove(owner);
            }
        }
    }
}

/// In-memory NFT collection with mint and move only
#[derive(Debug)]
pub struct InMemoryAssetToken {
    collection: Address,
    state: RwLock<OwnershipState>,
}

impl InMemoryAssetToken {
    pub fn new(collection: Address) -> Self {
        Self {
            collection,
            state: RwLock::new(OwnershipState::default()),
        }
    }

    /// Mint `token_id` to `to`
    pub fn mint(&self, to: Address, token_id: impl Into<TokenId>) -> Result<(), TypesError> {
        let token_id = token_id.into();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.owners.contains_key(&token_id) {
            return Err(TypesError::TokenAlreadyMinted(token_id.value()));
        }
        state.owners.insert(token_id, to);
        state.by_owner.entry(to).or_default().push(token_id);
        Ok(())
    }

    /// Move a token to a new owner, as an external transfer would
    pub fn move_token(&self, token_id: impl Into<TokenId>, to: Address) -> Result<(), TypesError> {
        let token_id = token_id.into();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let previous = state
            .owners
            .get(&token_id)
            .copied()
            .ok_or(TypesError::TokenNotFound(token_id.value()))?;

        state.detach(token_id, &previous);
        state.owners.insert(token_id, to);
        state.by_owner.entry(to).or_default().push(token_id);
        Ok(())
    }
}

impl AssetToken for InMemoryAssetToken {
    fn collection(&self) -> Address {
        self.collection
    }

    fn owner_of(&self, token_id: TokenId) -> Option<Address> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .owners
            .get(&token_id)
            .copied()
    }

    fn balance_of(&self, owner: &Address) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_owner
            .get(owner)
            .map_or(0, |tokens| tokens.len() as u64)
    }

    fn token_of_owner_by_index(&self, owner: &Address, index: u64) -> Option<TokenId> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let index = usize::try_from(index).ok()?;
        state.by_owner.get(owner)?.get(index).copied()
    }
}

/// Keyed store of token contracts by collection address.
///
/// Cloning shares the underlying table.
#[derive(Clone, Default)]
pub struct AssetTokenDirectory {
    tokens: Arc<RwLock<HashMap<Address, Arc<dyn AssetToken>>>>,
}

impl fmt::Debug for AssetTokenDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        let mut collections: Vec<_> = tokens.keys().collect();
        collections.sort();
        f.debug_struct("AssetTokenDirectory")
            .field("collections", &collections)
            .finish()
    }
}

impl AssetTokenDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token contract under its collection address
    pub fn register(&self, token: Arc<dyn AssetToken>) -> Result<(), TypesError> {
        let collection = token.collection();
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        if tokens.contains_key(&collection) {
            return Err(TypesError::CollectionAlreadyKnown(collection));
        }
        tokens.insert(collection, token);
        Ok(())
    }

    /// Look up the token contract of a collection
    pub fn get(&self, collection: &Address) -> Result<Arc<dyn AssetToken>, TypesError> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
            .ok_or(TypesError::UnknownCollection(*collection))
    }

    /// Whether `who` owns `token_id` in `collection`
    pub fn is_owner(
        &self,
        collection: &Address,
        token_id: TokenId,
        who: &Address,
    ) -> Result<bool, TypesError> {
        Ok(self.get(collection)?.is_owner(token_id, who))
    }

    /// Owner of `token_id` in `collection`
    pub fn owner_of(
        &self,
        collection: &Address,
        token_id: TokenId,
    ) -> Result<Option<Address>, TypesError> {
        Ok(self.get(collection)?.owner_of(token_id))
    }
}

//-----------------------------------------------------------------------------
// Collaborator bundle
//-----------------------------------------------------------------------------

/// The external collaborators a component consults, bundled for wiring.
///
/// Cloning shares every collaborator.
#[derive(Clone, Debug)]
pub struct Collaborators {
    pub authorization: Arc<dyn Authorization>,
    pub resource_types: Arc<dyn ResourceTypeRegistry>,
    pub tokens: AssetTokenDirectory,
}

impl Collaborators {
    pub fn new(
        authorization: Arc<dyn Authorization>,
        resource_types: Arc<dyn ResourceTypeRegistry>,
        tokens: AssetTokenDirectory,
    ) -> Self {
        Self {
            authorization,
            resource_types,
            tokens,
        }
    }

    /// Whether `caller` is allowlisted
    pub fn is_authorized(&self, caller: &Address) -> bool {
        self.authorization.is_authorized(caller)
    }

    /// Whether `caller` is an admin
    pub fn is_admin(&self, caller: &Address) -> bool {
        self.authorization.is_admin(caller)
    }
}
