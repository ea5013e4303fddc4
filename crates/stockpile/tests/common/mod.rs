// Shared fixture for the cross-crate tests
//
// One registry routing a storage collection to an "old" ledger, with a
// second "new" ledger in the same domain ready to take over.

#![allow(dead_code)]

use std::sync::Arc;

use stockpile::migration::MigrationController;
use stockpile::types::{AccessControlList, AssetTokenDirectory, InMemoryAssetToken, ResourceTypeSet};
use stockpile::{
    Address, Amount, AssignmentPolicy, CollectionRoute, Collaborators, InMemoryResourceLedger,
    LedgerConfig, MigrationConfig, PrimaryRef, RegistryConfig, ResourceType, Stockpile,
    StockpileConfig, TokenId,
};

pub const STORAGE: u64 = 100;
pub const CREW: u64 = 200;
pub const OLD_LEDGER: u64 = 50;
pub const NEW_LEDGER: u64 = 51;
pub const REGISTRY: u64 = 5;

pub struct World {
    pub stockpile: Stockpile,
    pub acl: Arc<AccessControlList>,
    pub storage: Arc<InMemoryAssetToken>,
    pub crew: Arc<InMemoryAssetToken>,
    pub admin: Address,
    pub operator: Address,
    pub controller: Address,
    pub alice: Address,
    pub bob: Address,
    pub mallory: Address,
}

pub fn wood() -> ResourceType {
    ResourceType::new("wood").unwrap()
}

pub fn stone() -> ResourceType {
    ResourceType::new("stone").unwrap()
}

pub fn units(n: u64) -> Amount {
    Amount::from_whole(n)
}

pub fn storage_collection() -> Address {
    Address::from_low_u64(STORAGE)
}

pub fn crew(id: u64) -> PrimaryRef {
    PrimaryRef::new(Address::from_low_u64(CREW), id)
}

pub fn deployment(migration: MigrationConfig) -> StockpileConfig {
    let ledger = |address| {
        LedgerConfig::new("crew", Address::from_low_u64(address), storage_collection())
            .with_default_capacity(units(1_000))
            .with_policy(AssignmentPolicy::ManyToOne { max_primaries: 4 })
    };
    StockpileConfig {
        registry: RegistryConfig {
            address: Address::from_low_u64(REGISTRY),
            collections: vec![CollectionRoute {
                collection: storage_collection(),
                ledger: Address::from_low_u64(OLD_LEDGER),
            }],
        },
        ledgers: vec![ledger(OLD_LEDGER), ledger(NEW_LEDGER)],
        migration,
        ..StockpileConfig::default()
    }
}

/// Storage tokens 1, 2 and 5 belong to alice and 3 to bob. Crew 21 to 24
/// belong to alice.
pub fn world() -> World {
    world_with(MigrationConfig::default())
}

pub fn world_with(migration: MigrationConfig) -> World {
    stockpile::test_logging::init_test_logging();

    let admin = Address::from_low_u64(1);
    let operator = Address::from_low_u64(2);
    let controller = Address::from_low_u64(3);
    let alice = Address::from_low_u64(10);
    let bob = Address::from_low_u64(11);
    let mallory = Address::from_low_u64(66);

    let acl = Arc::new(AccessControlList::with_admin(admin));
    // The registry forwards under its own address and a source ledger
    // credits the destination under its own address
    for who in [operator, controller] {
        acl.grant_authorized(who);
    }
    for who in [REGISTRY, OLD_LEDGER, NEW_LEDGER] {
        acl.grant_authorized(Address::from_low_u64(who));
    }

    let storage = Arc::new(InMemoryAssetToken::new(storage_collection()));
    for id in [1, 2, 5] {
        storage.mint(alice, id).unwrap();
    }
    storage.mint(bob, 3).unwrap();

    let crew_token = Arc::new(InMemoryAssetToken::new(Address::from_low_u64(CREW)));
    for id in 21..=24 {
        crew_token.mint(alice, id).unwrap();
    }

    let tokens = AssetTokenDirectory::new();
    tokens.register(storage.clone()).unwrap();
    tokens.register(crew_token.clone()).unwrap();
    let collaborators = Collaborators::new(
        acl.clone(),
        Arc::new(ResourceTypeSet::from_names(["wood", "stone"]).unwrap()),
        tokens,
    );

    let stockpile = Stockpile::from_config(deployment(migration), collaborators, &admin).unwrap();
    World {
        stockpile,
        acl,
        storage,
        crew: crew_token,
        admin,
        operator,
        controller,
        alice,
        bob,
        mallory,
    }
}

impl World {
    pub fn old(&self) -> Arc<InMemoryResourceLedger> {
        self.stockpile.ledger(&Address::from_low_u64(OLD_LEDGER)).unwrap()
    }

    pub fn new_ledger(&self) -> Arc<InMemoryResourceLedger> {
        self.stockpile.ledger(&Address::from_low_u64(NEW_LEDGER)).unwrap()
    }

    pub fn migration(&self) -> MigrationController {
        self.stockpile
            .open_migration(
                &self.admin,
                self.controller,
                storage_collection(),
                &Address::from_low_u64(OLD_LEDGER),
                &Address::from_low_u64(NEW_LEDGER),
            )
            .unwrap()
    }

    /// Credit through the registry as the operator
    pub fn fund(&self, token_id: u64, owner: &Address, resource: &ResourceType, amount: Amount) {
        self.stockpile
            .registry()
            .add_resource(
                &self.operator,
                &storage_collection(),
                TokenId(token_id),
                owner,
                resource,
                amount,
            )
            .unwrap();
    }

    /// Back crew primaries with a storage token on the current ledger, as
    /// the owner of both
    pub fn assign(&self, storage_token_id: u64, crew_ids: &[u64]) {
        for id in crew_ids {
            self.stockpile
                .registry()
                .assign_storage_to_primary(
                    &self.alice,
                    &storage_collection(),
                    crew(*id),
                    TokenId(storage_token_id),
                )
                .unwrap();
        }
    }
}
