// Deployment wiring
//
// Builds the ledgers and the registry described by a `StockpileConfig`
// against a set of collaborators, and opens migrations between them.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use stockpile_ledger::InMemoryResourceLedger;
use stockpile_migration::{MigrationController, MigrationTarget};
use stockpile_registry::{MigratorGrant, StorageRegistry};
use stockpile_types::{Address, Collaborators};
use tracing::info;

use crate::config::StockpileConfig;

/// A running set of ledgers behind one registry
#[derive(Debug)]
pub struct Stockpile {
    config: StockpileConfig,
    collaborators: Collaborators,
    registry: Arc<StorageRegistry>,
    ledgers: BTreeMap<Address, Arc<InMemoryResourceLedger>>,
}

impl Stockpile {
    /// Build every configured ledger and route the configured collections.
    ///
    /// `admin` must hold the admin role, since routing a collection is an
    /// admin operation.
    pub fn from_config(
        config: StockpileConfig,
        collaborators: Collaborators,
        admin: &Address,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(StorageRegistry::new(
            config.registry.address,
            collaborators.clone(),
        ));
        let ledgers: BTreeMap<_, _> = config
            .ledgers
            .iter()
            .map(|ledger| {
                (
                    ledger.address,
                    Arc::new(InMemoryResourceLedger::new(ledger.clone(), collaborators.clone())),
                )
            })
            .collect();

        for route in &config.registry.collections {
            let ledger = ledgers
                .get(&route.ledger)
                .cloned()
                .ok_or_else(|| anyhow!("unknown ledger {}", route.ledger))?;
            registry
                .add_storage_contract(admin, route.collection, ledger)
                .with_context(|| format!("failed to route collection {}", route.collection))?;
        }

        info!(
            registry = %config.registry.address,
            ledgers = ledgers.len(),
            collections = config.registry.collections.len(),
            "Stockpile assembled"
        );
        Ok(Self {
            config,
            collaborators,
            registry,
            ledgers,
        })
    }

    pub fn config(&self) -> &StockpileConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<StorageRegistry> {
        &self.registry
    }

    pub fn ledger(&self, address: &Address) -> Option<Arc<InMemoryResourceLedger>> {
        self.ledgers.get(address).cloned()
    }

    /// Open a migration of `collection` between two configured ledgers,
    /// bounded by the `[migration]` settings, and register `controller` as
    /// the only address allowed to repoint the collection.
    ///
    /// `admin` must hold the admin role.
    pub fn open_migration(
        &self,
        admin: &Address,
        controller: Address,
        collection: Address,
        old_ledger: &Address,
        new_ledger: &Address,
    ) -> Result<MigrationController> {
        let old = self
            .ledger(old_ledger)
            .ok_or_else(|| anyhow!("unknown ledger {}", old_ledger))?;
        let new = self
            .ledger(new_ledger)
            .ok_or_else(|| anyhow!("unknown ledger {}", new_ledger))?;

        let migration = MigrationController::new(
            controller,
            MigrationTarget::new(collection, old, new),
            Arc::clone(&self.registry),
            self.collaborators.clone(),
            self.config.migration,
        )
        .with_context(|| format!("cannot migrate {} from {} to {}", collection, old_ledger, new_ledger))?;

        self.registry
            .register_migrator(
                admin,
                collection,
                MigratorGrant::new(controller, *old_ledger, *new_ledger),
            )
            .with_context(|| format!("cannot register migrator {} for {}", controller, collection))?;
        Ok(migration)
    }
}
