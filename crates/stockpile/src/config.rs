// Configuration for a Stockpile deployment
//
// Loaded from TOML. Describes logging, the registry and the collections it
// routes, every ledger, and the per-call bounds of migrations.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use stockpile_ledger::LedgerConfig;
use stockpile_migration::MigrationConfig;
use stockpile_types::Address;

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `stockpile_migration=debug,info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// A collection and the ledger that initially serves it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRoute {
    pub collection: Address,
    pub ledger: Address,
}

/// Registry settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Address the registry forwards under
    #[serde(default)]
    pub address: Address,

    #[serde(default)]
    pub collections: Vec<CollectionRoute>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockpileConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub ledgers: Vec<LedgerConfig>,

    #[serde(default)]
    pub migration: MigrationConfig,
}

impl StockpileConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: StockpileConfig =
            toml::from_str(input).context("failed to parse stockpile configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        Self::from_toml_str(&input)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Look up a ledger by address
    pub fn ledger(&self, address: &Address) -> Option<&LedgerConfig> {
        self.ledgers.iter().find(|ledger| ledger.address == *address)
    }

    /// Check cross-field rules
    pub fn validate(&self) -> Result<()> {
        let mut addresses = BTreeSet::new();
        for ledger in &self.ledgers {
            ensure!(
                !ledger.domain.trim().is_empty(),
                "ledger {} has an empty domain",
                ledger.address
            );
            ensure!(
                addresses.insert(ledger.address),
                "duplicate ledger address {}",
                ledger.address
            );
            ensure!(
                ledger.policy.max_primaries() > 0,
                "ledger {} allows no primaries per storage token",
                ledger.address
            );
        }

        let mut collections = BTreeSet::new();
        for route in &self.registry.collections {
            ensure!(
                collections.insert(route.collection),
                "collection {} is routed more than once",
                route.collection
            );
            if !addresses.contains(&route.ledger) {
                bail!(
                    "collection {} routes to unknown ledger {}",
                    route.collection,
                    route.ledger
                );
            }
        }

        ensure!(
            self.migration.max_assignments_per_call != Some(0),
            "migration.max_assignments_per_call must be positive"
        );
        ensure!(
            self.migration.max_tokens_per_call != Some(0),
            "migration.max_tokens_per_call must be positive"
        );
        Ok(())
    }
}
