// SPDX-License-Identifier: Apache-2.0

use crate::{MeasurementStore, SqliteStore, StoreError, StoreErrorCode};
use seastore_core::config::{env_map, parse_map};
use seastore_core::ENV_SEASTORE_STORES;
use seastore_model::StoreAlias;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

const IN_MEMORY: &str = ":memory:";

/// Alias to SQLite location mapping, e.g. `SEASTORE_STORES=default=/data/a.db,canon=:memory:`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub stores: BTreeMap<StoreAlias, PathBuf>,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_pairs(env_map(ENV_SEASTORE_STORES))
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        Self::from_pairs(parse_map(raw))
    }

    fn from_pairs(pairs: BTreeMap<String, String>) -> Result<Self, StoreError> {
        let mut stores = BTreeMap::new();
        for (alias, path) in pairs {
            let alias = StoreAlias::parse(&alias)
                .map_err(|e| StoreError::new(StoreErrorCode::Validation, e.to_string()))?;
            stores.insert(alias, PathBuf::from(path));
        }
        Ok(Self { stores })
    }
}

/// Open measurement stores addressed by alias.
#[derive(Default)]
pub struct StoreRegistry {
    stores: BTreeMap<StoreAlias, Box<dyn MeasurementStore>>,
}

impl StoreRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut registry = Self::new();
        for (alias, path) in &config.stores {
            let store = if path.as_os_str() == IN_MEMORY {
                SqliteStore::open_in_memory(alias.clone())?
            } else {
                SqliteStore::open(alias.clone(), path)?
            };
            info!(alias = %alias, path = %path.display(), "opened measurement store");
            registry.insert(Box::new(store));
        }
        Ok(registry)
    }

    /// Adds a store under its own alias, replacing any previous one.
    pub fn insert(&mut self, store: Box<dyn MeasurementStore>) {
        self.stores.insert(store.alias().clone(), store);
    }

    pub fn get_mut(&mut self, alias: &StoreAlias) -> Result<&mut dyn MeasurementStore, StoreError> {
        match self.stores.get_mut(alias) {
            Some(store) => Ok(store.as_mut()),
            None => Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("no measurement store registered for alias `{alias}`"),
            )),
        }
    }

    #[must_use]
    pub fn aliases(&self) -> Vec<StoreAlias> {
        self.stores.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_invalid_alias() {
        let err = StoreConfig::parse("bad alias=/tmp/x.db").expect_err("invalid alias");
        assert_eq!(err.code, StoreErrorCode::Validation);
    }

    #[test]
    fn registry_opens_in_memory_stores() {
        let config = StoreConfig::parse("default=:memory:,canon=:memory:").expect("config");
        let mut registry = StoreRegistry::open(&config).expect("open");
        assert_eq!(registry.aliases().len(), 2);
        let canon = StoreAlias::parse("canon").expect("alias");
        assert_eq!(registry.get_mut(&canon).expect("store").alias(), &canon);
        let missing = StoreAlias::parse("other").expect("alias");
        assert_eq!(
            registry.get_mut(&missing).err().map(|e| e.code),
            Some(StoreErrorCode::NotFound)
        );
    }
}
