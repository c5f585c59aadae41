//! Per-entity registry of compiled piggy-backs.
//!
//! Lookups walk the entity's lineage (the entity followed by its ancestors)
//! and stop at the first type that owns a map. A type gets its own map on its
//! first registration, as a snapshot of the nearest ancestor's map; after that
//! the two evolve independently:
//!
//! - a subtype that never registered sees every later supertype declaration
//! - a subtype that did register no longer sees later supertype declarations
//! - subtype declarations never reach the supertype or sibling subtypes

use crate::error::{poisoned, PiggyBackError};
use crate::piggy_back::fragment::CompiledFragment;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type FragmentMap = HashMap<String, Arc<CompiledFragment>>;

/// Layered name → fragment registry, keyed by entity type
#[derive(Debug, Default)]
pub struct Registry {
    tables: RwLock<HashMap<String, FragmentMap>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `fragment` under `name` for `lineage[0]`.
    ///
    /// Returns the fragment previously registered under the same name on this
    /// type, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PiggyBackError::RegistryPoisoned`] if the lock is poisoned.
    pub fn register(
        &self,
        lineage: &[String],
        name: &str,
        fragment: CompiledFragment,
    ) -> Result<Option<Arc<CompiledFragment>>, PiggyBackError> {
        let Some(entity) = lineage.first() else {
            return Ok(None);
        };
        let mut tables = self.tables.write().map_err(poisoned)?;

        if !tables.contains_key(entity) {
            let snapshot = lineage[1..]
                .iter()
                .find_map(|ancestor| tables.get(ancestor))
                .cloned()
                .unwrap_or_default();
            log::debug!(
                "materializing piggy back map for {entity} ({} inherited)",
                snapshot.len()
            );
            tables.insert(entity.clone(), snapshot);
        }

        let own = tables.entry(entity.clone()).or_default();
        Ok(own.insert(name.to_string(), Arc::new(fragment)))
    }

    /// Resolve `name` for `lineage[0]`.
    ///
    /// # Errors
    ///
    /// - [`PiggyBackError::UnknownPiggyBack`] if the name is not in the effective map
    /// - [`PiggyBackError::RegistryPoisoned`] if the lock is poisoned
    pub fn resolve(
        &self,
        lineage: &[String],
        name: &str,
    ) -> Result<Arc<CompiledFragment>, PiggyBackError> {
        let tables = self.tables.read().map_err(poisoned)?;
        lineage
            .iter()
            .find_map(|entity| tables.get(entity))
            .and_then(|map| map.get(name))
            .cloned()
            .ok_or_else(|| PiggyBackError::UnknownPiggyBack {
                entity: lineage.first().cloned().unwrap_or_default(),
                name: name.to_string(),
            })
    }

    /// Effective piggy-back names for `lineage[0]`, sorted
    pub fn names(&self, lineage: &[String]) -> Result<Vec<String>, PiggyBackError> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut names: Vec<String> = lineage
            .iter()
            .find_map(|entity| tables.get(entity))
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    /// Whether `entity` owns a map (has diverged from its ancestors)
    pub fn has_own_map(&self, entity: &str) -> Result<bool, PiggyBackError> {
        Ok(self.tables.read().map_err(poisoned)?.contains_key(entity))
    }
}
