//! Registry service - name to provider lookup and capability discovery
//!
//! One registry is built at startup and shared by `Arc`; tests build a
//! fresh one each so they stay isolated.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::ports::DataSource;

/// Registry of named data providers
#[derive(Default)]
pub struct DataSourceRegistry {
    providers: RwLock<BTreeMap<String, Arc<dyn DataSource>>>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous one
    pub fn register(&self, provider: Arc<dyn DataSource>) {
        let name = provider.name().to_string();
        self.register_as(&name, provider);
    }

    /// Register a provider under an explicit name, replacing any previous one
    pub fn register_as(&self, name: &str, provider: Arc<dyn DataSource>) {
        let replaced = self.write().insert(name.to_string(), provider).is_some();
        info!(provider = name, replaced, "Registered data source");
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DataSource>> {
        self.read().get(name).cloned()
    }

    /// Snapshot of every registered provider, ordered by name
    pub fn get_all(&self) -> Vec<(String, Arc<dyn DataSource>)> {
        self.read()
            .iter()
            .map(|(name, provider)| (name.clone(), Arc::clone(provider)))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Providers that support `indicator` and are available right now
    ///
    /// Calls `is_available()` on every candidate, which may hit the network
    /// for remote providers. Do not call this in a tight loop.
    pub fn get_for_indicator(&self, indicator: &str) -> Vec<Arc<dyn DataSource>> {
        // Snapshot first so availability probes run without holding the lock
        let candidates: Vec<Arc<dyn DataSource>> = self
            .read()
            .values()
            .filter(|p| p.supports_indicator(indicator))
            .cloned()
            .collect();

        candidates
            .into_iter()
            .filter(|p| {
                let available = p.is_available();
                debug!(provider = p.name(), indicator, available, "Availability check");
                available
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove every provider
    pub fn clear(&self) {
        self.write().clear();
    }

    // The map is always left consistent, so a poisoned lock is recovered
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<dyn DataSource>>> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<dyn DataSource>>> {
        self.providers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
