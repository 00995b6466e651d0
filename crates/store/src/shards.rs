//! Shard map - device type to store handle
//!
//! Built once at startup and never mutated afterwards, so workers share it
//! behind an `Arc` and read it without locking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::memcache::{MemcacheConfig, MemcacheStore};
use crate::traits::KeyValueStore;

/// Mapping from shard selector (device type) to store handle
#[derive(Clone, Default)]
pub struct ShardMap {
    stores: HashMap<String, Arc<dyn KeyValueStore>>,
}

impl ShardMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map of memcached stores sharing one socket timeout
    pub fn memcache<I, S, A>(addresses: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = (S, A)>,
        S: Into<String>,
        A: Into<String>,
    {
        let mut shards = Self::new();
        for (selector, address) in addresses {
            let config = MemcacheConfig::new(address).with_timeout(timeout);
            shards.insert(selector, Arc::new(MemcacheStore::new(config)));
        }
        shards
    }

    /// Register a store for a selector, replacing any previous one
    pub fn insert(&mut self, selector: impl Into<String>, store: Arc<dyn KeyValueStore>) {
        self.stores.insert(selector.into(), store);
    }

    /// Builder-style `insert`
    #[must_use]
    pub fn with(mut self, selector: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        self.insert(selector, store);
        self
    }

    /// Look up the store for a selector
    #[inline]
    pub fn get(&self, selector: &str) -> Option<&Arc<dyn KeyValueStore>> {
        self.stores.get(selector)
    }

    /// Number of configured shards
    #[inline]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Check if no shards are configured
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Configured selectors, sorted
    pub fn selectors(&self) -> Vec<&str> {
        let mut selectors: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        selectors.sort_unstable();
        selectors
    }
}

impl std::fmt::Debug for ShardMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for selector in self.selectors() {
            if let Some(store) = self.stores.get(selector) {
                map.entry(&selector, &store.endpoint());
            }
        }
        map.finish()
    }
}
