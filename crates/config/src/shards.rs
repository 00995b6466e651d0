//! Shard configuration
//!
//! Maps each device type to the memcached address that stores it. When the
//! `[shards]` section is present it replaces the defaults entirely.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Default device types and their loopback addresses
pub const DEFAULT_SHARDS: &[(&str, &str)] = &[
    ("idfa", "127.0.0.1:33013"),
    ("gaid", "127.0.0.1:33014"),
    ("adid", "127.0.0.1:33015"),
    ("dvid", "127.0.0.1:33016"),
];

/// Device type to store address
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ShardsConfig(BTreeMap<String, String>);

impl Default for ShardsConfig {
    fn default() -> Self {
        Self(
            DEFAULT_SHARDS
                .iter()
                .map(|(selector, address)| (selector.to_string(), address.to_string()))
                .collect(),
        )
    }
}

impl ShardsConfig {
    /// Empty shard configuration
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Set or replace the address for a device type
    pub fn set(&mut self, selector: impl Into<String>, address: impl Into<String>) {
        self.0.insert(selector.into(), address.into());
    }

    /// Address for a device type
    pub fn get(&self, selector: &str) -> Option<&str> {
        self.0.get(selector).map(String::as_str)
    }

    /// Iterate `(device type, address)` pairs in selector order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(s, a)| (s.as_str(), a.as_str()))
    }

    /// Number of shards
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no shards are configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
