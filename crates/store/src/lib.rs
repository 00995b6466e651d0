//! Appsload - Key-value stores
//!
//! The writer pool talks to its destinations only through the
//! `KeyValueStore` capability. One store handle exists per shard selector
//! (device type); the `ShardMap` holding them is built once before any file
//! is processed and shared read-only by every worker.
//!
//! # Available Stores
//!
//! | Store | Purpose |
//! |-------|---------|
//! | `memcache` | memcached text protocol over TCP |
//!
//! # Example
//!
//! ```ignore
//! use appsload_store::{MemcacheConfig, ShardMap};
//! use std::time::Duration;
//!
//! let shards = ShardMap::memcache(
//!     [("idfa", "127.0.0.1:33013"), ("gaid", "127.0.0.1:33014")],
//!     Duration::from_secs(10),
//! );
//!
//! if let Some(store) = shards.get("idfa") {
//!     store.put("idfa:abc", b"payload").await?;
//! }
//! ```

mod error;
pub mod memcache;
mod shards;
mod traits;

pub use error::StoreError;
pub use memcache::{MemcacheConfig, MemcacheStore};
pub use shards::ShardMap;
pub use traits::KeyValueStore;

/// Maximum memcached key length in bytes
pub const MAX_KEY_LENGTH: usize = 250;
