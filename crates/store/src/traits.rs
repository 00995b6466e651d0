//! Store trait definition

use async_trait::async_trait;

use crate::error::StoreError;

/// SET-style key-value write capability
///
/// Implementations own their connection handling and socket timeouts,
/// which are fixed at construction. A single handle is shared by all
/// writer workers, so `put` takes `&self`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Human-readable endpoint for logging (e.g. "127.0.0.1:33013")
    fn endpoint(&self) -> &str;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}
