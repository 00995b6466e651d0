//! Memcache Store - memcached text protocol client
//!
//! Writes records to one memcached shard using the `set` command.
//!
//! # Protocol
//!
//! ```text
//! set <key> 0 0 <bytes>\r\n
//! <data block>\r\n
//! ```
//!
//! The server answers `STORED\r\n` on success. `NOT_STORED`, `ERROR`,
//! `CLIENT_ERROR ...` and `SERVER_ERROR ...` are reported as rejections.
//!
//! # Connection Handling
//!
//! Each store keeps a small free-list of idle connections. A write takes an
//! idle connection or opens a new one, so concurrent writers to the same
//! shard each get their own socket. After a clean exchange the connection
//! goes back to the free-list (up to `max_idle`, extra ones are closed).
//! Any transport failure or timeout discards the connection. The socket
//! timeout applies to connecting and to each complete set/reply exchange.
//!
//! # Example
//!
//! ```ignore
//! let store = MemcacheStore::new(MemcacheConfig::new("127.0.0.1:33013"));
//! store.put("idfa:abc", &payload).await?;
//! ```

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::MAX_KEY_LENGTH;
use crate::error::StoreError;
use crate::traits::KeyValueStore;

/// Default socket timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of idle connections kept per shard
pub const DEFAULT_MAX_IDLE: usize = 4;

/// Configuration for a memcached shard
#[derive(Debug, Clone)]
pub struct MemcacheConfig {
    /// Server address (host:port)
    pub address: String,

    /// Socket timeout for connect and for each set/reply exchange
    pub timeout: Duration,

    /// Idle connections kept for reuse
    pub max_idle: usize,
}

impl MemcacheConfig {
    /// Create a config with the default timeout
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }

    /// Set socket timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the idle connection limit
    #[must_use]
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }
}

/// memcached shard client
pub struct MemcacheStore {
    config: MemcacheConfig,

    /// Idle connections ready for the next write
    idle: Mutex<Vec<BufStream<TcpStream>>>,
}

impl MemcacheStore {
    /// Create a new store; no connection is made until the first write
    pub fn new(config: MemcacheConfig) -> Self {
        Self {
            config,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Get the store configuration
    pub fn config(&self) -> &MemcacheConfig {
        &self.config
    }

    /// Number of connections currently idle
    pub async fn idle_connections(&self) -> usize {
        self.idle.lock().await.len()
    }

    /// Take an idle connection or open a new one
    async fn checkout(&self) -> Result<BufStream<TcpStream>, StoreError> {
        let idle = self.idle.lock().await.pop();
        match idle {
            Some(stream) => Ok(stream),
            None => self.connect().await,
        }
    }

    /// Return a healthy connection to the free-list
    async fn checkin(&self, stream: BufStream<TcpStream>) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.config.max_idle {
            idle.push(stream);
        }
    }

    /// Open a new connection to the server
    async fn connect(&self) -> Result<BufStream<TcpStream>, StoreError> {
        let stream = match timeout(self.config.timeout, TcpStream::connect(&self.config.address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(StoreError::Connect {
                    address: self.config.address.clone(),
                    source: e,
                });
            }
            Err(_) => {
                return Err(StoreError::Connect {
                    address: self.config.address.clone(),
                    source: std::io::Error::new(ErrorKind::TimedOut, "connection timed out"),
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(
                address = %self.config.address,
                error = %e,
                "failed to set TCP_NODELAY, continuing with default buffering"
            );
        }

        tracing::debug!(address = %self.config.address, "connected to memcached");
        Ok(BufStream::new(stream))
    }
}

#[async_trait]
impl KeyValueStore for MemcacheStore {
    fn endpoint(&self) -> &str {
        &self.config.address
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;

        let mut stream = self.checkout().await?;
        let result = match timeout(self.config.timeout, send_set(&mut stream, key, value)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.config.timeout)),
        };

        match &result {
            Err(e) if e.breaks_connection() => {}
            _ => self.checkin(stream).await,
        }
        result
    }
}

impl std::fmt::Debug for MemcacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcacheStore")
            .field("address", &self.config.address)
            .field("timeout", &self.config.timeout)
            .field("max_idle", &self.config.max_idle)
            .finish()
    }
}

/// Send one `set` command and read the reply
async fn send_set(
    stream: &mut BufStream<TcpStream>,
    key: &str,
    value: &[u8],
) -> Result<(), StoreError> {
    let header = format!("set {} 0 0 {}\r\n", key, value.len());
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(value).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await?;

    let mut reply = String::new();
    if stream.read_line(&mut reply).await? == 0 {
        return Err(StoreError::ConnectionClosed);
    }

    parse_reply(reply.trim_end_matches(['\r', '\n']))
}

/// Interpret a storage command reply line
fn parse_reply(reply: &str) -> Result<(), StoreError> {
    match reply {
        "STORED" => Ok(()),
        "NOT_STORED" | "EXISTS" | "NOT_FOUND" | "ERROR" => Err(StoreError::Rejected(reply.to_string())),
        other if other.starts_with("CLIENT_ERROR") || other.starts_with("SERVER_ERROR") => {
            Err(StoreError::Rejected(other.to_string()))
        }
        other => Err(StoreError::UnexpectedResponse(other.to_string())),
    }
}

/// Check a key against memcached text protocol limits
fn validate_key(key: &str) -> Result<(), StoreError> {
    let reason = if key.is_empty() {
        "empty"
    } else if key.len() > MAX_KEY_LENGTH {
        "longer than 250 bytes"
    } else if key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        "contains whitespace or control characters"
    } else {
        return Ok(());
    };

    Err(StoreError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}
