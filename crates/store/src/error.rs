//! Store error types

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors from a single store write
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection could not be established
    #[error("connection failed to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Read or write on an established connection failed
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Operation did not complete within the socket timeout
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Server closed the connection before replying
    #[error("connection closed by server")]
    ConnectionClosed,

    /// Key cannot be sent with this protocol
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// Server answered but refused the write
    #[error("write rejected: {0}")]
    Rejected(String),

    /// Server answered with something that is not a known reply
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl StoreError {
    /// Whether the connection must be discarded after this error
    pub fn breaks_connection(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::Io(_)
                | Self::Timeout(_)
                | Self::ConnectionClosed
                | Self::UnexpectedResponse(_)
        )
    }

    /// Whether another attempt could succeed
    ///
    /// Transport failures and timeouts are transient. A key the protocol
    /// cannot carry, or a write the server explicitly refused, fails the
    /// same way every time.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidKey { .. } | Self::Rejected(_))
    }
}
