//! Protocol error types
//!
//! Errors that can occur when parsing input lines or decoding payloads.

use std::num::ParseFloatError;

use thiserror::Error;

/// Reasons a line cannot become an `InstallationRecord`
///
/// Each variant names the check that failed so rejected lines can be
/// logged and audited without re-parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Line does not split into the expected number of fields
    #[error("expected {expected} tab-separated fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    /// Third field is not a floating-point number
    #[error("invalid latitude '{value}': {source}")]
    Latitude {
        value: String,
        #[source]
        source: ParseFloatError,
    },

    /// Fourth field is not a floating-point number
    #[error("invalid longitude '{value}': {source}")]
    Longitude {
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

impl ParseError {
    /// Create a field count error
    #[inline]
    pub fn field_count(actual: usize) -> Self {
        Self::FieldCount {
            expected: crate::FIELD_COUNT,
            actual,
        }
    }

    /// Short name of the failed check, for structured logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FieldCount { .. } => "field_count",
            Self::Latitude { .. } => "latitude",
            Self::Longitude { .. } => "longitude",
        }
    }
}

/// Errors from decoding a cache payload
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload is not a valid `UserApps` message
    #[error("invalid payload: {0}")]
    Decode(#[from] prost::DecodeError),
}
