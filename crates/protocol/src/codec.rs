//! Binary codec for cache payloads
//!
//! Records are stored as a protobuf `UserApps` message:
//!
//! ```text
//! message UserApps {
//!     repeated uint32 apps = 1;
//!     optional double lat = 2;
//!     optional double lon = 3;
//! }
//! ```
//!
//! The message is declared by hand with `prost` derives, no build script.

use prost::Message;

use crate::error::CodecError;
use crate::record::InstallationRecord;

/// Stored payload: location plus installed apps
#[derive(Clone, PartialEq, Message)]
pub struct UserApps {
    /// Installed app ids
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub apps: Vec<u32>,

    /// Latitude
    #[prost(double, optional, tag = "2")]
    pub lat: Option<f64>,

    /// Longitude
    #[prost(double, optional, tag = "3")]
    pub lon: Option<f64>,
}

/// Key/value pair ready to be written to a store
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// `"<device_type>:<device_id>"`
    pub key: String,

    /// Codec-encoded payload
    pub value: Vec<u8>,
}

/// Converts records to and from compact binary payloads
///
/// Implementations must be cheap to share: a single codec instance is
/// used concurrently by every writer worker.
pub trait BinaryCodec: Send + Sync {
    /// Encode the location and app ids of a record
    fn encode(&self, record: &InstallationRecord) -> Vec<u8>;

    /// Decode a payload produced by `encode`
    fn decode(&self, payload: &[u8]) -> Result<UserApps, CodecError>;

    /// Build the cache entry (key and encoded value) for a record
    fn entry(&self, record: &InstallationRecord) -> CacheEntry {
        CacheEntry {
            key: record.key(),
            value: self.encode(record),
        }
    }
}

/// Protobuf codec compatible with the `UserApps` schema
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufCodec;

impl BinaryCodec for ProtobufCodec {
    fn encode(&self, record: &InstallationRecord) -> Vec<u8> {
        UserApps {
            apps: record.app_ids.clone(),
            lat: Some(record.latitude),
            lon: Some(record.longitude),
        }
        .encode_to_vec()
    }

    fn decode(&self, payload: &[u8]) -> Result<UserApps, CodecError> {
        Ok(UserApps::decode(payload)?)
    }
}
