//! Appsload Protocol - Record types flowing through the ingestion pipeline
//!
//! This crate provides the foundational types shared by every stage:
//! - `InstallationRecord` - One device's installed apps and location
//! - `parse_line` - Typed TSV line parser with per-field error variants
//! - `BinaryCodec` - Record to compact payload conversion for the cache
//! - `ProtobufCodec` - Default codec producing `UserApps` protobuf bytes
//!
//! # Line Format
//!
//! ```text
//! deviceType<TAB>deviceId<TAB>latitude<TAB>longitude<TAB>appId1,appId2,...
//! ```
//!
//! Lines with the wrong field count or non-numeric coordinates are rejected.
//! App ids that do not parse as `u32` are dropped from the list without
//! rejecting the record.

mod codec;
mod error;
mod parse;
mod record;

pub use codec::{BinaryCodec, CacheEntry, ProtobufCodec, UserApps};
pub use error::{CodecError, ParseError};
pub use parse::{parse_app_ids, parse_line};
pub use record::InstallationRecord;

/// Number of TAB-separated fields in a valid line
pub const FIELD_COUNT: usize = 5;

/// Field separator within a line
pub const FIELD_SEPARATOR: char = '\t';

/// Separator between app ids in the last field
pub const APP_ID_SEPARATOR: char = ',';

/// Separator between device type and device id in cache keys
pub const KEY_SEPARATOR: char = ':';

#[cfg(test)]
mod parse_test;
