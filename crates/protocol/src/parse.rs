//! TSV line parser
//!
//! Converts one input line into an `InstallationRecord`. Only the field
//! count and the two coordinates can reject a line; malformed app ids are
//! skipped individually.

use crate::error::ParseError;
use crate::record::InstallationRecord;
use crate::{APP_ID_SEPARATOR, FIELD_SEPARATOR};

/// Parse a single line (without its trailing newline)
///
/// # Errors
///
/// Returns `ParseError::FieldCount` unless the line has exactly five
/// TAB-separated fields, and `ParseError::Latitude` / `ParseError::Longitude`
/// when a coordinate is not a valid `f64`.
pub fn parse_line(line: &str) -> Result<InstallationRecord, ParseError> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    let &[device_type, device_id, raw_lat, raw_lon, raw_apps] = fields.as_slice() else {
        return Err(ParseError::field_count(fields.len()));
    };

    let latitude = raw_lat
        .parse::<f64>()
        .map_err(|source| ParseError::Latitude {
            value: raw_lat.to_string(),
            source,
        })?;

    let longitude = raw_lon
        .parse::<f64>()
        .map_err(|source| ParseError::Longitude {
            value: raw_lon.to_string(),
            source,
        })?;

    Ok(InstallationRecord::new(
        device_type,
        device_id,
        latitude,
        longitude,
        parse_app_ids(raw_apps),
    ))
}

/// Parse a comma-separated app id list, skipping entries that are not `u32`
pub fn parse_app_ids(raw: &str) -> Vec<u32> {
    raw.split(APP_ID_SEPARATOR)
        .filter_map(|entry| entry.parse::<u32>().ok())
        .collect()
}
