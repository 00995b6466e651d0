//! Installation record - the unit of work in the pipeline

use crate::KEY_SEPARATOR;

/// One device's installed-app set and geolocation
///
/// Produced by exactly one parser invocation and consumed by exactly one
/// writer worker. `device_type` doubles as the shard selector; it is not
/// validated here, an unknown value is a dispatch failure in the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationRecord {
    /// Device identifier family (idfa, gaid, adid, dvid, ...)
    pub device_type: String,

    /// Opaque device identifier
    pub device_id: String,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Installed app ids in input order, duplicates allowed
    pub app_ids: Vec<u32>,
}

impl InstallationRecord {
    /// Create a new record
    pub fn new(
        device_type: impl Into<String>,
        device_id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        app_ids: Vec<u32>,
    ) -> Self {
        Self {
            device_type: device_type.into(),
            device_id: device_id.into(),
            latitude,
            longitude,
            app_ids,
        }
    }

    /// Cache key for this record: `"<device_type>:<device_id>"`
    pub fn key(&self) -> String {
        let mut key = String::with_capacity(self.device_type.len() + self.device_id.len() + 1);
        key.push_str(&self.device_type);
        key.push(KEY_SEPARATOR);
        key.push_str(&self.device_id);
        key
    }

    /// Shard selector used to pick the target store
    #[inline]
    pub fn shard(&self) -> &str {
        &self.device_type
    }
}
