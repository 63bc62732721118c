use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable sensor data fact: never updated after creation, only read
/// and aggregated. Ownership is derived transitively from the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub device_id: String,
    pub field_name: String,
    pub sensor_name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Input row for persisting one decoded field of an accepted reading
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub device_id: String,
    pub field_name: String,
    pub sensor_name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Column projection returned by windowed historical queries.
///
/// Deliberately narrower than [`SensorReading`]: high-volume queries
/// select only the columns the grouping layer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRow {
    pub device_id: String,
    pub sensor_name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Input for a tenant-scoped, time-windowed historical query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryWindowInput {
    pub device_ids: Vec<String>,
    pub sensor_names: Vec<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Input for fetching the latest row per (device, sensor) pair, used to
/// build initial snapshots for fresh subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestReadingsInput {
    pub device_ids: Vec<String>,
}
