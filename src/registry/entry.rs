//! Tracker state and update types
//!
//! This module defines the per-tracker record stored in the registry and the
//! set of fields a publisher can change in one update.

use serde_json::Value;

use crate::device::{derive_device_name, DeviceInfo, UNKNOWN_DEVICE};

/// Last reported position and motion of a tracker
///
/// Written as a whole by every accepted update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Horizontal accuracy in meters
    pub accuracy: Option<f64>,
    /// Speed in meters per second
    pub speed: Option<f64>,
    /// Heading in degrees
    pub heading: Option<f64>,
    /// Publisher-supplied timestamp, relayed as-is
    pub timestamp: Option<Value>,
}

impl Location {
    /// Create a location with coordinates only
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Default::default()
        }
    }

    /// Set accuracy
    pub fn accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }

    /// Set speed
    pub fn speed(mut self, meters_per_sec: f64) -> Self {
        self.speed = Some(meters_per_sec);
        self
    }

    /// Set heading
    pub fn heading(mut self, degrees: f64) -> Self {
        self.heading = Some(degrees);
        self
    }

    /// Set timestamp
    pub fn timestamp(mut self, timestamp: impl Into<Value>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Both coordinates, if both are known
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

/// Fields carried by one location update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerUpdate {
    /// Replaces the stored location group
    pub location: Location,
    /// Replaces stored device info when present and non-empty
    pub device_info: Option<DeviceInfo>,
    /// Replaces stored alias when present
    pub alias: Option<String>,
}

impl TrackerUpdate {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            ..Default::default()
        }
    }

    pub fn device_info(mut self, info: DeviceInfo) -> Self {
        self.device_info = Some(info);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Latest known state of a tracker
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerState {
    pub location: Location,

    /// Number of accepted updates since the tracker was created
    pub update_count: u64,

    /// Last non-empty device metadata
    pub device_info: DeviceInfo,

    /// Label derived from `device_info`
    pub device_name: String,

    /// Display name chosen by the publisher
    pub alias: Option<String>,
}

impl TrackerState {
    /// Create an empty record
    pub fn new() -> Self {
        Self {
            location: Location::default(),
            update_count: 0,
            device_info: DeviceInfo::new(),
            device_name: UNKNOWN_DEVICE.to_string(),
            alias: None,
        }
    }

    /// Both coordinates, if both are known
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.location.coordinates()
    }

    /// Replace device info and recompute the device name
    ///
    /// Empty bags are ignored so previously known metadata is never erased.
    /// Returns whether the stored info changed.
    pub fn replace_device_info(&mut self, info: DeviceInfo) -> bool {
        if info.is_empty() {
            return false;
        }

        self.device_name = derive_device_name(&info);
        self.device_info = info;
        true
    }

    /// Merge an update into this record
    pub(super) fn apply(&mut self, update: TrackerUpdate) {
        self.location = update.location;

        if let Some(info) = update.device_info {
            self.replace_device_info(info);
        }

        if let Some(alias) = update.alias {
            self.alias = Some(alias);
        }

        self.update_count += 1;
    }
}

impl Default for TrackerState {
    fn default() -> Self {
        Self::new()
    }
}
