//! Inbound events

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::DeviceInfo;
use crate::registry::{Location, TrackerId, TrackerUpdate};

use super::lenient;

/// Event sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    /// Subscribe to a tracker's channel
    #[serde(rename = "join_tracker")]
    JoinTracker(JoinTracker),
    /// Publish a location sample
    #[serde(rename = "update_location")]
    UpdateLocation(UpdateLocation),
}

impl InboundEvent {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::JoinTracker(_) => "join_tracker",
            InboundEvent::UpdateLocation(_) => "update_location",
        }
    }
}

/// `join_tracker` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinTracker {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tracker_id: Option<String>,

    #[serde(
        rename = "deviceInfo",
        default,
        deserialize_with = "lenient::device_info",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_info: Option<DeviceInfo>,
}

impl JoinTracker {
    pub fn new(tracker_id: impl Into<String>) -> Self {
        Self {
            tracker_id: Some(tracker_id.into()),
            device_info: None,
        }
    }

    pub fn device_info(mut self, info: DeviceInfo) -> Self {
        self.device_info = Some(info);
        self
    }

    /// Split into a validated tracker id and the optional device info
    ///
    /// Returns `None` when the tracker id is missing or empty.
    pub fn into_parts(self) -> Option<(TrackerId, Option<DeviceInfo>)> {
        let id = TrackerId::new(self.tracker_id?)?;
        Some((id, self.device_info))
    }
}

/// `update_location` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateLocation {
    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tracker_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,

    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,

    #[serde(
        rename = "deviceInfo",
        default,
        deserialize_with = "lenient::device_info",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_info: Option<DeviceInfo>,

    #[serde(
        default,
        deserialize_with = "lenient::string",
        skip_serializing_if = "Option::is_none"
    )]
    pub alias: Option<String>,
}

impl UpdateLocation {
    pub fn new(tracker_id: impl Into<String>) -> Self {
        Self {
            tracker_id: Some(tracker_id.into()),
            ..Default::default()
        }
    }

    /// Set both coordinates
    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    pub fn accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }

    pub fn speed(mut self, meters_per_sec: f64) -> Self {
        self.speed = Some(meters_per_sec);
        self
    }

    pub fn heading(mut self, degrees: f64) -> Self {
        self.heading = Some(degrees);
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<Value>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn device_info(mut self, info: DeviceInfo) -> Self {
        self.device_info = Some(info);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Split into a validated tracker id and the registry update
    ///
    /// Returns `None` when the tracker id is missing or empty. An empty
    /// alias is treated as omitted.
    pub fn into_parts(self) -> Option<(TrackerId, TrackerUpdate)> {
        let id = TrackerId::new(self.tracker_id?)?;

        let update = TrackerUpdate {
            location: Location {
                latitude: self.lat,
                longitude: self.lng,
                accuracy: self.accuracy,
                speed: self.speed,
                heading: self.heading,
                timestamp: self.timestamp,
            },
            device_info: self.device_info,
            alias: self.alias.filter(|alias| !alias.is_empty()),
        };

        Some((id, update))
    }
}
