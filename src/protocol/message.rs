//! Outbound notifications

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::device::DeviceInfo;
use crate::registry::{TrackerId, TrackerState};

/// Event sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "location_update")]
    LocationUpdate(LocationUpdate),
}

impl OutboundEvent {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::LocationUpdate(_) => "location_update",
        }
    }
}

/// `location_update` payload
///
/// The join reply carries position, accuracy and device fields only. The
/// broadcast snapshot adds [`SnapshotDetails`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub tracker_id: String,
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub device_info: DeviceInfo,
    /// Derived device name
    pub platform: String,
    #[serde(
        flatten,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "snapshot_details"
    )]
    pub details: Option<SnapshotDetails>,
}

/// Fields only present in broadcast snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDetails {
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub timestamp: Option<Value>,
    pub alias: Option<String>,
}

impl SnapshotDetails {
    const KEYS: [&'static str; 4] = ["speed", "heading", "timestamp", "alias"];
}

/// Join replies carry none of the detail keys; snapshots carry all of them
fn snapshot_details<'de, D>(deserializer: D) -> Result<Option<SnapshotDetails>, D::Error>
where
    D: Deserializer<'de>,
{
    let rest = Map::<String, Value>::deserialize(deserializer)?;
    if !SnapshotDetails::KEYS.iter().any(|key| rest.contains_key(*key)) {
        return Ok(None);
    }

    SnapshotDetails::deserialize(Value::Object(rest))
        .map(Some)
        .map_err(D::Error::custom)
}

impl LocationUpdate {
    /// Reply sent to a connection joining `id`
    ///
    /// `None` until the tracker has both coordinates.
    pub fn join_reply(id: &TrackerId, state: &TrackerState) -> Option<Self> {
        let (lat, lng) = state.coordinates()?;

        Some(Self {
            tracker_id: id.to_string(),
            lat,
            lng,
            accuracy: state.location.accuracy,
            device_info: state.device_info.clone(),
            platform: state.device_name.clone(),
            details: None,
        })
    }

    /// Full snapshot broadcast to the channel of `id`
    ///
    /// `None` until the tracker has both coordinates.
    pub fn snapshot(id: &TrackerId, state: &TrackerState) -> Option<Self> {
        let mut update = Self::join_reply(id, state)?;
        update.details = Some(SnapshotDetails {
            speed: state.location.speed,
            heading: state.location.heading,
            timestamp: state.location.timestamp.clone(),
            alias: state.alias.clone(),
        });
        Some(update)
    }
}

impl From<LocationUpdate> for OutboundEvent {
    fn from(update: LocationUpdate) -> Self {
        OutboundEvent::LocationUpdate(update)
    }
}
