//! Field deserializers that map values of the wrong type to `None`

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::device::DeviceInfo;

pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64())
}

pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

pub fn device_info<'de, D>(deserializer: D) -> Result<Option<DeviceInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(Some(DeviceInfo::from(map))),
        _ => Ok(None),
    }
}
