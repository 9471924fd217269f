//! Opaque device metadata bag

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Device metadata supplied by a publisher
///
/// Arbitrary JSON object. Only `userAgent` and `platform` are interpreted;
/// everything else is relayed unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceInfo(Map<String, Value>);

impl DeviceInfo {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// The `userAgent` string, or "" when missing or not a string
    pub fn user_agent(&self) -> &str {
        self.str_field("userAgent")
    }

    /// The `platform` string, or "" when missing or not a string
    pub fn platform(&self) -> &str {
        self.str_field("platform")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn str_field(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

impl From<Map<String, Value>> for DeviceInfo {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_accessors() {
        let info = DeviceInfo::new()
            .with("userAgent", "Mozilla/5.0 (iPhone)")
            .with("platform", "iPhone")
            .with("cores", 6);

        assert_eq!(info.user_agent(), "Mozilla/5.0 (iPhone)");
        assert_eq!(info.platform(), "iPhone");
        assert_eq!(info.get("cores"), Some(&json!(6)));
        assert_eq!(info.len(), 3);
    }

    #[test]
    fn test_non_string_fields_read_as_empty() {
        let info: DeviceInfo = serde_json::from_value(json!({
            "userAgent": 42,
            "platform": null,
        }))
        .unwrap();

        assert_eq!(info.user_agent(), "");
        assert_eq!(info.platform(), "");
        assert!(!info.is_empty());
    }

    #[test]
    fn test_serializes_transparently() {
        let info = DeviceInfo::new().with("timeZone", "Europe/Berlin");
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value, json!({ "timeZone": "Europe/Berlin" }));
    }
}
