//! Outbound message payloads.
//!
//! Both message kinds share the envelope used across the event bus: a `key`
//! naming the originating service, a dotted `type` tag, and a millisecond
//! timestamp. History samples additionally carry a `data` map from field name
//! to value.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

/// Type tag of the service heartbeat.
pub const STATE_TYPE: &str = "Brewbee.state.service";

/// Type tag of a history sample.
pub const SAMPLE_TYPE: &str = "Brewbee.state";

/// Field name of the published temperature value.
pub const TEMPERATURE_FIELD: &str = "value[degC]";

/// Milliseconds since the Unix epoch.
pub fn time_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Service heartbeat, published to `<prefix>/state/<name>`.
#[derive(Debug, Clone, Serialize)]
pub struct StateMessage {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: i64,
}

impl StateMessage {
    pub fn new(name: &str) -> Self {
        StateMessage {
            key: name.to_string(),
            kind: STATE_TYPE.to_string(),
            timestamp: time_ms(),
        }
    }
}

/// Sensor sample, published to `<prefix>/history/<name>`.
#[derive(Debug, Clone, Serialize)]
pub struct SampleMessage {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: BTreeMap<String, f64>,
    pub timestamp: i64,
}

impl SampleMessage {
    pub fn new(name: &str, value: f64) -> Self {
        let mut data = BTreeMap::new();
        data.insert(TEMPERATURE_FIELD.to_string(), value);
        SampleMessage {
            key: name.to_string(),
            kind: SAMPLE_TYPE.to_string(),
            data,
            timestamp: time_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_message_shape() {
        let json = serde_json::to_value(StateMessage::new("fermenter-1")).unwrap();
        assert_eq!(json["key"], "fermenter-1");
        assert_eq!(json["type"], "Brewbee.state.service");
        assert!(json["timestamp"].as_i64().unwrap() > 0);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn sample_message_shape() {
        let json = serde_json::to_value(SampleMessage::new("fermenter-1", 20.5)).unwrap();
        assert_eq!(json["key"], "fermenter-1");
        assert_eq!(json["type"], "Brewbee.state");
        assert_eq!(json["data"]["value[degC]"], 20.5);
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn time_ms_is_plausible() {
        // 2020-01-01 in epoch milliseconds; a sanity lower bound.
        assert!(time_ms() > 1_577_836_800_000);
    }
}
