//! # Telemetry module
//!
//! Raw telemetry records as served by the rover's web server. Depending on where the server sourced
//! its data (live MQTT telemetry or the CSV log) sensor fields are reported either with a unit
//! suffix (`temperature_c`) or under a legacy bare name (`temperature`), so both are kept here.
//! Choosing between them is left to the consumer.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Body of a `GET /api/data` response.
///
/// Every field is optional. An absent sensor field means there was no reading this cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataRecord {
    pub power: Option<bool>,
    pub mode: Option<String>,
    pub last_seen: Option<String>,

    pub forward_distance_cm: Option<RawValue>,
    pub forward_distance: Option<RawValue>,

    pub temperature_c: Option<RawValue>,
    pub temperature: Option<RawValue>,

    pub humidity_percent: Option<RawValue>,
    pub humidity: Option<RawValue>,

    pub air_quality_raw: Option<RawValue>,
    pub air_quality: Option<RawValue>,
}

/// Body of a `GET /api/history` response.
///
/// Series are index-aligned with `labels`, which hold the sample timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRecord {
    pub labels: Vec<String>,

    pub temperature_c: Option<Vec<f64>>,
    pub temperature: Option<Vec<f64>>,

    pub humidity_percent: Option<Vec<f64>>,
    pub humidity: Option<Vec<f64>>,

    pub air_quality_raw: Option<Vec<f64>>,
    pub air_quality: Option<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A sensor value as it appears on the wire.
///
/// CSV-sourced data occasionally arrives as strings, so both numbers and text are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RawValue {
    /// Numeric interpretation of the value, or `None` if it is text that doesn't parse.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_suffixed_record() {
        let rec: DataRecord = serde_json::from_str(
            r#"{
                "power": true,
                "mode": "manual",
                "last_seen": "2024-05-01 12:00:00 UTC",
                "forward_distance_cm": 120.5,
                "temperature_c": 23.61,
                "humidity_percent": 48.2,
                "air_quality_raw": 31000
            }"#,
        )
        .unwrap();

        assert_eq!(rec.power, Some(true));
        assert_eq!(rec.mode.as_deref(), Some("manual"));
        assert_eq!(rec.forward_distance_cm, Some(RawValue::Number(120.5)));
        assert_eq!(rec.air_quality_raw.and_then(|v| v.as_f64()), Some(31000.0));
        assert_eq!(rec.temperature, None);
    }

    #[test]
    fn test_parse_legacy_record_with_nulls_and_text() {
        let rec: DataRecord = serde_json::from_str(
            r#"{"power": false, "last_seen": null, "temperature": "23.6", "air_quality": 16384}"#,
        )
        .unwrap();

        assert_eq!(rec.last_seen, None);
        assert_eq!(rec.mode, None);
        assert_eq!(rec.temperature.unwrap().as_f64(), Some(23.6));
        assert_eq!(rec.air_quality, Some(RawValue::Number(16384.0)));
    }

    #[test]
    fn test_raw_value_display_matches_wire() {
        assert_eq!(RawValue::Number(120.0).to_string(), "120");
        assert_eq!(RawValue::Number(120.5).to_string(), "120.5");
        assert_eq!(RawValue::Text("n/a".into()).to_string(), "n/a");
        assert_eq!(RawValue::Text("n/a".into()).as_f64(), None);
    }

    #[test]
    fn test_parse_history() {
        let rec: HistoryRecord = serde_json::from_str(
            r#"{"labels": ["10:00", "10:01"], "temperature": [22.0, 22.5], "air_quality_raw": [32000, 32100]}"#,
        )
        .unwrap();

        assert_eq!(rec.labels.len(), 2);
        assert_eq!(rec.temperature_c, None);
        assert_eq!(rec.temperature, Some(vec![22.0, 22.5]));
        assert_eq!(rec.humidity_percent, None);
    }
}
