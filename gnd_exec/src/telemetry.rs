//! # Telemetry Normaliser
//!
//! Maps the server's raw records onto canonical sensor readings. Each sensor can be reported under
//! a unit-suffixed key or a legacy bare key, the suffixed one is preferred. A reading missing
//! under both keys is `None`, which downstream means "no reading this cycle" rather than zero.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

use comms_if::tm::{DataRecord, HistoryRecord, RawValue};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Conversion from raw air quality ADC counts to parts per million.
///
/// `ppm = round(raw / max_raw * ppm_scale)`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AirQualityScale {
    pub max_raw: f64,
    pub ppm_scale: f64,
}

/// An air quality reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQuality {
    /// The raw ADC reading, as reported.
    pub raw: RawValue,

    /// The derived concentration.
    ///
    /// Units: parts per million
    pub ppm: i64,
}

/// Canonical sensor readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorReadings {
    /// Distance to the nearest obstacle ahead, as reported.
    ///
    /// Units: centimeters
    pub forward_distance_cm: Option<RawValue>,

    /// Units: degrees celsius
    pub temperature_c: Option<f64>,

    /// Units: percent relative humidity
    pub humidity_percent: Option<f64>,

    pub air_quality: Option<AirQuality>,
}

/// A normalised telemetry snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub power: bool,
    pub mode: Option<String>,
    pub last_seen: Option<String>,
    pub readings: SensorReadings,
}

/// A normalised history, every series index-aligned with `labels`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySeries {
    pub labels: Vec<String>,
    pub temperature_c: Vec<f64>,
    pub humidity_percent: Vec<f64>,
    pub air_quality_raw: Vec<f64>,
}

/// Minimum, maximum and latest value of a series.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub min: f64,
    pub max: f64,
    pub latest: f64,
}

/// Telemetry normaliser.
#[derive(Debug, Copy, Clone)]
pub struct Normaliser {
    pub scale: AirQualityScale,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AirQualityScale {
    pub fn to_ppm(&self, raw: f64) -> i64 {
        ((raw / self.max_raw) * self.ppm_scale).round() as i64
    }
}

impl Default for AirQualityScale {
    /// ADS1115 single-ended full scale.
    fn default() -> Self {
        Self {
            max_raw: 32767.0,
            ppm_scale: 1000.0,
        }
    }
}

impl SensorReadings {
    /// Overwrite the readings present in `newer`, keeping the last known value of the others.
    pub fn merge(&mut self, newer: &SensorReadings) {
        if newer.forward_distance_cm.is_some() {
            self.forward_distance_cm = newer.forward_distance_cm.clone();
        }
        if newer.temperature_c.is_some() {
            self.temperature_c = newer.temperature_c;
        }
        if newer.humidity_percent.is_some() {
            self.humidity_percent = newer.humidity_percent;
        }
        if newer.air_quality.is_some() {
            self.air_quality = newer.air_quality.clone();
        }
    }
}

impl Normaliser {
    pub fn new(scale: AirQualityScale) -> Self {
        Self { scale }
    }

    /// Normalise a `/api/data` record.
    ///
    /// Temperature, humidity and air quality must be numeric, unparseable text counts as no
    /// reading. Distance is kept as reported.
    pub fn snapshot(&self, rec: &DataRecord) -> TelemetrySnapshot {
        let air_quality = prefer(&rec.air_quality_raw, &rec.air_quality).and_then(|raw| {
            raw.as_f64().map(|n| AirQuality {
                raw: raw.clone(),
                ppm: self.scale.to_ppm(n),
            })
        });

        TelemetrySnapshot {
            power: rec.power.unwrap_or(false),
            mode: rec.mode.clone().filter(|m| !m.is_empty()),
            last_seen: rec.last_seen.clone().filter(|s| !s.is_empty()),
            readings: SensorReadings {
                forward_distance_cm: prefer(&rec.forward_distance_cm, &rec.forward_distance)
                    .cloned(),
                temperature_c: prefer(&rec.temperature_c, &rec.temperature)
                    .and_then(RawValue::as_f64),
                humidity_percent: prefer(&rec.humidity_percent, &rec.humidity)
                    .and_then(RawValue::as_f64),
                air_quality,
            },
        }
    }

    /// Normalise a `/api/history` record.
    ///
    /// Series longer than `labels` are truncated, a series missing under both keys is empty.
    pub fn history(&self, rec: &HistoryRecord) -> HistorySeries {
        let n = rec.labels.len();
        let series = |suffixed: &Option<Vec<f64>>, legacy: &Option<Vec<f64>>| {
            prefer(suffixed, legacy)
                .map(|v| v.iter().take(n).copied().collect::<Vec<f64>>())
                .unwrap_or_default()
        };

        HistorySeries {
            labels: rec.labels.clone(),
            temperature_c: series(&rec.temperature_c, &rec.temperature),
            humidity_percent: series(&rec.humidity_percent, &rec.humidity),
            air_quality_raw: series(&rec.air_quality_raw, &rec.air_quality),
        }
    }
}

impl Default for Normaliser {
    fn default() -> Self {
        Self::new(AirQualityScale::default())
    }
}

impl SeriesStats {
    /// Statistics of a series, `None` if it is empty.
    pub fn of(series: &[f64]) -> Option<Self> {
        let latest = *series.last()?;

        Some(series.iter().fold(
            Self {
                min: latest,
                max: latest,
                latest,
            },
            |s, v| Self {
                min: s.min.min(*v),
                max: s.max.max(*v),
                latest,
            },
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Pick the suffixed field if present, otherwise the legacy one.
fn prefer<'a, T>(suffixed: &'a Option<T>, legacy: &'a Option<T>) -> Option<&'a T> {
    suffixed.as_ref().or_else(|| legacy.as_ref())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ppm_conversion() {
        let scale = AirQualityScale::default();
        assert_eq!(scale.to_ppm(16384.0), 500);
        assert_eq!(scale.to_ppm(32767.0), 1000);
        assert_eq!(scale.to_ppm(0.0), 0);

        let scale = AirQualityScale {
            max_raw: 4095.0,
            ppm_scale: 500.0,
        };
        assert_eq!(scale.to_ppm(4095.0), 500);
    }

    #[test]
    fn test_legacy_fallback() {
        let rec = DataRecord {
            temperature: Some(RawValue::Number(23.6)),
            ..Default::default()
        };
        let snap = Normaliser::default().snapshot(&rec);

        assert_eq!(snap.readings.temperature_c, Some(23.6));
        assert_eq!(snap.readings.humidity_percent, None);
        assert_eq!(snap.readings.forward_distance_cm, None);
        assert_eq!(snap.readings.air_quality, None);
    }

    #[test]
    fn test_suffixed_preferred() {
        let rec = DataRecord {
            power: Some(true),
            mode: Some("assisted".into()),
            temperature_c: Some(RawValue::Number(21.0)),
            temperature: Some(RawValue::Number(99.0)),
            forward_distance_cm: Some(RawValue::Number(150.0)),
            forward_distance: Some(RawValue::Number(1.0)),
            air_quality_raw: Some(RawValue::Number(16384.0)),
            air_quality: Some(RawValue::Number(1.0)),
            ..Default::default()
        };
        let snap = Normaliser::default().snapshot(&rec);

        assert!(snap.power);
        assert_eq!(snap.mode.as_deref(), Some("assisted"));
        assert_eq!(snap.readings.temperature_c, Some(21.0));
        assert_eq!(
            snap.readings.forward_distance_cm,
            Some(RawValue::Number(150.0))
        );
        assert_eq!(
            snap.readings.air_quality,
            Some(AirQuality {
                raw: RawValue::Number(16384.0),
                ppm: 500
            })
        );
    }

    #[test]
    fn test_text_readings() {
        let rec = DataRecord {
            humidity: Some(RawValue::Text("45.5".into())),
            air_quality_raw: Some(RawValue::Text("error".into())),
            forward_distance: Some(RawValue::Text("out of range".into())),
            ..Default::default()
        };
        let snap = Normaliser::default().snapshot(&rec);

        assert_eq!(snap.readings.humidity_percent, Some(45.5));
        assert_eq!(snap.readings.air_quality, None);
        assert_eq!(
            snap.readings.forward_distance_cm,
            Some(RawValue::Text("out of range".into()))
        );
    }

    #[test]
    fn test_merge_keeps_last_known() {
        let mut current = SensorReadings {
            temperature_c: Some(20.0),
            humidity_percent: Some(40.0),
            ..Default::default()
        };
        current.merge(&SensorReadings {
            temperature_c: Some(21.5),
            ..Default::default()
        });

        assert_eq!(current.temperature_c, Some(21.5));
        assert_eq!(current.humidity_percent, Some(40.0));
    }

    #[test]
    fn test_history_aliasing_and_alignment() {
        let rec = HistoryRecord {
            labels: vec!["10:00".into(), "10:01".into()],
            temperature: Some(vec![22.0, 22.5, 23.0]),
            humidity_percent: Some(vec![45.0, 46.0]),
            humidity: Some(vec![0.0, 0.0]),
            ..Default::default()
        };
        let h = Normaliser::default().history(&rec);

        assert_eq!(h.temperature_c, vec![22.0, 22.5]);
        assert_eq!(h.humidity_percent, vec![45.0, 46.0]);
        assert!(h.air_quality_raw.is_empty());
    }

    #[test]
    fn test_series_stats() {
        assert_eq!(SeriesStats::of(&[]), None);
        assert_eq!(
            SeriesStats::of(&[3.0, 1.0, 4.0, 2.0]),
            Some(SeriesStats {
                min: 1.0,
                max: 4.0,
                latest: 2.0
            })
        );
    }
}
