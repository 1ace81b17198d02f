/// Core data types for the zone risk monitoring service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O: zones and readings as they come out of the store,
/// the feature vector derived from a reading, and the prediction handed back
/// to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Primary key of a row in `risk_zones`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub i32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Zones and readings
// ---------------------------------------------------------------------------

/// A monitored geographic area.
///
/// `risk_level` is the administrator-assigned baseline label. It is the
/// training target and is never read at prediction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub risk_level: i32,
}

/// A stored weather observation for a zone.
///
/// Any measurement may be missing; missing values count as zero when the
/// reading is turned into features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub id: i64,
    pub zone_id: ZoneId,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>, // °C
    pub humidity: Option<f64>,    // relative humidity, %
    pub wind_speed: Option<f64>,  // m/s
}

/// A reading that has not been persisted yet (produced by ingestion).
#[derive(Debug, Clone, PartialEq)]
pub struct NewWeatherReading {
    pub zone_id: ZoneId,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
}

/// A user's request to be alerted about one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i64,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub zone_id: ZoneId,
    pub user_id: i64,
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

fn measured(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Number of inputs every scorer consumes.
pub const FEATURE_COUNT: usize = 3;

/// `[temperature, humidity, wind_speed]`, in that order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(temperature: f64, humidity: f64, wind_speed: f64) -> Self {
        FeatureVector([temperature, humidity, wind_speed])
    }

    /// Substitutes zero for every missing measurement. NaN and infinite
    /// values (both storable in a `DOUBLE PRECISION` column) count as missing.
    pub fn from_reading(reading: &WeatherReading) -> Self {
        FeatureVector::new(
            measured(reading.temperature),
            measured(reading.humidity),
            measured(reading.wind_speed),
        )
    }

    pub fn temperature(&self) -> f64 {
        self.0[0]
    }

    pub fn humidity(&self) -> f64 {
        self.0[1]
    }

    pub fn wind_speed(&self) -> f64 {
        self.0[2]
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// The risk computed for one zone. Never persisted.
///
/// Field names on the wire (`zoneId`, `zoneName`, `riskLevel`, `timestamp`)
/// are what existing API consumers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "zoneId")]
    pub zone_id: ZoneId,
    #[serde(rename = "zoneName")]
    pub zone_name: String,
    /// Always within [0, 1].
    #[serde(rename = "riskLevel")]
    pub score: f64,
    /// Timestamp of the reading the score came from; `None` if the zone has
    /// no reading yet.
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(temperature: Option<f64>, humidity: Option<f64>, wind_speed: Option<f64>) -> WeatherReading {
        WeatherReading {
            id: 1,
            zone_id: ZoneId(1),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap(),
            temperature,
            humidity,
            wind_speed,
        }
    }

    #[test]
    fn test_features_follow_temperature_humidity_wind_order() {
        let features = FeatureVector::from_reading(&reading(Some(20.0), Some(30.0), Some(28.0)));
        assert_eq!(features.0, [20.0, 30.0, 28.0]);
        assert_eq!(features.temperature(), 20.0);
        assert_eq!(features.humidity(), 30.0);
        assert_eq!(features.wind_speed(), 28.0);
    }

    #[test]
    fn test_missing_measurements_become_zero() {
        let features = FeatureVector::from_reading(&reading(None, Some(55.0), None));
        assert_eq!(features.0, [0.0, 55.0, 0.0]);
    }

    #[test]
    fn test_non_finite_measurements_become_zero() {
        let features = FeatureVector::from_reading(&reading(
            Some(f64::INFINITY),
            Some(f64::NAN),
            Some(f64::NEG_INFINITY),
        ));
        assert_eq!(features.0, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_prediction_serializes_with_api_field_names() {
        let prediction = Prediction {
            zone_id: ZoneId(7),
            zone_name: "Zone A".to_string(),
            score: 0.5,
            timestamp: None,
        };
        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["zoneId"], 7);
        assert_eq!(json["zoneName"], "Zone A");
        assert_eq!(json["riskLevel"], 0.5);
        assert!(json["timestamp"].is_null());
    }
}
