/// OpenWeatherMap current-conditions client
///
/// Retrieves the current temperature, humidity and wind speed at each
/// zone's coordinates and appends them as a new weather reading.
///
/// API Documentation: https://openweathermap.org/current
/// Units: metric (°C, %, m/s)

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::WeatherConfig;
use crate::error::{IngestError, StoreError};
use crate::logging::{self, Component};
use crate::model::{NewWeatherReading, Zone};
use crate::store::{WeatherStore, ZoneStore};

// ============================================================================
// API Response Structures
// ============================================================================

/// The subset of `/data/2.5/weather` the service reads. Every section is
/// optional; OpenWeather omits `wind` for some stations.
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    pub main: Option<MainSection>,
    pub wind: Option<WindSection>,
}

#[derive(Debug, Deserialize)]
pub struct MainSection {
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WindSection {
    pub speed: Option<f64>,
}

/// Measurements extracted from one response.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedWeather {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl ObservedWeather {
    pub fn into_reading(self, zone: &Zone, observed_at: DateTime<Utc>) -> NewWeatherReading {
        NewWeatherReading {
            zone_id: zone.id,
            timestamp: observed_at,
            temperature: self.temperature,
            humidity: self.humidity,
            wind_speed: self.wind_speed,
        }
    }
}

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub zones_total: usize,
    pub stored: usize,
    pub failed: usize,
}

// ============================================================================
// URL + Parsing
// ============================================================================

pub fn build_current_url(base_url: &str, latitude: f64, longitude: f64, api_key: &str) -> String {
    format!(
        "{}?lat={}&lon={}&units=metric&appid={}",
        base_url, latitude, longitude, api_key
    )
}

pub fn parse_current_response(body: &str) -> Result<ObservedWeather, IngestError> {
    let response: CurrentWeatherResponse =
        serde_json::from_str(body).map_err(|e| IngestError::Parse(e.to_string()))?;

    let (temperature, humidity) = match response.main {
        Some(main) => (main.temp, main.humidity),
        None => (None, None),
    };
    let wind_speed = response.wind.and_then(|w| w.speed);

    Ok(ObservedWeather {
        temperature,
        humidity,
        wind_speed,
    })
}

// ============================================================================
// API Client Functions
// ============================================================================

pub fn build_client(config: &WeatherConfig) -> Result<reqwest::blocking::Client, IngestError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Fetch current conditions for a zone, stamped with the current time.
pub fn fetch_current(
    client: &reqwest::blocking::Client,
    config: &WeatherConfig,
    api_key: &str,
    zone: &Zone,
) -> Result<NewWeatherReading, IngestError> {
    let url = build_current_url(&config.base_url, zone.latitude, zone.longitude, api_key);

    let response = client
        .get(&url)
        .header("Accept", "application/json")
        .send()?;

    if !response.status().is_success() {
        return Err(IngestError::Http(response.status().as_u16()));
    }

    let body = response.text()?;
    let observed = parse_current_response(&body)?;
    Ok(observed.into_reading(zone, Utc::now()))
}

/// Fetch and store one reading per zone.
///
/// A zone whose fetch or insert fails is logged and counted; the others
/// still get their reading. Only failing to list the zones aborts the pass.
pub fn ingest_all_zones<S>(
    client: &reqwest::blocking::Client,
    store: &S,
    config: &WeatherConfig,
    api_key: &str,
) -> Result<IngestReport, StoreError>
where
    S: ZoneStore + WeatherStore + ?Sized,
{
    let zones = store.find_all()?;
    let mut report = IngestReport {
        zones_total: zones.len(),
        ..IngestReport::default()
    };

    for zone in &zones {
        let result = fetch_current(client, config, api_key, zone)
            .and_then(|reading| store.insert_reading(&reading).map_err(IngestError::from));
        match result {
            Ok(stored) => {
                report.stored += 1;
                logging::debug(
                    Component::Ingest,
                    Some(zone.id),
                    &format!("stored reading {} for {}", stored.id, zone.name),
                );
            }
            Err(err) => {
                report.failed += 1;
                logging::log_ingest_failure(zone.id, "fetch current weather", &err);
            }
        }
    }

    logging::log_batch_summary(Component::Ingest, "weather ingest", report.zones_total, report.stored, report.failed);
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
