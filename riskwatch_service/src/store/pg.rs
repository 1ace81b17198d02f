/// PostgreSQL-backed store.
///
/// Schema lives in `sql/001_base_schema.sql`:
///   risk_zones(id, name, latitude, longitude, risk_level)
///   weather_data(id, zone_id, recorded_at, temperature, humidity, wind_speed)
///   subscriptions(id, email, phone_number, zone_id, user_id)
///
/// The blocking `postgres::Client` needs `&mut`, so it sits behind a mutex
/// and the store can be shared by reference between the predictor, the
/// trainer and the notifier.

use std::sync::{Mutex, MutexGuard};

use postgres::{Client, NoTls, Row};

use super::{SubscriptionStore, WeatherStore, ZoneStore};
use crate::error::StoreError;
use crate::logging::{self, Component};
use crate::model::{NewWeatherReading, Subscription, WeatherReading, Zone, ZoneId};

/// Tables the service reads and writes.
pub const REQUIRED_TABLES: &[&str] = &["risk_zones", "weather_data", "subscriptions"];

pub struct PostgresStore {
    client: Mutex<Client>,
}

impl PostgresStore {
    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let client = Client::connect(database_url, NoTls)?;
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    /// Connects and checks that every table in `REQUIRED_TABLES` exists.
    pub fn connect_and_verify(database_url: &str) -> Result<Self, StoreError> {
        let store = Self::connect(database_url)?;
        store.verify_schema()?;
        logging::info(Component::Database, None, "connected, schema verified");
        Ok(store)
    }

    pub fn verify_schema(&self) -> Result<(), StoreError> {
        let mut client = self.lock()?;
        for table in REQUIRED_TABLES {
            let row = client.query_one(
                "SELECT EXISTS (
                     SELECT 1 FROM information_schema.tables
                     WHERE table_schema = current_schema() AND table_name = $1
                 )",
                &[table],
            )?;
            let exists: bool = row.try_get(0)?;
            if !exists {
                return Err(StoreError::MissingTable(table.to_string()));
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Client>, StoreError> {
        self.client
            .lock()
            .map_err(|_| StoreError::Unavailable("database client lock poisoned".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn zone_from_row(row: &Row) -> Result<Zone, StoreError> {
    Ok(Zone {
        id: ZoneId(row.try_get("id")?),
        name: row.try_get("name")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        risk_level: row.try_get("risk_level")?,
    })
}

fn reading_from_row(row: &Row) -> Result<WeatherReading, StoreError> {
    Ok(WeatherReading {
        id: row.try_get("id")?,
        zone_id: ZoneId(row.try_get("zone_id")?),
        timestamp: row.try_get("recorded_at")?,
        temperature: row.try_get("temperature")?,
        humidity: row.try_get("humidity")?,
        wind_speed: row.try_get("wind_speed")?,
    })
}

fn subscription_from_row(row: &Row) -> Result<Subscription, StoreError> {
    Ok(Subscription {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        zone_id: ZoneId(row.try_get("zone_id")?),
        user_id: row.try_get("user_id")?,
    })
}

const READING_COLUMNS: &str = "id, zone_id, recorded_at, temperature, humidity, wind_speed";

// ---------------------------------------------------------------------------
// Trait impls
// ---------------------------------------------------------------------------

impl ZoneStore for PostgresStore {
    fn find_all(&self) -> Result<Vec<Zone>, StoreError> {
        let rows = self.lock()?.query(
            "SELECT id, name, latitude, longitude, risk_level FROM risk_zones ORDER BY id",
            &[],
        )?;
        rows.iter().map(zone_from_row).collect()
    }

    fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, StoreError> {
        let row = self.lock()?.query_opt(
            "SELECT id, name, latitude, longitude, risk_level FROM risk_zones WHERE id = $1",
            &[&id.0],
        )?;
        row.as_ref().map(zone_from_row).transpose()
    }
}

impl WeatherStore for PostgresStore {
    fn find_latest_for_zone(&self, zone_id: ZoneId) -> Result<Option<WeatherReading>, StoreError> {
        let query = format!(
            "SELECT {} FROM weather_data
             WHERE zone_id = $1
             ORDER BY recorded_at DESC, id DESC
             LIMIT 1",
            READING_COLUMNS
        );
        let row = self.lock()?.query_opt(query.as_str(), &[&zone_id.0])?;
        row.as_ref().map(reading_from_row).transpose()
    }

    fn find_all_for_zone(&self, zone_id: ZoneId) -> Result<Vec<WeatherReading>, StoreError> {
        let query = format!(
            "SELECT {} FROM weather_data
             WHERE zone_id = $1
             ORDER BY recorded_at, id",
            READING_COLUMNS
        );
        let rows = self.lock()?.query(query.as_str(), &[&zone_id.0])?;
        rows.iter().map(reading_from_row).collect()
    }

    fn insert_reading(&self, reading: &NewWeatherReading) -> Result<WeatherReading, StoreError> {
        let query = format!(
            "INSERT INTO weather_data (zone_id, recorded_at, temperature, humidity, wind_speed)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            READING_COLUMNS
        );
        let row = self.lock()?.query_one(
            query.as_str(),
            &[
                &reading.zone_id.0,
                &reading.timestamp,
                &reading.temperature,
                &reading.humidity,
                &reading.wind_speed,
            ],
        )?;
        reading_from_row(&row)
    }
}

impl SubscriptionStore for PostgresStore {
    fn find_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Subscription>, StoreError> {
        let rows = self.lock()?.query(
            "SELECT id, email, phone_number, zone_id, user_id
             FROM subscriptions
             WHERE zone_id = $1
             ORDER BY id",
            &[&zone_id.0],
        )?;
        rows.iter().map(subscription_from_row).collect()
    }
}
