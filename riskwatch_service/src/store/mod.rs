//! Persistence boundary.
//!
//! The predictor, trainer, notifier and ingest job only see these traits.
//! `postgres` is the production backend; `memory` backs the tests.
//!
//! Submodules:
//! - `memory`   — in-process store behind `RwLock`s.
//! - `pg`       — blocking PostgreSQL client (`sql/001_base_schema.sql`).

pub mod memory;
pub mod pg;

use std::sync::Arc;

use crate::error::StoreError;
use crate::model::{NewWeatherReading, Subscription, WeatherReading, Zone, ZoneId};

pub use self::memory::MemoryStore;
pub use self::pg::PostgresStore;

pub trait ZoneStore {
    /// All zones in ascending id order.
    fn find_all(&self) -> Result<Vec<Zone>, StoreError>;
    fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, StoreError>;
}

pub trait WeatherStore {
    /// Most recent reading by timestamp; ties go to the highest reading id.
    fn find_latest_for_zone(&self, zone_id: ZoneId) -> Result<Option<WeatherReading>, StoreError>;
    /// Every reading for the zone, oldest first.
    fn find_all_for_zone(&self, zone_id: ZoneId) -> Result<Vec<WeatherReading>, StoreError>;
    fn insert_reading(&self, reading: &NewWeatherReading) -> Result<WeatherReading, StoreError>;
}

pub trait SubscriptionStore {
    fn find_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Subscription>, StoreError>;
}

// ---------------------------------------------------------------------------
// Forwarding impls so components can share one store by reference or Arc
// ---------------------------------------------------------------------------

impl<T: ZoneStore + ?Sized> ZoneStore for &T {
    fn find_all(&self) -> Result<Vec<Zone>, StoreError> {
        (**self).find_all()
    }

    fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, StoreError> {
        (**self).find_by_id(id)
    }
}

impl<T: ZoneStore + ?Sized> ZoneStore for Arc<T> {
    fn find_all(&self) -> Result<Vec<Zone>, StoreError> {
        (**self).find_all()
    }

    fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, StoreError> {
        (**self).find_by_id(id)
    }
}

impl<T: WeatherStore + ?Sized> WeatherStore for &T {
    fn find_latest_for_zone(&self, zone_id: ZoneId) -> Result<Option<WeatherReading>, StoreError> {
        (**self).find_latest_for_zone(zone_id)
    }

    fn find_all_for_zone(&self, zone_id: ZoneId) -> Result<Vec<WeatherReading>, StoreError> {
        (**self).find_all_for_zone(zone_id)
    }

    fn insert_reading(&self, reading: &NewWeatherReading) -> Result<WeatherReading, StoreError> {
        (**self).insert_reading(reading)
    }
}

impl<T: WeatherStore + ?Sized> WeatherStore for Arc<T> {
    fn find_latest_for_zone(&self, zone_id: ZoneId) -> Result<Option<WeatherReading>, StoreError> {
        (**self).find_latest_for_zone(zone_id)
    }

    fn find_all_for_zone(&self, zone_id: ZoneId) -> Result<Vec<WeatherReading>, StoreError> {
        (**self).find_all_for_zone(zone_id)
    }

    fn insert_reading(&self, reading: &NewWeatherReading) -> Result<WeatherReading, StoreError> {
        (**self).insert_reading(reading)
    }
}

impl<T: SubscriptionStore + ?Sized> SubscriptionStore for &T {
    fn find_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Subscription>, StoreError> {
        (**self).find_by_zone(zone_id)
    }
}

impl<T: SubscriptionStore + ?Sized> SubscriptionStore for Arc<T> {
    fn find_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Subscription>, StoreError> {
        (**self).find_by_zone(zone_id)
    }
}
