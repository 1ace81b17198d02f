/// In-memory store.
///
/// Keeps zones, readings and subscriptions in `RwLock`ed vectors. Used by
/// the test suites. The
/// `offline` switch makes every query fail, which is how tests check that
/// store failures reach the caller.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::{SubscriptionStore, WeatherStore, ZoneStore};
use crate::error::StoreError;
use crate::model::{NewWeatherReading, Subscription, WeatherReading, Zone, ZoneId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    zones: RwLock<Vec<Zone>>,
    readings: RwLock<Vec<WeatherReading>>,
    subscriptions: RwLock<Vec<Subscription>>,
    next_reading_id: AtomicI64,
    next_subscription_id: AtomicI64,
    offline: AtomicBool,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a zone (keyed by id).
    pub fn add_zone(&self, zone: Zone) -> Result<(), StoreError> {
        let mut zones = write(&self.zones)?;
        zones.retain(|z| z.id != zone.id);
        zones.push(zone);
        zones.sort_by_key(|z| z.id);
        Ok(())
    }

    pub fn remove_zone(&self, id: ZoneId) -> Result<(), StoreError> {
        write(&self.zones)?.retain(|z| z.id != id);
        write(&self.readings)?.retain(|r| r.zone_id != id);
        write(&self.subscriptions)?.retain(|s| s.zone_id != id);
        Ok(())
    }

    /// Shorthand for inserting a fully specified reading.
    pub fn add_reading(
        &self,
        zone_id: ZoneId,
        timestamp: DateTime<Utc>,
        temperature: Option<f64>,
        humidity: Option<f64>,
        wind_speed: Option<f64>,
    ) -> Result<WeatherReading, StoreError> {
        self.insert_reading(&NewWeatherReading {
            zone_id,
            timestamp,
            temperature,
            humidity,
            wind_speed,
        })
    }

    pub fn add_subscription(
        &self,
        zone_id: ZoneId,
        user_id: i64,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Subscription, StoreError> {
        self.check_online()?;
        let subscription = Subscription {
            id: self.next_subscription_id.fetch_add(1, Ordering::SeqCst) + 1,
            email: email.map(String::from),
            phone_number: phone_number.map(String::from),
            zone_id,
            user_id,
        };
        write(&self.subscriptions)?.push(subscription.clone());
        Ok(subscription)
    }

    /// While offline, every query returns `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ZoneStore for MemoryStore {
    fn find_all(&self) -> Result<Vec<Zone>, StoreError> {
        self.check_online()?;
        Ok(read(&self.zones)?.clone())
    }

    fn find_by_id(&self, id: ZoneId) -> Result<Option<Zone>, StoreError> {
        self.check_online()?;
        Ok(read(&self.zones)?.iter().find(|z| z.id == id).cloned())
    }
}

impl WeatherStore for MemoryStore {
    fn find_latest_for_zone(&self, zone_id: ZoneId) -> Result<Option<WeatherReading>, StoreError> {
        self.check_online()?;
        Ok(read(&self.readings)?
            .iter()
            .filter(|r| r.zone_id == zone_id)
            .max_by_key(|r| (r.timestamp, r.id))
            .cloned())
    }

    fn find_all_for_zone(&self, zone_id: ZoneId) -> Result<Vec<WeatherReading>, StoreError> {
        self.check_online()?;
        let mut readings: Vec<_> = read(&self.readings)?
            .iter()
            .filter(|r| r.zone_id == zone_id)
            .cloned()
            .collect();
        readings.sort_by_key(|r| (r.timestamp, r.id));
        Ok(readings)
    }

    fn insert_reading(&self, reading: &NewWeatherReading) -> Result<WeatherReading, StoreError> {
        self.check_online()?;
        let stored = WeatherReading {
            id: self.next_reading_id.fetch_add(1, Ordering::SeqCst) + 1,
            zone_id: reading.zone_id,
            timestamp: reading.timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
            wind_speed: reading.wind_speed,
        };
        write(&self.readings)?.push(stored.clone());
        Ok(stored)
    }
}

impl SubscriptionStore for MemoryStore {
    fn find_by_zone(&self, zone_id: ZoneId) -> Result<Vec<Subscription>, StoreError> {
        self.check_online()?;
        Ok(read(&self.subscriptions)?
            .iter()
            .filter(|s| s.zone_id == zone_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn zone(id: i32, name: &str) -> Zone {
        Zone {
            id: ZoneId(id),
            name: name.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            risk_level: 0,
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_zones_enumerate_in_id_order() {
        let store = MemoryStore::new();
        store.add_zone(zone(3, "C")).unwrap();
        store.add_zone(zone(1, "A")).unwrap();
        store.add_zone(zone(2, "B")).unwrap();
        let ids: Vec<_> = store.find_all().unwrap().into_iter().map(|z| z.id).collect();
        assert_eq!(ids, vec![ZoneId(1), ZoneId(2), ZoneId(3)]);
    }

    #[test]
    fn test_latest_reading_is_by_timestamp_not_insertion() {
        let store = MemoryStore::new();
        store.add_reading(ZoneId(1), at(14), Some(1.0), None, None).unwrap();
        store.add_reading(ZoneId(1), at(12), Some(2.0), None, None).unwrap();
        let latest = store.find_latest_for_zone(ZoneId(1)).unwrap().unwrap();
        assert_eq!(latest.temperature, Some(1.0));
    }

    #[test]
    fn test_timestamp_tie_goes_to_highest_id() {
        let store = MemoryStore::new();
        store.add_reading(ZoneId(1), at(12), Some(1.0), None, None).unwrap();
        let second = store.add_reading(ZoneId(1), at(12), Some(2.0), None, None).unwrap();
        let latest = store.find_latest_for_zone(ZoneId(1)).unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[test]
    fn test_readings_are_scoped_to_their_zone() {
        let store = MemoryStore::new();
        store.add_reading(ZoneId(1), at(12), None, None, None).unwrap();
        assert!(store.find_latest_for_zone(ZoneId(2)).unwrap().is_none());
        assert_eq!(store.find_all_for_zone(ZoneId(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_offline_store_fails_queries() {
        let store = MemoryStore::new();
        store.add_zone(zone(1, "A")).unwrap();
        store.set_offline(true);
        assert!(matches!(store.find_all(), Err(StoreError::Unavailable(_))));
        store.set_offline(false);
        assert_eq!(store.find_all().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_zone_cascades() {
        let store = MemoryStore::new();
        store.add_zone(zone(1, "A")).unwrap();
        store.add_reading(ZoneId(1), at(12), None, None, None).unwrap();
        store.add_subscription(ZoneId(1), 1, Some("a@example.com"), None).unwrap();
        store.remove_zone(ZoneId(1)).unwrap();
        assert!(store.find_by_id(ZoneId(1)).unwrap().is_none());
        assert!(store.find_all_for_zone(ZoneId(1)).unwrap().is_empty());
        assert!(store.find_by_zone(ZoneId(1)).unwrap().is_empty());
    }
}
