//! SQLite-backed forecast store.
//!
//! The store exclusively owns the connection. Every write is announced on a
//! broadcast channel as a [`StoreChange`] so screens can re-query instead of
//! polling.

use std::path::Path;

use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::model::{ForecastRow, Location, WeatherDay, day_to_timestamp, timestamp_to_day};
use crate::schema;
use crate::uri::ForecastUri;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

const FORECAST_COLUMNS: &str = "weather.id, location.location_setting, location.city_name, \
     location.coord_lat, location.coord_long, weather.date, weather.short_desc, \
     weather.max_temp, weather.min_temp, weather.humidity, weather.wind, weather.degrees, \
     weather.pressure, weather.weather_id";

/// Notification that rows under `uri` were inserted, updated or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub uri: ForecastUri,
}

pub struct WeatherStore {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<StoreChange>,
}

impl std::fmt::Debug for WeatherStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherStore")
            .field("subscribers", &self.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

impl WeatherStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    StoreError::CreateDirectory {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        info!("Opening forecast database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests and throwaway sessions).
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            changes,
        })
    }

    /// Receive every change made to the store from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn notify(&self, uri: ForecastUri) {
        debug!(%uri, "store changed");
        // No subscribers is fine; nobody is looking.
        let _ = self.changes.send(StoreChange { uri });
    }

    // === Locations ===

    /// Id of the location for `location_setting`, inserting it on first use.
    pub fn find_or_create_location(
        &self,
        location_setting: &str,
        city_name: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<i64> {
        let (id, created) = {
            let conn = self.conn.lock();

            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM location WHERE location_setting = ?1",
                    [location_setting],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => (id, false),
                None => {
                    conn.execute(
                        "INSERT INTO location (location_setting, city_name, coord_lat, coord_long)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![location_setting, city_name, latitude, longitude],
                    )?;
                    (conn.last_insert_rowid(), true)
                }
            }
        };

        if created {
            info!(location_setting, city_name, id, "Added location");
            self.notify(ForecastUri::Location);
        }

        Ok(id)
    }

    pub fn location(&self, location_setting: &str) -> Result<Option<Location>> {
        let conn = self.conn.lock();
        let location = conn
            .query_row(
                "SELECT id, location_setting, city_name, coord_lat, coord_long
                 FROM location WHERE location_setting = ?1",
                [location_setting],
                location_from_row,
            )
            .optional()?;

        Ok(location)
    }

    pub fn locations(&self) -> Result<Vec<Location>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, location_setting, city_name, coord_lat, coord_long
             FROM location ORDER BY id",
        )?;

        let locations = stmt
            .query_map([], location_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(locations)
    }

    // === Weather ===

    /// Insert or update one row per day; a `(location, date)` pair that is
    /// already stored has its values replaced in place.
    pub fn upsert_weather(&self, location_id: i64, days: &[WeatherDay]) -> Result<usize> {
        if days.is_empty() {
            return Ok(0);
        }

        let location_setting = {
            let mut conn = self.conn.lock();
            let tx = conn.transaction()?;

            let location_setting: String = tx
                .query_row(
                    "SELECT location_setting FROM location WHERE id = ?1",
                    [location_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::UnknownLocation(location_id))?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO weather (location_id, date, short_desc, weather_id, min_temp,
                                          max_temp, humidity, pressure, wind, degrees)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT (location_id, date) DO UPDATE SET
                        short_desc = excluded.short_desc,
                        weather_id = excluded.weather_id,
                        min_temp = excluded.min_temp,
                        max_temp = excluded.max_temp,
                        humidity = excluded.humidity,
                        pressure = excluded.pressure,
                        wind = excluded.wind,
                        degrees = excluded.degrees",
                )?;

                for day in days {
                    stmt.execute(params![
                        location_id,
                        day_to_timestamp(day.date),
                        day.short_description,
                        day.weather_condition_id,
                        day.min_temp,
                        day.max_temp,
                        day.humidity,
                        day.pressure,
                        day.wind_speed,
                        day.wind_direction_degrees,
                    ])?;
                }
            }

            tx.commit()?;
            location_setting
        };

        info!(location_setting = %location_setting, rows = days.len(), "Stored forecast");
        self.notify(ForecastUri::for_location(location_setting));

        Ok(days.len())
    }

    /// Rows for one location from `from_date` on, ordered by date ascending.
    pub fn query_forecast(
        &self,
        location_setting: &str,
        from_date: NaiveDate,
    ) -> Result<Vec<ForecastRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FORECAST_COLUMNS}
             FROM weather INNER JOIN location ON weather.location_id = location.id
             WHERE location.location_setting = ?1 AND weather.date >= ?2
             ORDER BY weather.date ASC"
        ))?;

        let rows = stmt
            .query_map(
                params![location_setting, day_to_timestamp(from_date)],
                forecast_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().collect()
    }

    /// The single row named by a `(location, date)` URI.
    pub fn query_detail(&self, uri: &ForecastUri) -> Result<Option<ForecastRow>> {
        let ForecastUri::WeatherForLocationAndDate { location, date } = uri else {
            return Err(StoreError::UnsupportedUri(uri.clone()));
        };

        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {FORECAST_COLUMNS}
                     FROM weather INNER JOIN location ON weather.location_id = location.id
                     WHERE location.location_setting = ?1 AND weather.date = ?2"
                ),
                params![location, day_to_timestamp(*date)],
                forecast_from_row,
            )
            .optional()?;

        row.transpose()
    }

    /// Drop every weather row dated before `date`.
    pub fn delete_weather_before(&self, date: NaiveDate) -> Result<usize> {
        let deleted = {
            let conn = self.conn.lock();
            conn.execute(
                "DELETE FROM weather WHERE date < ?1",
                [day_to_timestamp(date)],
            )?
        };

        if deleted > 0 {
            debug!(deleted, %date, "Pruned old forecast rows");
            self.notify(ForecastUri::Weather);
        }

        Ok(deleted)
    }
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<Location> {
    Ok(Location {
        id: row.get(0)?,
        location_setting: row.get(1)?,
        city_name: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
    })
}

// The outer rusqlite result carries column errors; the inner one a stored
// date that no longer maps to a calendar day.
fn forecast_from_row(row: &Row<'_>) -> rusqlite::Result<Result<ForecastRow>> {
    let ts: i64 = row.get(5)?;
    let Some(date) = timestamp_to_day(ts) else {
        return Ok(Err(StoreError::InvalidDate(ts)));
    };

    Ok(Ok(ForecastRow {
        id: row.get(0)?,
        location_setting: row.get(1)?,
        city_name: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        day: WeatherDay {
            date,
            short_description: row.get(6)?,
            max_temp: row.get(7)?,
            min_temp: row.get(8)?,
            humidity: row.get(9)?,
            wind_speed: row.get(10)?,
            wind_direction_degrees: row.get(11)?,
            pressure: row.get(12)?,
            weather_condition_id: row.get(13)?,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weather(date: NaiveDate, description: &str, max: f64, min: f64) -> WeatherDay {
        WeatherDay {
            date,
            short_description: description.to_string(),
            max_temp: max,
            min_temp: min,
            humidity: 80.0,
            wind_speed: 1.5,
            wind_direction_degrees: 225.0,
            pressure: 1013.0,
            weather_condition_id: 800,
        }
    }

    #[test]
    fn find_or_create_location_is_idempotent() {
        let store = WeatherStore::open_in_memory().unwrap();

        let first = store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();
        let second = store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.locations().unwrap().len(), 1);
    }

    #[test]
    fn existing_location_is_not_updated() {
        let store = WeatherStore::open_in_memory().unwrap();

        store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();
        store
            .find_or_create_location("94043", "Somewhere Else", 0.0, 0.0)
            .unwrap();

        let location = store.location("94043").unwrap().unwrap();
        assert_eq!(location.city_name, "Mountain View");
        assert_eq!(location.latitude, 37.39);
    }

    #[test]
    fn forecast_is_ordered_by_date_and_starts_at_from_date() {
        let store = WeatherStore::open_in_memory().unwrap();
        let id = store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();

        store
            .upsert_weather(
                id,
                &[
                    weather(day(2017, 10, 8), "Rain", 14.0, 9.0),
                    weather(day(2017, 10, 5), "Clear", 20.0, 11.0),
                    weather(day(2017, 10, 7), "Clouds", 16.0, 10.0),
                    weather(day(2017, 10, 6), "Clear", 21.0, 12.0),
                ],
            )
            .unwrap();

        let rows = store.query_forecast("94043", day(2017, 10, 6)).unwrap();
        let dates: Vec<_> = rows.iter().map(|r| r.day.date).collect();

        assert_eq!(dates, vec![day(2017, 10, 6), day(2017, 10, 7), day(2017, 10, 8)]);
        assert!(rows.iter().all(|r| r.city_name == "Mountain View"));
    }

    #[test]
    fn upsert_replaces_values_for_same_location_and_date() {
        let store = WeatherStore::open_in_memory().unwrap();
        let id = store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();

        store
            .upsert_weather(id, &[weather(day(2017, 10, 6), "Clear", 21.0, 12.0)])
            .unwrap();
        store
            .upsert_weather(id, &[weather(day(2017, 10, 6), "Storm", 15.0, 8.0)])
            .unwrap();

        let rows = store.query_forecast("94043", day(2017, 10, 1)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day.short_description, "Storm");
        assert_eq!(rows[0].day.max_temp, 15.0);
    }

    #[test]
    fn forecast_query_is_scoped_to_one_location() {
        let store = WeatherStore::open_in_memory().unwrap();
        let mv = store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();
        let berlin = store
            .find_or_create_location("Berlin", "Berlin", 52.52, 13.41)
            .unwrap();

        store
            .upsert_weather(mv, &[weather(day(2017, 10, 6), "Clear", 21.0, 12.0)])
            .unwrap();
        store
            .upsert_weather(berlin, &[weather(day(2017, 10, 6), "Rain", 11.0, 6.0)])
            .unwrap();

        let rows = store.query_forecast("Berlin", day(2017, 10, 1)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].location_setting, "Berlin");
        assert_eq!(rows[0].day.short_description, "Rain");
    }

    #[test]
    fn upsert_for_unknown_location_fails() {
        let store = WeatherStore::open_in_memory().unwrap();
        let err = store
            .upsert_weather(42, &[weather(day(2017, 10, 6), "Clear", 21.0, 12.0)])
            .unwrap_err();

        assert!(matches!(err, StoreError::UnknownLocation(42)));
    }

    #[test]
    fn query_detail_returns_single_day() {
        let store = WeatherStore::open_in_memory().unwrap();
        let id = store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();
        store
            .upsert_weather(
                id,
                &[
                    weather(day(2017, 10, 6), "Clear", 21.0, 12.0),
                    weather(day(2017, 10, 7), "Clouds", 16.0, 10.0),
                ],
            )
            .unwrap();

        let uri = ForecastUri::for_location_and_date("94043", day(2017, 10, 7));
        let row = store.query_detail(&uri).unwrap().unwrap();
        assert_eq!(row.day.short_description, "Clouds");

        let missing = ForecastUri::for_location_and_date("94043", day(2017, 10, 9));
        assert!(store.query_detail(&missing).unwrap().is_none());
    }

    #[test]
    fn query_detail_rejects_list_uris() {
        let store = WeatherStore::open_in_memory().unwrap();
        let err = store
            .query_detail(&ForecastUri::for_location("94043"))
            .unwrap_err();

        assert!(matches!(err, StoreError::UnsupportedUri(_)));
    }

    #[test]
    fn delete_weather_before_prunes_old_days() {
        let store = WeatherStore::open_in_memory().unwrap();
        let id = store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();
        store
            .upsert_weather(
                id,
                &[
                    weather(day(2017, 10, 5), "Clear", 20.0, 11.0),
                    weather(day(2017, 10, 6), "Clear", 21.0, 12.0),
                ],
            )
            .unwrap();

        assert_eq!(store.delete_weather_before(day(2017, 10, 6)).unwrap(), 1);

        let rows = store.query_forecast("94043", day(2017, 1, 1)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].day.date, day(2017, 10, 6));
    }

    #[test]
    fn writes_notify_subscribers() {
        let store = WeatherStore::open_in_memory().unwrap();
        let mut changes = store.subscribe();

        let id = store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();
        store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();
        store
            .upsert_weather(id, &[weather(day(2017, 10, 6), "Clear", 21.0, 12.0)])
            .unwrap();

        assert_eq!(changes.try_recv().unwrap().uri, ForecastUri::Location);
        assert_eq!(
            changes.try_recv().unwrap().uri,
            ForecastUri::for_location("94043")
        );
        // the second, idempotent lookup wrote nothing
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("weather.db");

        let store = WeatherStore::open(&path).unwrap();
        store
            .find_or_create_location("94043", "Mountain View", 37.39, -122.08)
            .unwrap();
        drop(store);

        let reopened = WeatherStore::open(&path).unwrap();
        assert!(reopened.location("94043").unwrap().is_some());
    }
}
