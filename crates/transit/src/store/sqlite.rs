//! SQLite checkpoint of a [`ScheduleStore`].
//!
//! The file holds the normalized, namespaced records so later analysis runs
//! can skip re-parsing the original feeds. Rows are written and read back in
//! store order, which keeps a reopened store identical to the one saved.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use geo::Point;
use rusqlite::{params, Connection, OpenFlags};

use super::ScheduleStore;
use crate::feed::time::{format_gtfs_date, parse_gtfs_date};
use crate::identifiers::*;
use crate::models::calendar::{DateRange, ServiceCalendar, WeekdayFlags};
use crate::models::types::*;

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
CREATE TABLE feeds (
    namespace TEXT PRIMARY KEY
);
CREATE TABLE stops (
    stop_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    lon REAL,
    lat REAL,
    parent_station TEXT,
    location_type INTEGER
);
CREATE TABLE routes (
    route_id TEXT PRIMARY KEY,
    short_name TEXT NOT NULL,
    long_name TEXT NOT NULL,
    route_type INTEGER
);
CREATE TABLE trips (
    trip_id TEXT PRIMARY KEY,
    route_id TEXT NOT NULL,
    service_id TEXT NOT NULL,
    direction_id INTEGER,
    headsign TEXT
);
CREATE TABLE stop_times (
    trip_id TEXT NOT NULL,
    stop_id TEXT NOT NULL,
    arrival INTEGER NOT NULL,
    departure INTEGER NOT NULL,
    stop_sequence INTEGER NOT NULL
);
CREATE INDEX stop_times_by_stop ON stop_times (stop_id);
CREATE TABLE calendar (
    service_id TEXT PRIMARY KEY,
    weekdays INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL
);
CREATE TABLE calendar_dates (
    service_id TEXT NOT NULL,
    date TEXT NOT NULL,
    exception_type INTEGER NOT NULL
);
";

const ADDED: u8 = 1;
const REMOVED: u8 = 2;

impl ScheduleStore {
    /// Write the store to a fresh SQLite file, replacing any existing one
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let mut conn = Connection::open(path)?;
        self.write_to(&mut conn)?;
        tracing::info!(path = %path.display(), "Saved schedule store");
        Ok(())
    }

    /// Reopen a store written by [`ScheduleStore::save`]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let store = Self::read_from(&conn)?;
        tracing::info!(
            path = %path.display(),
            stops = store.stops.len(),
            trips = store.trips.len(),
            "Opened schedule store"
        );
        Ok(store)
    }

    /// Create the schema on an empty database and insert every record
    pub fn write_to(&self, conn: &mut Connection) -> Result<()> {
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA)?;

        tx.execute(
            "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;

        {
            let mut stmt = tx.prepare("INSERT INTO feeds (namespace) VALUES (?1)")?;
            for feed in &self.feeds {
                stmt.execute(params![feed.as_str()])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO stops (stop_id, name, lon, lat, parent_station, location_type)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for stop in &self.stops {
                stmt.execute(params![
                    stop.id.as_str(),
                    stop.name.as_ref(),
                    stop.location.map(|p| p.x()),
                    stop.location.map(|p| p.y()),
                    stop.parent_station.as_ref().map(|p| p.as_str()),
                    stop.location_type,
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO routes (route_id, short_name, long_name, route_type)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for route in &self.routes {
                stmt.execute(params![
                    route.id.as_str(),
                    route.short_name.as_ref(),
                    route.long_name.as_ref(),
                    route.route_type.map(RouteType::to_gtfs),
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO trips (trip_id, route_id, service_id, direction_id, headsign)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for trip in &self.trips {
                stmt.execute(params![
                    trip.id.as_str(),
                    trip.route_id.as_str(),
                    trip.service_id.as_str(),
                    trip.direction_id.map(DirectionId::to_gtfs),
                    trip.headsign.as_deref(),
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO stop_times (trip_id, stop_id, arrival, departure, stop_sequence)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for stop_time in &self.stop_times {
                stmt.execute(params![
                    stop_time.trip_id.as_str(),
                    stop_time.stop_id.as_str(),
                    stop_time.arrival,
                    stop_time.departure,
                    stop_time.stop_sequence,
                ])?;
            }

            let mut calendar_stmt = tx.prepare(
                "INSERT INTO calendar (service_id, weekdays, start_date, end_date)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut dates_stmt = tx.prepare(
                "INSERT INTO calendar_dates (service_id, date, exception_type)
                 VALUES (?1, ?2, ?3)",
            )?;
            for calendar in &self.calendars {
                calendar_stmt.execute(params![
                    calendar.service_id.as_str(),
                    calendar.weekdays.bits(),
                    format_gtfs_date(calendar.range.start),
                    format_gtfs_date(calendar.range.end),
                ])?;

                for (dates, exception_type) in [
                    (&calendar.added_dates, ADDED),
                    (&calendar.removed_dates, REMOVED),
                ] {
                    let mut sorted: Vec<&NaiveDate> = dates.iter().collect();
                    sorted.sort();
                    for date in sorted {
                        dates_stmt.execute(params![
                            calendar.service_id.as_str(),
                            format_gtfs_date(*date),
                            exception_type,
                        ])?;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Load every record from a database written by [`ScheduleStore::write_to`]
    pub fn read_from(conn: &Connection) -> Result<Self> {
        let version: String = conn.query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;
        if version != SCHEMA_VERSION.to_string() {
            return Err(TransitError::InvalidData(format!(
                "Schedule store has schema version {version}, expected {SCHEMA_VERSION}"
            )));
        }

        let mut stmt = conn.prepare("SELECT namespace FROM feeds ORDER BY rowid")?;
        let feeds = stmt
            .query_map([], |row| Ok(FeedNamespace::new(row.get::<_, String>(0)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT stop_id, name, lon, lat, parent_station, location_type
             FROM stops ORDER BY rowid",
        )?;
        let stops = stmt
            .query_map([], |row| {
                let lon: Option<f64> = row.get(2)?;
                let lat: Option<f64> = row.get(3)?;
                Ok(Stop {
                    id: StopIdentifier::new(row.get::<_, String>(0)?),
                    name: row.get::<_, String>(1)?.into(),
                    location: lon.zip(lat).map(|(lon, lat)| Point::new(lon, lat)),
                    parent_station: row.get::<_, Option<String>>(4)?.map(StopIdentifier::new),
                    location_type: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT route_id, short_name, long_name, route_type FROM routes ORDER BY rowid",
        )?;
        let routes = stmt
            .query_map([], |row| {
                Ok(Route {
                    id: RouteIdentifier::new(row.get::<_, String>(0)?),
                    short_name: row.get::<_, String>(1)?.into(),
                    long_name: row.get::<_, String>(2)?.into(),
                    route_type: row
                        .get::<_, Option<u16>>(3)?
                        .and_then(RouteType::from_gtfs),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT trip_id, route_id, service_id, direction_id, headsign
             FROM trips ORDER BY rowid",
        )?;
        let trips = stmt
            .query_map([], |row| {
                Ok(Trip {
                    id: TripIdentifier::new(row.get::<_, String>(0)?),
                    route_id: RouteIdentifier::new(row.get::<_, String>(1)?),
                    service_id: ServiceIdentifier::new(row.get::<_, String>(2)?),
                    direction_id: row
                        .get::<_, Option<u8>>(3)?
                        .and_then(DirectionId::from_gtfs),
                    headsign: row.get::<_, Option<String>>(4)?.map(Arc::from),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT trip_id, stop_id, arrival, departure, stop_sequence
             FROM stop_times ORDER BY rowid",
        )?;
        let stop_times = stmt
            .query_map([], |row| {
                Ok(StopTime {
                    trip_id: TripIdentifier::new(row.get::<_, String>(0)?),
                    stop_id: StopIdentifier::new(row.get::<_, String>(1)?),
                    arrival: row.get(2)?,
                    departure: row.get(3)?,
                    stop_sequence: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let calendars = read_calendars(conn)?;

        Ok(Self::from_parts(
            feeds, stops, routes, trips, stop_times, calendars,
        ))
    }
}

fn stored_date(value: &str) -> Result<NaiveDate> {
    parse_gtfs_date(value).ok_or_else(|| {
        TransitError::InvalidData(format!("Schedule store has invalid date {value:?}"))
    })
}

fn read_calendars(conn: &Connection) -> Result<Vec<ServiceCalendar>> {
    let mut stmt =
        conn.prepare("SELECT service_id, date, exception_type FROM calendar_dates ORDER BY rowid")?;
    let exceptions = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u8>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut added: HashMap<String, HashSet<NaiveDate>> = HashMap::new();
    let mut removed: HashMap<String, HashSet<NaiveDate>> = HashMap::new();
    for (service_id, date, exception_type) in exceptions {
        let date = stored_date(&date)?;
        match exception_type {
            ADDED => added.entry(service_id).or_default().insert(date),
            REMOVED => removed.entry(service_id).or_default().insert(date),
            other => {
                return Err(TransitError::InvalidData(format!(
                    "Schedule store has unknown exception type {other}"
                )))
            }
        };
    }

    let mut stmt = conn.prepare(
        "SELECT service_id, weekdays, start_date, end_date FROM calendar ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(service_id, weekdays, start, end)| {
            Ok(ServiceCalendar {
                range: DateRange::new(stored_date(&start)?, stored_date(&end)?),
                weekdays: WeekdayFlags::from_bits(weekdays),
                added_dates: Arc::new(added.remove(&service_id).unwrap_or_default()),
                removed_dates: Arc::new(removed.remove(&service_id).unwrap_or_default()),
                service_id: ServiceIdentifier::new(service_id),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{self, FeedSource};
    use crate::models::traits::ScheduleIndex;
    use crate::test_fixtures::*;

    fn round_trip(store: &ScheduleStore) -> ScheduleStore {
        let mut conn = Connection::open_in_memory().unwrap();
        store.write_to(&mut conn).unwrap();
        ScheduleStore::read_from(&conn).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_records() {
        let store = basic_store();
        let reopened = round_trip(&store);

        assert_eq!(reopened.feeds(), store.feeds());
        assert_eq!(reopened.stops(), store.stops());
        assert_eq!(reopened.routes(), store.routes());
        assert_eq!(reopened.trips(), store.trips());
        assert_eq!(reopened.stop_times(), store.stop_times());
        assert_eq!(reopened.calendars(), store.calendars());
    }

    #[test]
    fn test_round_trip_preserves_exceptions() {
        let tables = with_table(
            basic_tables(),
            feed::CALENDAR_DATES,
            Some("service_id,date,exception_type\nwk,20240101,2\nextra,20240704,1\n"),
        );
        let store = feed::load_feeds(&[FeedSource::in_memory("metro", tables)]).unwrap();
        let reopened = round_trip(&store);

        assert_eq!(reopened.calendars(), store.calendars());
        let extra = reopened
            .calendars()
            .iter()
            .find(|c| c.service_id.as_str() == "metro:extra")
            .unwrap();
        assert!(extra.runs_on(NaiveDate::from_ymd_opt(2024, 7, 4).unwrap()));
    }

    #[test]
    fn test_rejects_unknown_schema_version() {
        let store = basic_store();
        let mut conn = Connection::open_in_memory().unwrap();
        store.write_to(&mut conn).unwrap();
        conn.execute(
            "UPDATE metadata SET value = '99' WHERE key = 'schema_version'",
            [],
        )
        .unwrap();

        let err = ScheduleStore::read_from(&conn).unwrap_err();
        assert!(matches!(err, TransitError::InvalidData(_)));
    }

    #[test]
    fn test_save_and_open_file() {
        let dir = std::env::temp_dir().join(format!("headway_store_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("schedule.sqlite");

        let store = basic_store();
        store.save(&path).unwrap();
        // Saving twice overwrites instead of failing on the existing schema
        store.save(&path).unwrap();

        let reopened = ScheduleStore::open(&path).unwrap();
        assert_eq!(reopened.stop_times(), store.stop_times());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
