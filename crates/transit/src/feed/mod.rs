//! GTFS feed loading.
//!
//! Reads the stops, routes, trips, stop_times and calendar tables of one or
//! more feeds, validates them and namespaces every identifier with the feed's
//! name. Any invalid row fails the whole load: a partially loaded schedule
//! would silently skew every statistic computed from it.

pub(crate) mod records;
pub mod time;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use geo::Point;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::identifiers::*;
use crate::models::calendar::{DateRange, ServiceCalendar, WeekdayFlags};
use crate::models::types::*;
use crate::store::ScheduleStore;

use records::*;
use time::{parse_gtfs_date, parse_gtfs_time};

pub const STOPS: &str = "stops.txt";
pub const ROUTES: &str = "routes.txt";
pub const TRIPS: &str = "trips.txt";
pub const STOP_TIMES: &str = "stop_times.txt";
pub const CALENDAR: &str = "calendar.txt";
pub const CALENDAR_DATES: &str = "calendar_dates.txt";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Where the tables of one feed live
#[derive(Clone, Debug)]
pub enum FeedLocation {
    /// An unpacked GTFS directory
    Directory(PathBuf),
    /// Table contents keyed by file name (e.g. `"stops.txt"`)
    Tables(BTreeMap<String, String>),
}

/// One feed to load, with the namespace its identifiers will carry
#[derive(Clone, Debug)]
pub struct FeedSource {
    pub namespace: FeedNamespace,
    pub location: FeedLocation,
}

impl FeedSource {
    pub fn directory(namespace: impl AsRef<str>, path: impl Into<PathBuf>) -> Self {
        Self {
            namespace: FeedNamespace::new(namespace),
            location: FeedLocation::Directory(path.into()),
        }
    }

    /// Use the directory's own name as the namespace
    pub fn from_directory(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let namespace = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "feed".to_string());
        Self::directory(namespace, path)
    }

    pub fn in_memory<'a>(
        namespace: impl AsRef<str>,
        tables: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            namespace: FeedNamespace::new(namespace),
            location: FeedLocation::Tables(
                tables
                    .into_iter()
                    .map(|(name, contents)| (name.to_string(), contents.to_string()))
                    .collect(),
            ),
        }
    }

    /// Raw bytes of one table, or `None` if the feed doesn't have it
    fn read_table(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut bytes = match &self.location {
            FeedLocation::Directory(dir) => {
                let path = dir.join(name);
                if !path.exists() {
                    return Ok(None);
                }
                std::fs::read(&path)?
            }
            FeedLocation::Tables(tables) => match tables.get(name) {
                Some(contents) => contents.as_bytes().to_vec(),
                None => return Ok(None),
            },
        };
        if bytes.starts_with(UTF8_BOM) {
            bytes.drain(..UTF8_BOM.len());
        }
        Ok(Some(bytes))
    }

    fn require_table(&self, name: &str) -> Result<Vec<u8>> {
        self.read_table(name)?.ok_or_else(|| {
            TransitError::InvalidData(format!("Feed {} is missing {}", self.namespace, name))
        })
    }
}

/// Validated, namespaced records of a single feed
#[derive(Clone, Debug)]
pub struct LoadedFeed {
    pub namespace: FeedNamespace,
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub stop_times: Vec<StopTime>,
    pub calendars: Vec<ServiceCalendar>,
}

/// Load and merge several feeds into one indexed schedule.
///
/// Fails on the first feed that doesn't load; no partial store is returned.
pub fn load_feeds(sources: &[FeedSource]) -> Result<ScheduleStore> {
    let mut namespaces = HashSet::new();
    for source in sources {
        check_namespace(&source.namespace)?;
        if !namespaces.insert(source.namespace.clone()) {
            return Err(TransitError::DuplicateNamespace(source.namespace.clone()));
        }
    }

    let feeds = sources
        .iter()
        .map(load_feed)
        .collect::<Result<Vec<_>>>()?;
    Ok(ScheduleStore::from_feeds(feeds))
}

/// A namespace holding the separator could rebuild another feed's ids
/// (`a` + `b:c` against `a:b` + `c`).
fn check_namespace(namespace: &FeedNamespace) -> Result<()> {
    let name = namespace.as_str();
    if name.is_empty() || name.contains(NAMESPACE_SEPARATOR) {
        return Err(TransitError::InvalidNamespace(namespace.clone()));
    }
    Ok(())
}

#[tracing::instrument(skip_all, fields(feed = %source.namespace))]
pub fn load_feed(source: &FeedSource) -> Result<LoadedFeed> {
    check_namespace(&source.namespace)?;
    let calendars = load_calendars(source)?;
    let service_ids: HashSet<ServiceIdentifier> =
        calendars.iter().map(|c| c.service_id.clone()).collect();

    let stops = load_stops(source)?;
    let routes = load_routes(source)?;
    let route_ids: HashSet<RouteIdentifier> = routes.iter().map(|r| r.id.clone()).collect();

    let trips = load_trips(source, &route_ids, &service_ids)?;
    let stop_ids: HashSet<StopIdentifier> = stops.iter().map(|s| s.id.clone()).collect();
    let trip_ids: HashSet<TripIdentifier> = trips.iter().map(|t| t.id.clone()).collect();

    let stop_times = load_stop_times(source, &stop_ids, &trip_ids)?;

    info!(
        stops = stops.len(),
        routes = routes.len(),
        trips = trips.len(),
        stop_times = stop_times.len(),
        services = calendars.len(),
        "Loaded feed"
    );

    Ok(LoadedFeed {
        namespace: source.namespace.clone(),
        stops,
        routes,
        trips,
        stop_times,
        calendars,
    })
}

fn table_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes)
}

fn parse_rows<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let mut rows = Vec::new();
    for rec in table_reader(bytes).deserialize() {
        rows.push(rec?);
    }
    Ok(rows)
}

fn parse_date(feed: &FeedNamespace, table: &'static str, value: &str) -> Result<NaiveDate> {
    parse_gtfs_date(value).ok_or_else(|| TransitError::InvalidDate {
        feed: feed.clone(),
        table,
        value: value.to_string(),
    })
}

fn parse_time(feed: &FeedNamespace, value: &str) -> Result<u32> {
    parse_gtfs_time(value).ok_or_else(|| TransitError::InvalidTime {
        feed: feed.clone(),
        table: STOP_TIMES,
        value: value.to_string(),
    })
}

fn load_calendars(source: &FeedSource) -> Result<Vec<ServiceCalendar>> {
    let ns = &source.namespace;
    let missing = || TransitError::MissingCalendar { feed: ns.clone() };

    let bytes = source.read_table(CALENDAR)?.ok_or_else(missing)?;
    let rows: Vec<CalendarRecord> = parse_rows(&bytes)?;
    if rows.is_empty() {
        return Err(missing());
    }

    let mut order = Vec::with_capacity(rows.len());
    let mut weekly: HashMap<String, (DateRange, WeekdayFlags)> = HashMap::new();
    for rec in rows {
        let range = DateRange::new(
            parse_date(ns, CALENDAR, &rec.start_date)?,
            parse_date(ns, CALENDAR, &rec.end_date)?,
        );
        let weekdays = WeekdayFlags::from_bools(
            rec.monday,
            rec.tuesday,
            rec.wednesday,
            rec.thursday,
            rec.friday,
            rec.saturday,
            rec.sunday,
        );
        if weekly.contains_key(&rec.service_id) {
            return Err(TransitError::DuplicateIdentifier {
                feed: ns.clone(),
                table: CALENDAR,
                id: rec.service_id,
            });
        }
        order.push(rec.service_id.clone());
        weekly.insert(rec.service_id, (range, weekdays));
    }

    let mut added: HashMap<String, HashSet<NaiveDate>> = HashMap::new();
    let mut removed: HashMap<String, HashSet<NaiveDate>> = HashMap::new();
    // Services that only exist as exceptions, with the span of their dates
    let mut exception_only: Vec<String> = Vec::new();
    let mut exception_spans: HashMap<String, DateRange> = HashMap::new();

    if let Some(bytes) = source.read_table(CALENDAR_DATES)? {
        for rec in parse_rows::<CalendarDateRecord>(&bytes)? {
            let date = parse_date(ns, CALENDAR_DATES, &rec.date)?;
            match rec.exception_type {
                1 => {
                    added.entry(rec.service_id.clone()).or_default().insert(date);
                }
                2 => {
                    removed.entry(rec.service_id.clone()).or_default().insert(date);
                }
                other => {
                    return Err(TransitError::InvalidData(format!(
                        "Feed {ns}: unknown exception_type {other} for service {}",
                        rec.service_id
                    )));
                }
            }

            if !weekly.contains_key(&rec.service_id) {
                match exception_spans.get_mut(&rec.service_id) {
                    Some(span) => {
                        span.start = span.start.min(date);
                        span.end = span.end.max(date);
                    }
                    None => {
                        exception_only.push(rec.service_id.clone());
                        exception_spans.insert(rec.service_id, DateRange::new(date, date));
                    }
                }
            }
        }
    }

    if !exception_only.is_empty() {
        debug!(
            count = exception_only.len(),
            "Services defined only in calendar_dates.txt; they never match a weekday query"
        );
    }

    let mut calendars = Vec::with_capacity(order.len() + exception_only.len());
    let with_weekly = order.into_iter().filter_map(|id| {
        weekly
            .get(&id)
            .map(|(range, weekdays)| (id.clone(), *range, *weekdays))
    });
    let without_weekly = exception_only.into_iter().filter_map(|id| {
        exception_spans
            .get(&id)
            .map(|range| (id.clone(), *range, WeekdayFlags::new()))
    });
    for (id, range, weekdays) in with_weekly.chain(without_weekly) {
        calendars.push(ServiceCalendar {
            service_id: ServiceIdentifier::namespaced(ns, &id),
            range,
            weekdays,
            added_dates: Arc::new(added.remove(&id).unwrap_or_default()),
            removed_dates: Arc::new(removed.remove(&id).unwrap_or_default()),
        });
    }

    Ok(calendars)
}

fn load_stops(source: &FeedSource) -> Result<Vec<Stop>> {
    let ns = &source.namespace;
    let rows: Vec<StopRecord> = parse_rows(&source.require_table(STOPS)?)?;

    let mut seen = HashSet::with_capacity(rows.len());
    let mut stops = Vec::with_capacity(rows.len());
    for rec in rows {
        if !seen.insert(rec.stop_id.clone()) {
            return Err(TransitError::DuplicateIdentifier {
                feed: ns.clone(),
                table: STOPS,
                id: rec.stop_id,
            });
        }
        let location = match (rec.stop_lon, rec.stop_lat) {
            (Some(lon), Some(lat)) => Some(Point::new(lon, lat)),
            _ => None,
        };
        stops.push(Stop {
            id: StopIdentifier::namespaced(ns, &rec.stop_id),
            name: rec.stop_name.unwrap_or_default().into(),
            location,
            parent_station: rec
                .parent_station
                .filter(|p| !p.is_empty())
                .map(|p| StopIdentifier::namespaced(ns, p)),
            location_type: rec.location_type,
        });
    }

    let known: HashSet<StopIdentifier> = stops.iter().map(|s| s.id.clone()).collect();
    for stop in &mut stops {
        let dangling = stop
            .parent_station
            .as_ref()
            .is_some_and(|parent| !known.contains(parent));
        if dangling {
            warn!(stop = %stop.id, "Dropping reference to unknown parent station");
            stop.parent_station = None;
        }
    }

    Ok(stops)
}

fn load_routes(source: &FeedSource) -> Result<Vec<Route>> {
    let ns = &source.namespace;
    let rows: Vec<RouteRecord> = parse_rows(&source.require_table(ROUTES)?)?;

    let mut seen = HashSet::with_capacity(rows.len());
    let mut routes = Vec::with_capacity(rows.len());
    for rec in rows {
        if !seen.insert(rec.route_id.clone()) {
            return Err(TransitError::DuplicateIdentifier {
                feed: ns.clone(),
                table: ROUTES,
                id: rec.route_id,
            });
        }
        routes.push(Route {
            id: RouteIdentifier::namespaced(ns, &rec.route_id),
            short_name: rec.route_short_name.unwrap_or_default().into(),
            long_name: rec.route_long_name.unwrap_or_default().into(),
            route_type: rec.route_type.and_then(RouteType::from_gtfs),
        });
    }
    Ok(routes)
}

fn load_trips(
    source: &FeedSource,
    route_ids: &HashSet<RouteIdentifier>,
    service_ids: &HashSet<ServiceIdentifier>,
) -> Result<Vec<Trip>> {
    let ns = &source.namespace;
    let rows: Vec<TripRecord> = parse_rows(&source.require_table(TRIPS)?)?;

    let mut seen = HashSet::with_capacity(rows.len());
    let mut trips = Vec::with_capacity(rows.len());
    for rec in rows {
        if !seen.insert(rec.trip_id.clone()) {
            return Err(TransitError::DuplicateIdentifier {
                feed: ns.clone(),
                table: TRIPS,
                id: rec.trip_id,
            });
        }

        let route_id = RouteIdentifier::namespaced(ns, &rec.route_id);
        if !route_ids.contains(&route_id) {
            return Err(TransitError::UnknownReference {
                feed: ns.clone(),
                table: TRIPS,
                field: "route_id",
                id: rec.route_id,
            });
        }

        let service_id = ServiceIdentifier::namespaced(ns, &rec.service_id);
        if !service_ids.contains(&service_id) {
            return Err(TransitError::UnknownReference {
                feed: ns.clone(),
                table: TRIPS,
                field: "service_id",
                id: rec.service_id,
            });
        }

        trips.push(Trip {
            id: TripIdentifier::namespaced(ns, &rec.trip_id),
            route_id,
            service_id,
            direction_id: rec.direction_id.and_then(DirectionId::from_gtfs),
            headsign: rec
                .trip_headsign
                .filter(|h| !h.is_empty())
                .map(Arc::from),
        });
    }
    Ok(trips)
}

fn load_stop_times(
    source: &FeedSource,
    stop_ids: &HashSet<StopIdentifier>,
    trip_ids: &HashSet<TripIdentifier>,
) -> Result<Vec<StopTime>> {
    let ns = &source.namespace;
    let bytes = source.require_table(STOP_TIMES)?;

    let mut reader = table_reader(&bytes);
    let headers = reader.headers()?.clone();
    let mut record = csv::StringRecord::new();

    let mut stop_times = Vec::new();
    let mut index = 0u32;
    while reader.read_record(&mut record)? {
        let rec: StopTimeRecord = record.deserialize(Some(&headers))?;
        // Quoted fields may span lines, so ask the reader where the row began
        let line = record.position().map_or(0, |pos| pos.line());

        let arrival = rec.arrival_time.as_deref().filter(|v| !v.is_empty());
        let departure = rec.departure_time.as_deref().filter(|v| !v.is_empty());
        let (Some(arrival), Some(departure)) = (arrival, departure) else {
            return Err(TransitError::IncompleteStopTime {
                feed: ns.clone(),
                trip_id: rec.trip_id,
                stop_id: rec.stop_id,
                line,
            });
        };
        let arrival = parse_time(ns, arrival)?;
        let departure = parse_time(ns, departure)?;

        let trip_id = TripIdentifier::namespaced(ns, &rec.trip_id);
        if !trip_ids.contains(&trip_id) {
            return Err(TransitError::UnknownReference {
                feed: ns.clone(),
                table: STOP_TIMES,
                field: "trip_id",
                id: rec.trip_id,
            });
        }
        let stop_id = StopIdentifier::namespaced(ns, &rec.stop_id);
        if !stop_ids.contains(&stop_id) {
            return Err(TransitError::UnknownReference {
                feed: ns.clone(),
                table: STOP_TIMES,
                field: "stop_id",
                id: rec.stop_id,
            });
        }

        stop_times.push(StopTime {
            trip_id,
            stop_id,
            arrival,
            departure,
            stop_sequence: rec.stop_sequence.unwrap_or(index),
        });
        index += 1;
    }
    Ok(stop_times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::traits::ScheduleIndex;
    use crate::test_fixtures::*;
    use chrono::Weekday;

    #[test]
    fn test_load_namespaces_every_identifier() {
        let feed = load_feed(&FeedSource::in_memory("metro", basic_tables())).unwrap();

        assert_eq!(feed.stops.len(), 3);
        assert!(feed.stops.iter().all(|s| s.id.as_str().starts_with("metro:")));
        assert!(feed.trips.iter().all(|t| t.service_id.as_str().starts_with("metro:")));
        assert_eq!(feed.stop_times[0].trip_id, TripIdentifier::new("metro:t1"));
        assert_eq!(feed.stop_times[0].arrival, 8 * 3600);

        let weekday = feed
            .calendars
            .iter()
            .find(|c| c.service_id.as_str() == "metro:wk")
            .unwrap();
        assert!(weekday.runs_on_weekday(Weekday::Mon));
        assert!(!weekday.runs_on_weekday(Weekday::Sat));
    }

    #[test]
    fn test_missing_calendar_is_fatal() {
        let tables = with_table(basic_tables(), CALENDAR, None);
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        assert!(matches!(err, TransitError::MissingCalendar { .. }));
    }

    #[test]
    fn test_exception_only_calendar_is_fatal() {
        let tables = with_table(
            basic_tables(),
            CALENDAR,
            Some("service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n"),
        );
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        assert!(matches!(err, TransitError::MissingCalendar { .. }));
    }

    #[test]
    fn test_blank_arrival_aborts_the_load() {
        let tables = with_table(
            basic_tables(),
            STOP_TIMES,
            Some(
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                 t1,08:00:00,08:00:00,A,1\n\
                 t1,,08:05:00,B,2\n",
            ),
        );
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        match err {
            TransitError::IncompleteStopTime {
                trip_id, stop_id, line, ..
            } => {
                assert_eq!(trip_id, "t1");
                assert_eq!(stop_id, "B");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_blank_time_line_counts_multiline_fields() {
        let tables = with_table(
            basic_tables(),
            STOP_TIMES,
            Some(
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence,stop_headsign\n\
                 t1,08:00:00,08:00:00,A,1,\"Downtown\nvia Main St\"\n\
                 t1,,08:05:00,B,2,Downtown\n",
            ),
        );
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        assert!(matches!(err, TransitError::IncompleteStopTime { line: 4, .. }));
    }

    #[test]
    fn test_blank_departure_aborts_the_load() {
        let tables = with_table(
            basic_tables(),
            STOP_TIMES,
            Some(
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                 t1,08:00:00,,A,1\n",
            ),
        );
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        assert!(matches!(err, TransitError::IncompleteStopTime { .. }));
    }

    #[test]
    fn test_unknown_stop_reference() {
        let tables = with_table(
            basic_tables(),
            STOP_TIMES,
            Some(
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                 t1,08:00:00,08:00:00,nowhere,1\n",
            ),
        );
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        assert!(matches!(
            err,
            TransitError::UnknownReference { field: "stop_id", .. }
        ));
    }

    #[test]
    fn test_trip_with_unknown_service() {
        let tables = with_table(
            basic_tables(),
            TRIPS,
            Some("route_id,service_id,trip_id\nR1,holiday,t1\n"),
        );
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        assert!(matches!(
            err,
            TransitError::UnknownReference { field: "service_id", .. }
        ));
    }

    #[test]
    fn test_duplicate_stop_id() {
        let tables = with_table(
            basic_tables(),
            STOPS,
            Some("stop_id,stop_name,stop_lat,stop_lon\nA,First,0.0,0.0\nA,Again,0.0,0.0\n"),
        );
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        assert!(matches!(
            err,
            TransitError::DuplicateIdentifier { table: STOPS, .. }
        ));
    }

    #[test]
    fn test_invalid_time() {
        let tables = with_table(
            basic_tables(),
            STOP_TIMES,
            Some(
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                 t1,8am,08:00:00,A,1\n",
            ),
        );
        let err = load_feed(&FeedSource::in_memory("metro", tables)).unwrap_err();
        assert!(matches!(err, TransitError::InvalidTime { .. }));
    }

    #[test]
    fn test_calendar_dates_exceptions_and_exception_only_services() {
        let tables = with_table(
            basic_tables(),
            CALENDAR_DATES,
            Some(
                "service_id,date,exception_type\n\
                 wk,20240101,2\n\
                 special,20240704,1\n\
                 special,20240705,1\n",
            ),
        );
        let feed = load_feed(&FeedSource::in_memory("metro", tables)).unwrap();

        let weekday = feed
            .calendars
            .iter()
            .find(|c| c.service_id.as_str() == "metro:wk")
            .unwrap();
        assert!(!weekday.runs_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));

        let special = feed
            .calendars
            .iter()
            .find(|c| c.service_id.as_str() == "metro:special")
            .unwrap();
        assert!(special.weekdays.is_empty());
        assert_eq!(special.range.start, NaiveDate::from_ymd_opt(2024, 7, 4).unwrap());
        assert_eq!(special.range.end, NaiveDate::from_ymd_opt(2024, 7, 5).unwrap());
        assert!(special.runs_on(NaiveDate::from_ymd_opt(2024, 7, 4).unwrap()));
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let stops = "\u{feff}stop_id,stop_name,stop_lat,stop_lon\nA,Alpha,0.0,0.0\nB,Beta,0.0,0.01\nC,Gamma,0.0,0.02\n";
        let tables = with_table(basic_tables(), STOPS, Some(stops));
        let feed = load_feed(&FeedSource::in_memory("metro", tables)).unwrap();
        assert_eq!(feed.stops[0].id.as_str(), "metro:A");
    }

    #[test]
    fn test_duplicate_namespace_rejected() {
        let sources = vec![
            FeedSource::in_memory("metro", basic_tables()),
            FeedSource::in_memory("metro", basic_tables()),
        ];
        let err = load_feeds(&sources).unwrap_err();
        assert!(matches!(err, TransitError::DuplicateNamespace(_)));
    }

    #[test]
    fn test_namespace_with_separator_rejected() {
        // "a" + "b:c" would collide with "a:b" + "c"
        let stops = "stop_id,stop_name,stop_lat,stop_lon\nb:c,First feed stop,0.0,0.0\nA,Alpha,0.0,0.0\nB,Beta,0.0,0.01\nC,Gamma,0.0,0.02\n";
        let sources = vec![
            FeedSource::in_memory("a", with_table(basic_tables(), STOPS, Some(stops))),
            FeedSource::in_memory("a:b", basic_tables()),
        ];
        let err = load_feeds(&sources).unwrap_err();
        assert!(matches!(err, TransitError::InvalidNamespace(ref ns) if ns.as_str() == "a:b"));

        let err = load_feed(&FeedSource::in_memory("", basic_tables())).unwrap_err();
        assert!(matches!(err, TransitError::InvalidNamespace(_)));
    }

    #[test]
    fn test_merged_feeds_keep_ids_apart() {
        let sources = vec![
            FeedSource::in_memory("north", basic_tables()),
            FeedSource::in_memory("south", basic_tables()),
        ];
        let store = load_feeds(&sources).unwrap();
        assert_eq!(store.stops().len(), 6);
        assert!(store.trip(&TripIdentifier::new("north:t1")).is_some());
        assert!(store.trip(&TripIdentifier::new("south:t1")).is_some());
    }
}
