//! # headway-transit
//!
//! Service frequency analysis over GTFS schedules.
//!
//! ## Features
//!
//! - **Multi-feed loading**: Merge several GTFS feeds under namespaced identifiers
//! - **Calendar resolution**: Weekday or specific-date service selection, with
//!   warnings for seasonal calendars that never overlap
//! - **Window queries**: Distinct trips per stop or stop set, including windows
//!   that run past midnight
//! - **Frequency statistics**: Trips per hour, average headway, longest wait
//! - **Coverage overlay**: Split overlapping stop service areas into disjoint
//!   regions so shared trips are counted once
//! - **Persistence**: Checkpoint the indexed schedule to a single SQLite file
//!
//! ## Example
//!
//! ```
//! use headway_transit::prelude::*;
//! use chrono::Weekday;
//!
//! let source = FeedSource::in_memory("demo", [
//!     ("stops.txt", "stop_id,stop_name,stop_lat,stop_lon\nS1,Main St,40.75,-73.99\n"),
//!     ("routes.txt", "route_id,route_short_name,route_long_name,route_type\nR,1,Main,3\n"),
//!     ("calendar.txt", "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\nWK,1,1,1,1,1,0,0,20240101,20241231\n"),
//!     ("trips.txt", "route_id,service_id,trip_id\nR,WK,T1\nR,WK,T2\n"),
//!     ("stop_times.txt", "trip_id,arrival_time,departure_time,stop_id,stop_sequence\nT1,08:00:00,08:00:00,S1,1\nT2,08:20:00,08:20:00,S1,1\n"),
//! ]);
//! let store = load_feeds(&[source]).unwrap();
//!
//! let config = QueryConfig {
//!     day: ServiceDay::Weekday(Weekday::Tue),
//!     window_start: 7 * 60,
//!     window_end: 9 * 60,
//!     mode: TimeMode::Departures,
//!     compute_max_wait: true,
//!     reference_range: None,
//! };
//! let report = run_units(&store, &config, &[QueryUnit::Stop(StopIdentifier::new("demo:S1"))]);
//!
//! let row = report.outcomes[0].result.as_ref().unwrap();
//! assert_eq!(row.stats.num_trips, 2);
//! assert_eq!(row.stats.avg_headway, Some(20.0));
//! ```

pub mod analysis;
pub mod feed;
pub mod identifiers;
pub mod models;
pub mod query;
pub mod resolver;
pub mod spatial;
pub mod store;

#[cfg(test)]
mod test_fixtures;

// Re-exports for convenience
pub mod prelude {
    pub use crate::analysis::{
        run_route_units, run_units, run_units_with_progress, BatchReport, FrequencyRow,
        QueryConfig, QueryUnit, UnitOutcome,
    };
    pub use crate::feed::{load_feed, load_feeds, FeedSource, LoadedFeed};
    pub use crate::identifiers::*;
    pub use crate::models::{calendar::*, traits::*, types::*};
    pub use crate::query::{
        trips_in_window, trips_in_window_by_route, FrequencyStats, TimeMode, TimeWindow, TripVisit,
    };
    pub use crate::resolver::{ActiveServices, CalendarResolver, NonOverlappingCalendarWarning};
    pub use crate::spatial::{
        decompose, BufferGenerator, CircularBuffer, CoverageArea, OverlayFailure, OverlayResult,
        Region, StopIndex,
    };
    pub use crate::store::ScheduleStore;
}

pub use prelude::*;
