//! Window queries over candidate trips.
//!
//! Visits are compared in the unbounded service-day representation: a window
//! of `[1380, 1500)` minutes covers 23:00 through 25:00, which picks up a
//! stop time written as `24:20:00` but not one written as `00:30:00`.

pub mod stats;

pub use stats::FrequencyStats;

use std::collections::BTreeMap;
use std::fmt;

use crate::identifiers::{RouteIdentifier, TripIdentifier};
use crate::models::traits::ScheduleIndex;
use crate::models::types::{CandidateTrip, DirectionId, Result, TransitError};

const SECONDS_PER_MINUTE: u32 = 60;

/// Half-open analysis window in minutes since service-day midnight
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: u32,
    end: u32,
}

impl TimeWindow {
    /// Latest accepted end, so that window bounds convert to seconds
    pub const MAX_MINUTE: u32 = u32::MAX / SECONDS_PER_MINUTE;

    /// `end` may exceed 1440 for windows that run past midnight
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if end <= start || end > Self::MAX_MINUTE {
            return Err(TransitError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn minutes(&self) -> u32 {
        self.end - self.start
    }

    pub fn hours(&self) -> f64 {
        f64::from(self.minutes()) / 60.0
    }

    pub fn start_seconds(&self) -> u32 {
        self.start * SECONDS_PER_MINUTE
    }

    pub fn end_seconds(&self) -> u32 {
        self.end * SECONDS_PER_MINUTE
    }

    pub fn contains_seconds(&self, t: u32) -> bool {
        self.start_seconds() <= t && t < self.end_seconds()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

/// Which side of a visit is compared against the window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeMode {
    Arrivals,
    #[default]
    Departures,
}

/// One trip's earliest visit inside the window
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TripVisit {
    /// Seconds since service-day midnight
    pub timestamp: u32,
    pub trip_id: TripIdentifier,
}

impl TripVisit {
    pub fn minutes(&self) -> f64 {
        f64::from(self.timestamp) / f64::from(SECONDS_PER_MINUTE)
    }
}

/// Distinct trips with a visit in `window`, sorted by (timestamp, trip id)
pub fn trips_in_window(
    candidates: &[CandidateTrip],
    window: &TimeWindow,
    mode: TimeMode,
) -> Vec<TripVisit> {
    let mut visits: Vec<TripVisit> = candidates
        .iter()
        .filter_map(|candidate| {
            candidate
                .visits
                .iter()
                .map(|v| match mode {
                    TimeMode::Arrivals => v.arrival,
                    TimeMode::Departures => v.departure,
                })
                .filter(|&t| window.contains_seconds(t))
                .min()
                .map(|timestamp| TripVisit {
                    timestamp,
                    trip_id: candidate.trip_id.clone(),
                })
        })
        .collect();

    visits.sort();
    visits
}

/// Route and direction a trip is counted under
pub type RouteKey = (RouteIdentifier, Option<DirectionId>);

/// Same as [`trips_in_window`], split by the route and direction of each trip.
///
/// Trips the index cannot resolve are skipped.
pub fn trips_in_window_by_route<I: ScheduleIndex + ?Sized>(
    index: &I,
    candidates: &[CandidateTrip],
    window: &TimeWindow,
    mode: TimeMode,
) -> BTreeMap<RouteKey, Vec<TripVisit>> {
    let mut grouped: BTreeMap<RouteKey, Vec<TripVisit>> = BTreeMap::new();

    for visit in trips_in_window(candidates, window, mode) {
        let Some(trip) = index.trip(&visit.trip_id) else {
            tracing::warn!(trip = %visit.trip_id, "Visit references a trip missing from the index");
            continue;
        };
        grouped
            .entry((trip.route_id.clone(), trip.direction_id))
            .or_default()
            .push(visit);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{ServiceIdentifier, StopIdentifier};
    use crate::models::types::VisitTimes;
    use crate::test_fixtures::basic_store;
    use std::collections::BTreeSet;

    fn candidate(id: &str, times: &[(u32, u32)]) -> CandidateTrip {
        CandidateTrip {
            trip_id: TripIdentifier::new(id),
            visits: times
                .iter()
                .map(|&(arrival, departure)| VisitTimes { arrival, departure })
                .collect(),
        }
    }

    fn weekday() -> BTreeSet<ServiceIdentifier> {
        BTreeSet::from([ServiceIdentifier::new("metro:wk")])
    }

    #[test]
    fn test_window_validation() {
        assert!(TimeWindow::new(420, 540).is_ok());
        assert!(matches!(
            TimeWindow::new(540, 540),
            Err(TransitError::InvalidWindow { start: 540, end: 540 })
        ));
        assert!(TimeWindow::new(600, 540).is_err());
        assert!(matches!(
            TimeWindow::new(0, u32::MAX),
            Err(TransitError::InvalidWindow { .. })
        ));
        let widest = TimeWindow::new(0, TimeWindow::MAX_MINUTE).unwrap();
        assert!(widest.contains_seconds(widest.end_seconds() - 1));

        let window = TimeWindow::new(1380, 1500).unwrap();
        assert_eq!(window.minutes(), 120);
        assert_eq!(window.hours(), 2.0);
        assert_eq!(window.to_string(), "23:00-25:00");
    }

    #[test]
    fn test_window_is_half_open() {
        let window = TimeWindow::new(480, 540).unwrap();
        let candidates = vec![
            candidate("start", &[(480 * 60, 480 * 60)]),
            candidate("end", &[(540 * 60, 540 * 60)]),
            candidate("before", &[(479 * 60, 479 * 60)]),
        ];
        let visits = trips_in_window(&candidates, &window, TimeMode::Departures);
        let ids: Vec<&str> = visits.iter().map(|v| v.trip_id.as_str()).collect();
        assert_eq!(ids, vec!["start"]);
    }

    #[test]
    fn test_arrivals_and_departures_differ() {
        // Arrives 08:59, leaves 09:01
        let candidates = vec![candidate("t", &[(539 * 60, 541 * 60)])];
        let window = TimeWindow::new(540, 600).unwrap();

        assert!(trips_in_window(&candidates, &window, TimeMode::Arrivals).is_empty());
        assert_eq!(
            trips_in_window(&candidates, &window, TimeMode::Departures).len(),
            1
        );
    }

    #[test]
    fn test_trip_through_two_stops_counts_once() {
        let store = basic_store();
        let stops = [StopIdentifier::new("metro:A"), StopIdentifier::new("metro:B")];
        let candidates = store.stop_times_for_any(&stops, &weekday());

        let window = TimeWindow::new(480, 490).unwrap();
        let visits = trips_in_window(&candidates, &window, TimeMode::Arrivals);

        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].trip_id.as_str(), "metro:t1");
        assert_eq!(visits[0].timestamp, 8 * 3600);
    }

    #[test]
    fn test_earliest_in_window_visit_wins() {
        // Only the second visit of the trip falls inside the window
        let candidates = vec![candidate("loop", &[(400 * 60, 400 * 60), (500 * 60, 500 * 60)])];
        let window = TimeWindow::new(450, 550).unwrap();
        let visits = trips_in_window(&candidates, &window, TimeMode::Arrivals);
        assert_eq!(visits[0].timestamp, 500 * 60);
    }

    #[test]
    fn test_midnight_crossing_window() {
        let candidates = vec![
            candidate("late", &[(1460 * 60, 1460 * 60)]),
            candidate("early", &[(30 * 60, 30 * 60)]),
        ];
        let window = TimeWindow::new(1380, 1500).unwrap();
        let visits = trips_in_window(&candidates, &window, TimeMode::Arrivals);

        let ids: Vec<&str> = visits.iter().map(|v| v.trip_id.as_str()).collect();
        assert_eq!(ids, vec!["late"]);
        assert_eq!(visits[0].minutes(), 1460.0);
    }

    #[test]
    fn test_sorted_by_time_then_trip() {
        let candidates = vec![
            candidate("b", &[(600 * 60, 600 * 60)]),
            candidate("c", &[(590 * 60, 590 * 60)]),
            candidate("a", &[(600 * 60, 600 * 60)]),
        ];
        let window = TimeWindow::new(0, 1440).unwrap();
        let visits = trips_in_window(&candidates, &window, TimeMode::Departures);
        let ids: Vec<&str> = visits.iter().map(|v| v.trip_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_grouped_by_route_and_direction() {
        let store = basic_store();
        let candidates = store.stop_times_for(&StopIdentifier::new("metro:B"), &weekday());
        let window = TimeWindow::new(0, 1440).unwrap();

        let grouped = trips_in_window_by_route(&store, &candidates, &window, TimeMode::Departures);

        let r1 = &grouped[&(RouteIdentifier::new("metro:R1"), Some(DirectionId::Outbound))];
        assert_eq!(r1.len(), 2);
        let r2 = &grouped[&(RouteIdentifier::new("metro:R2"), Some(DirectionId::Inbound))];
        assert_eq!(r2.len(), 1);
        assert_eq!(grouped.len(), 2);
    }
}
