//! In-memory schedule store with per-stop visit indices.
//!
//! Built once from loaded feeds (or reopened from its SQLite checkpoint) and
//! read-only afterwards, so one store can be shared by every query worker.

mod sqlite;

pub use sqlite::SCHEMA_VERSION;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::feed::LoadedFeed;
use crate::identifiers::*;
use crate::models::calendar::ServiceCalendar;
use crate::models::traits::ScheduleIndex;
use crate::models::types::*;

/// Indexed, immutable schedule of one or more merged feeds
#[derive(Clone, Debug)]
pub struct ScheduleStore {
    // Core data
    feeds: Vec<FeedNamespace>,
    stops: Vec<Stop>,
    routes: Vec<Route>,
    trips: Vec<Trip>,
    stop_times: Vec<StopTime>,
    calendars: Vec<ServiceCalendar>,

    // Lookup maps
    stop_map: HashMap<StopIdentifier, usize>,
    route_map: HashMap<RouteIdentifier, usize>,
    trip_map: HashMap<TripIdentifier, usize>,

    // stop -> service -> positions in `stop_times`
    visits: HashMap<StopIdentifier, HashMap<ServiceIdentifier, Vec<usize>>>,
}

impl ScheduleStore {
    /// Merge already-namespaced feeds and build the indices
    pub fn from_feeds(feeds: Vec<LoadedFeed>) -> Self {
        let mut namespaces = Vec::with_capacity(feeds.len());
        let mut stops = Vec::new();
        let mut routes = Vec::new();
        let mut trips = Vec::new();
        let mut stop_times = Vec::new();
        let mut calendars = Vec::new();

        for feed in feeds {
            namespaces.push(feed.namespace);
            stops.extend(feed.stops);
            routes.extend(feed.routes);
            trips.extend(feed.trips);
            stop_times.extend(feed.stop_times);
            calendars.extend(feed.calendars);
        }

        Self::from_parts(namespaces, stops, routes, trips, stop_times, calendars)
    }

    pub(crate) fn from_parts(
        feeds: Vec<FeedNamespace>,
        stops: Vec<Stop>,
        routes: Vec<Route>,
        trips: Vec<Trip>,
        stop_times: Vec<StopTime>,
        calendars: Vec<ServiceCalendar>,
    ) -> Self {
        let stop_map: HashMap<_, _> = stops
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        let route_map: HashMap<_, _> = routes
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        let trip_map: HashMap<_, _> = trips
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        let mut visits: HashMap<StopIdentifier, HashMap<ServiceIdentifier, Vec<usize>>> =
            HashMap::new();
        for (i, stop_time) in stop_times.iter().enumerate() {
            // The loader guarantees the trip exists
            let Some(&trip_idx) = trip_map.get(&stop_time.trip_id) else {
                continue;
            };
            visits
                .entry(stop_time.stop_id.clone())
                .or_default()
                .entry(trips[trip_idx].service_id.clone())
                .or_default()
                .push(i);
        }

        tracing::debug!(
            stops = stops.len(),
            served_stops = visits.len(),
            stop_times = stop_times.len(),
            "Built schedule indices"
        );

        Self {
            feeds,
            stops,
            routes,
            trips,
            stop_times,
            calendars,
            stop_map,
            route_map,
            trip_map,
            visits,
        }
    }

    pub fn feeds(&self) -> &[FeedNamespace] {
        &self.feeds
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn stop_times(&self) -> &[StopTime] {
        &self.stop_times
    }

    /// Stops that at least one trip visits, in feed order
    pub fn served_stops(&self) -> Vec<&Stop> {
        self.stops
            .iter()
            .filter(|s| self.visits.contains_key(&s.id))
            .collect()
    }
}

impl ScheduleIndex for ScheduleStore {
    fn stop(&self, id: &StopIdentifier) -> Option<&Stop> {
        self.stop_map.get(id).map(|&i| &self.stops[i])
    }

    fn route(&self, id: &RouteIdentifier) -> Option<&Route> {
        self.route_map.get(id).map(|&i| &self.routes[i])
    }

    fn trip(&self, id: &TripIdentifier) -> Option<&Trip> {
        self.trip_map.get(id).map(|&i| &self.trips[i])
    }

    fn stops(&self) -> &[Stop] {
        &self.stops
    }

    fn calendars(&self) -> &[ServiceCalendar] {
        &self.calendars
    }

    fn stop_times_for(
        &self,
        stop: &StopIdentifier,
        services: &BTreeSet<ServiceIdentifier>,
    ) -> Vec<CandidateTrip> {
        self.stop_times_for_any(std::slice::from_ref(stop), services)
    }

    fn stop_times_for_any(
        &self,
        stops: &[StopIdentifier],
        services: &BTreeSet<ServiceIdentifier>,
    ) -> Vec<CandidateTrip> {
        let mut by_trip: BTreeMap<&TripIdentifier, Vec<VisitTimes>> = BTreeMap::new();

        for stop in stops {
            let Some(per_service) = self.visits.get(stop) else {
                continue;
            };
            for (service, positions) in per_service {
                if !services.contains(service) {
                    continue;
                }
                for &i in positions {
                    let stop_time = &self.stop_times[i];
                    by_trip
                        .entry(&stop_time.trip_id)
                        .or_default()
                        .push(VisitTimes {
                            arrival: stop_time.arrival,
                            departure: stop_time.departure,
                        });
                }
            }
        }

        by_trip
            .into_iter()
            .map(|(trip_id, mut visits)| {
                visits.sort();
                // Only repeats if a stop was listed twice
                visits.dedup();
                CandidateTrip {
                    trip_id: trip_id.clone(),
                    visits,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::*;

    fn services(ids: &[&str]) -> BTreeSet<ServiceIdentifier> {
        ids.iter().map(|id| ServiceIdentifier::new(*id)).collect()
    }

    #[test]
    fn test_lookups() {
        let store = basic_store();
        assert_eq!(store.feeds(), &[FeedNamespace::new("metro")]);
        assert_eq!(
            store.stop(&StopIdentifier::new("metro:A")).unwrap().name.as_ref(),
            "Alpha"
        );
        assert_eq!(
            store.route(&RouteIdentifier::new("metro:R2")).unwrap().long_name.as_ref(),
            "Night Owl"
        );
        assert!(store.trip(&TripIdentifier::new("t1")).is_none());
    }

    #[test]
    fn test_stop_times_filtered_by_service() {
        let store = basic_store();
        let stop = StopIdentifier::new("metro:A");

        let weekday = store.stop_times_for(&stop, &services(&["metro:wk"]));
        let trips: Vec<&str> = weekday.iter().map(|c| c.trip_id.as_str()).collect();
        assert_eq!(trips, vec!["metro:t1", "metro:t2", "metro:t5"]);

        let saturday = store.stop_times_for(&stop, &services(&["metro:sat"]));
        assert_eq!(saturday.len(), 1);
        assert_eq!(saturday[0].trip_id.as_str(), "metro:t4");

        assert!(store.stop_times_for(&stop, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_stop_times_for_any_merges_trips() {
        let store = basic_store();
        let stops = vec![StopIdentifier::new("metro:A"), StopIdentifier::new("metro:B")];

        let candidates = store.stop_times_for_any(&stops, &services(&["metro:wk"]));
        let trips: Vec<&str> = candidates.iter().map(|c| c.trip_id.as_str()).collect();
        // t1 and t2 visit both stops but appear once each
        assert_eq!(trips, vec!["metro:t1", "metro:t2", "metro:t3", "metro:t5"]);

        let t1 = &candidates[0];
        assert_eq!(t1.visits.len(), 2);
        assert_eq!(t1.visits[0].arrival, 8 * 3600);
        assert_eq!(t1.visits[1].arrival, 8 * 3600 + 5 * 60);
    }

    #[test]
    fn test_repeated_stop_in_query_does_not_duplicate_visits() {
        let store = basic_store();
        let stops = vec![StopIdentifier::new("metro:C"), StopIdentifier::new("metro:C")];
        let candidates = store.stop_times_for_any(&stops, &services(&["metro:wk"]));
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.visits.len() == 1));
    }

    #[test]
    fn test_served_stops() {
        let store = basic_store();
        assert_eq!(store.served_stops().len(), 3);
    }
}
