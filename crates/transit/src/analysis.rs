//! Batch frequency analysis over stops, points and regions.
//!
//! Services are resolved once per batch; units are then evaluated in parallel
//! against the shared, read-only schedule. Per-unit problems (an unknown stop,
//! a malformed window) are reported next to the unit instead of failing the
//! batch.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::identifiers::StopIdentifier;
use crate::models::calendar::{DateRange, ServiceDay};
use crate::models::traits::ScheduleIndex;
use crate::models::types::{Result, TransitError};
use crate::query::{trips_in_window, trips_in_window_by_route, FrequencyStats, RouteKey, TimeMode, TimeWindow};
use crate::resolver::{ActiveServices, CalendarResolver};

/// Parameters shared by every unit of one batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryConfig {
    pub day: ServiceDay,
    /// Minutes since service-day midnight
    pub window_start: u32,
    /// May exceed 1440
    pub window_end: u32,
    pub mode: TimeMode,
    pub compute_max_wait: bool,
    pub reference_range: Option<DateRange>,
}

impl QueryConfig {
    pub fn window(&self) -> Result<TimeWindow> {
        TimeWindow::new(self.window_start, self.window_end)
    }
}

/// One thing to measure
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryUnit {
    Stop(StopIdentifier),
    /// An arbitrary location and the stops within reach of it
    Point { id: String, stops: Vec<StopIdentifier> },
    /// An overlay region and the stops covering it
    Region { id: String, stops: Vec<StopIdentifier> },
}

impl QueryUnit {
    pub fn id(&self) -> &str {
        match self {
            QueryUnit::Stop(stop) => stop.as_str(),
            QueryUnit::Point { id, .. } | QueryUnit::Region { id, .. } => id,
        }
    }

    pub fn stops(&self) -> &[StopIdentifier] {
        match self {
            QueryUnit::Stop(stop) => std::slice::from_ref(stop),
            QueryUnit::Point { stops, .. } | QueryUnit::Region { stops, .. } => stops,
        }
    }
}

/// Result row for one unit, or one route at a stop
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyRow {
    pub unit_id: String,
    /// Set on route-level rows
    pub route: Option<RouteKey>,
    pub stats: FrequencyStats,
    /// Set for point and region units
    pub num_stops_in_range: Option<usize>,
}

#[derive(Debug)]
pub struct UnitOutcome<T = FrequencyRow> {
    pub unit_id: String,
    pub result: Result<T>,
}

/// Outcomes in input order plus the service resolution they were run against
#[derive(Debug)]
pub struct BatchReport<T = FrequencyRow> {
    pub services: ActiveServices,
    pub outcomes: Vec<UnitOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome<T>> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

pub fn run_units<I: ScheduleIndex + ?Sized>(
    index: &I,
    config: &QueryConfig,
    units: &[QueryUnit],
) -> BatchReport {
    run_units_with_progress(index, config, units, &|| {})
}

/// Like [`run_units`], calling `progress` once per finished unit from
/// whichever worker ran it
pub fn run_units_with_progress<I: ScheduleIndex + ?Sized>(
    index: &I,
    config: &QueryConfig,
    units: &[QueryUnit],
    progress: &(dyn Fn() + Sync),
) -> BatchReport {
    let services = resolve(index, config);

    let outcomes = units
        .par_iter()
        .map(|unit| {
            let result = evaluate_unit(index, config, &services, unit);
            progress();
            UnitOutcome {
                unit_id: unit.id().to_string(),
                result,
            }
        })
        .collect();

    BatchReport { services, outcomes }
}

/// One row per (route, direction) serving each stop
pub fn run_route_units<I: ScheduleIndex + ?Sized>(
    index: &I,
    config: &QueryConfig,
    stops: &[StopIdentifier],
) -> BatchReport<Vec<FrequencyRow>> {
    let services = resolve(index, config);

    let outcomes = stops
        .par_iter()
        .map(|stop| UnitOutcome {
            unit_id: stop.to_string(),
            result: evaluate_routes(index, config, &services, stop),
        })
        .collect();

    BatchReport { services, outcomes }
}

fn resolve<I: ScheduleIndex + ?Sized>(index: &I, config: &QueryConfig) -> ActiveServices {
    let services = CalendarResolver::new(index.calendars()).resolve(config.day, config.reference_range);
    info!(
        day = ?config.day,
        services = services.services.len(),
        warnings = services.warnings.len(),
        "Resolved active services"
    );
    services
}

fn evaluate_unit<I: ScheduleIndex + ?Sized>(
    index: &I,
    config: &QueryConfig,
    services: &ActiveServices,
    unit: &QueryUnit,
) -> Result<FrequencyRow> {
    let window = config.window()?;

    if let QueryUnit::Stop(stop) = unit {
        if index.stop(stop).is_none() {
            return Err(TransitError::StopNotFound(stop.clone()));
        }
    }

    let candidates = index.stop_times_for_any(unit.stops(), &services.services);
    let visits = trips_in_window(&candidates, &window, config.mode);
    debug!(unit = unit.id(), candidates = candidates.len(), trips = visits.len(), "Evaluated unit");

    let num_stops_in_range = match unit {
        QueryUnit::Stop(_) => None,
        QueryUnit::Point { stops, .. } | QueryUnit::Region { stops, .. } => Some(stops.len()),
    };

    Ok(FrequencyRow {
        unit_id: unit.id().to_string(),
        route: None,
        stats: FrequencyStats::from_visits(&visits, &window, config.compute_max_wait),
        num_stops_in_range,
    })
}

fn evaluate_routes<I: ScheduleIndex + ?Sized>(
    index: &I,
    config: &QueryConfig,
    services: &ActiveServices,
    stop: &StopIdentifier,
) -> Result<Vec<FrequencyRow>> {
    let window = config.window()?;
    if index.stop(stop).is_none() {
        return Err(TransitError::StopNotFound(stop.clone()));
    }

    let candidates = index.stop_times_for(stop, &services.services);
    let grouped = trips_in_window_by_route(index, &candidates, &window, config.mode);

    Ok(grouped
        .into_iter()
        .map(|(route, visits)| FrequencyRow {
            unit_id: stop.to_string(),
            route: Some(route),
            stats: FrequencyStats::from_visits(&visits, &window, config.compute_max_wait),
            num_stops_in_range: None,
        })
        .collect())
}
