//! Core traits for schedule data.
//!
//! Query code only talks to a [`ScheduleIndex`]; the in-memory
//! [`ScheduleStore`](crate::store::ScheduleStore) is the implementation used
//! in practice, whether built from feeds or reopened from disk.

use std::collections::BTreeSet;

use crate::identifiers::*;
use crate::models::calendar::ServiceCalendar;
use crate::models::types::*;

/// Read-only, indexed access to a loaded schedule
pub trait ScheduleIndex: Send + Sync {
    // ---- Lookups ----
    fn stop(&self, id: &StopIdentifier) -> Option<&Stop>;
    fn route(&self, id: &RouteIdentifier) -> Option<&Route>;
    fn trip(&self, id: &TripIdentifier) -> Option<&Trip>;

    // ---- Collections ----
    fn stops(&self) -> &[Stop];
    fn calendars(&self) -> &[ServiceCalendar];

    // ---- Visit queries ----

    /// Trips of the given services that visit `stop`, one entry per trip
    fn stop_times_for(
        &self,
        stop: &StopIdentifier,
        services: &BTreeSet<ServiceIdentifier>,
    ) -> Vec<CandidateTrip>;

    /// Trips of the given services that visit any of `stops`, one entry per
    /// trip with the visits to every listed stop merged together
    fn stop_times_for_any(
        &self,
        stops: &[StopIdentifier],
        services: &BTreeSet<ServiceIdentifier>,
    ) -> Vec<CandidateTrip>;
}
