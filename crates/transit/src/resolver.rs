//! Resolves which services run on the day being analysed.
//!
//! Weekday queries only look at the regular weekly pattern. When the matching
//! services' date ranges share no common date the feed most likely mixes
//! seasonal schedules; every matching service is still returned (its trips
//! will be counted together) and a warning names a conflicting pair.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, Weekday};
use tracing::warn;

use crate::identifiers::ServiceIdentifier;
use crate::models::calendar::{DateRange, ServiceCalendar, ServiceDay};

/// Two services that both match the query weekday but never run in the
/// same period
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonOverlappingCalendarWarning {
    pub first: ServiceIdentifier,
    pub first_range: DateRange,
    pub second: ServiceIdentifier,
    pub second_range: DateRange,
}

impl fmt::Display for NonOverlappingCalendarWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "services {} ({}) and {} ({}) have non-overlapping date ranges; trips from both are counted",
            self.first, self.first_range, self.second, self.second_range
        )
    }
}

/// Result of resolving a service day
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActiveServices {
    pub services: BTreeSet<ServiceIdentifier>,
    pub warnings: Vec<NonOverlappingCalendarWarning>,
    /// Matching services whose date range misses the reference range
    pub outside_reference: Vec<ServiceIdentifier>,
}

impl ActiveServices {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

pub struct CalendarResolver<'a> {
    calendars: &'a [ServiceCalendar],
}

impl<'a> CalendarResolver<'a> {
    pub fn new(calendars: &'a [ServiceCalendar]) -> Self {
        Self { calendars }
    }

    pub fn resolve(&self, day: ServiceDay, reference: Option<DateRange>) -> ActiveServices {
        match day {
            ServiceDay::Weekday(weekday) => self.active_services(weekday, reference),
            ServiceDay::Date(date) => self.services_on_date(date),
        }
    }

    /// Services whose weekly pattern includes `weekday`
    pub fn active_services(&self, weekday: Weekday, reference: Option<DateRange>) -> ActiveServices {
        let matching: Vec<&ServiceCalendar> = self
            .calendars
            .iter()
            .filter(|c| c.runs_on_weekday(weekday))
            .collect();

        let mut result = ActiveServices {
            services: matching.iter().map(|c| c.service_id.clone()).collect(),
            ..Default::default()
        };

        // The common intersection is empty exactly when the latest start falls
        // after the earliest end, and that pair is a conflicting one.
        let latest_start = matching.iter().max_by(|a, b| {
            (a.range.start, &a.service_id).cmp(&(b.range.start, &b.service_id))
        });
        let earliest_end = matching.iter().min_by(|a, b| {
            (a.range.end, &a.service_id).cmp(&(b.range.end, &b.service_id))
        });
        if let (Some(late), Some(early)) = (latest_start, earliest_end) {
            if late.range.start > early.range.end {
                let warning = NonOverlappingCalendarWarning {
                    first: early.service_id.clone(),
                    first_range: early.range,
                    second: late.service_id.clone(),
                    second_range: late.range,
                };
                warn!(
                    first = %warning.first,
                    second = %warning.second,
                    ?weekday,
                    "{}",
                    warning
                );
                result.warnings.push(warning);
            }
        }

        if let Some(reference) = reference {
            for calendar in &matching {
                if !calendar.range.overlaps(&reference) {
                    warn!(
                        service = %calendar.service_id,
                        range = %calendar.range,
                        reference = %reference,
                        "Service does not run during the reference range but is still counted"
                    );
                    result.outside_reference.push(calendar.service_id.clone());
                }
            }
        }

        result
    }

    /// Services running on one specific date, exceptions included
    pub fn services_on_date(&self, date: NaiveDate) -> ActiveServices {
        ActiveServices {
            services: self
                .calendars
                .iter()
                .filter(|c| c.runs_on(date))
                .map(|c| c.service_id.clone())
                .collect(),
            ..Default::default()
        }
    }
}
