//! Service calendar for determining when trips run.
//!
//! Implements GTFS calendar.txt and calendar_dates.txt logic.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::identifiers::ServiceIdentifier;

/// Determines which days a transit service operates
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceCalendar {
    pub service_id: ServiceIdentifier,

    // Regular schedule
    pub range: DateRange,
    pub weekdays: WeekdayFlags,

    // Exception dates
    pub added_dates: Arc<HashSet<NaiveDate>>,   // Service runs on these dates
    pub removed_dates: Arc<HashSet<NaiveDate>>, // Service does not run on these dates
}

/// Inclusive range of service dates
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Compact representation of which weekdays a service runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeekdayFlags {
    pub(crate) flags: u8,
}

impl WeekdayFlags {
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    pub fn set(&mut self, weekday: Weekday) {
        self.flags |= 1 << weekday.number_from_monday();
    }

    pub fn unset(&mut self, weekday: Weekday) {
        self.flags &= !(1 << weekday.number_from_monday());
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        (self.flags & (1 << weekday.number_from_monday())) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.flags == 0
    }

    pub fn bits(&self) -> u8 {
        self.flags
    }

    pub fn from_bits(flags: u8) -> Self {
        Self { flags }
    }

    pub fn from_bools(mon: bool, tue: bool, wed: bool, thu: bool, fri: bool, sat: bool, sun: bool) -> Self {
        let mut flags = Self::new();
        if mon { flags.set(Weekday::Mon); }
        if tue { flags.set(Weekday::Tue); }
        if wed { flags.set(Weekday::Wed); }
        if thu { flags.set(Weekday::Thu); }
        if fri { flags.set(Weekday::Fri); }
        if sat { flags.set(Weekday::Sat); }
        if sun { flags.set(Weekday::Sun); }
        flags
    }
}

/// The day a query is asked about
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceDay {
    /// Any date with this weekday; uses only the regular weekly pattern
    Weekday(Weekday),
    /// One calendar date; honours calendar_dates.txt exceptions
    Date(NaiveDate),
}

impl ServiceCalendar {
    /// A calendar with only the regular weekly schedule
    pub fn weekly(service_id: ServiceIdentifier, range: DateRange, weekdays: WeekdayFlags) -> Self {
        Self {
            service_id,
            range,
            weekdays,
            added_dates: Arc::new(HashSet::new()),
            removed_dates: Arc::new(HashSet::new()),
        }
    }

    /// Check if the service runs on a given date
    pub fn runs_on(&self, date: NaiveDate) -> bool {
        // Check explicit additions first
        if self.added_dates.contains(&date) {
            return true;
        }

        // Check explicit removals
        if self.removed_dates.contains(&date) {
            return false;
        }

        // Check regular schedule
        if !self.range.contains(date) {
            return false;
        }

        self.weekdays.contains(date.weekday())
    }

    /// Check if the regular weekly pattern includes this weekday
    pub fn runs_on_weekday(&self, weekday: Weekday) -> bool {
        self.weekdays.contains(weekday)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekday_flags() {
        let mut flags = WeekdayFlags::new();
        flags.set(Weekday::Mon);
        flags.set(Weekday::Wed);
        flags.set(Weekday::Fri);

        assert!(flags.contains(Weekday::Mon));
        assert!(!flags.contains(Weekday::Tue));
        assert!(flags.contains(Weekday::Wed));

        flags.unset(Weekday::Wed);
        assert!(!flags.contains(Weekday::Wed));
        assert_eq!(WeekdayFlags::from_bits(flags.bits()), flags);
    }

    #[test]
    fn test_date_range_overlap() {
        let summer = DateRange::new(date(2024, 6, 1), date(2024, 8, 31));
        let winter = DateRange::new(date(2024, 12, 1), date(2025, 2, 28));
        let august = DateRange::new(date(2024, 8, 31), date(2024, 9, 30));

        assert!(!summer.overlaps(&winter));
        assert!(summer.overlaps(&august));
        assert!(august.overlaps(&summer));
    }

    #[test]
    fn test_service_calendar() {
        let calendar = ServiceCalendar {
            service_id: ServiceIdentifier::new("weekday"),
            range: DateRange::new(date(2024, 1, 1), date(2024, 12, 31)),
            weekdays: WeekdayFlags::from_bools(true, true, true, true, true, false, false),
            added_dates: Arc::new(HashSet::from([
                date(2024, 7, 6), // Add a Saturday
            ])),
            removed_dates: Arc::new(HashSet::from([
                date(2024, 1, 1), // Remove New Year's Day (Monday)
            ])),
        };

        // Regular weekday
        assert!(calendar.runs_on(date(2024, 1, 2))); // Tuesday

        // Weekend
        assert!(!calendar.runs_on(date(2024, 1, 6))); // Saturday

        // Removed date
        assert!(!calendar.runs_on(date(2024, 1, 1)));

        // Added date
        assert!(calendar.runs_on(date(2024, 7, 6)));

        // Out of range
        assert!(!calendar.runs_on(date(2025, 1, 1)));

        assert!(calendar.runs_on_weekday(Weekday::Fri));
        assert!(!calendar.runs_on_weekday(Weekday::Sun));
    }
}
