//! GTFS time-of-day and date parsing.

use chrono::NaiveDate;

/// Parse an `H:MM:SS` time of day into seconds since service-day midnight.
///
/// Hours are unbounded: `25:30:00` is 1:30am on the following calendar day
/// but still belongs to the service day it was scheduled on.
pub fn parse_gtfs_time(value: &str) -> Option<u32> {
    let mut parts = value.trim().split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)
}

/// Parse a `YYYYMMDD` service date
pub fn parse_gtfs_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y%m%d").ok()
}

pub fn format_gtfs_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
