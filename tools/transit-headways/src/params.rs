//! Parsing of query parameters as typed on the command line.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::Weekday;
use clap::{Args, ValueEnum};
use headway_transit::feed::time::parse_gtfs_date;
use headway_transit::prelude::*;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Arrivals,
    Departures,
}

impl From<Mode> for TimeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Arrivals => TimeMode::Arrivals,
            Mode::Departures => TimeMode::Departures,
        }
    }
}

/// Options shared by every analysis subcommand
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Schedule store written by `build`
    #[arg(short, long)]
    pub store: std::path::PathBuf,

    /// Weekday name (e.g. "monday") or a specific date (YYYYMMDD)
    #[arg(short, long)]
    pub day: String,

    /// Window start, HH:MM
    #[arg(long)]
    pub start: String,

    /// Window end, HH:MM. An end before the start wraps past midnight
    /// ("23:00" to "01:00" covers two hours).
    #[arg(long)]
    pub end: String,

    /// Count trips by their arrival or their departure time
    #[arg(long, value_enum, default_value_t = Mode::Departures)]
    pub mode: Mode,

    /// Don't compute MaxWaitTime
    #[arg(long)]
    pub skip_max_wait: bool,

    /// Write -1 instead of an empty cell when MaxWaitTime is undefined
    #[arg(long)]
    pub null_sentinel: bool,

    /// Date range YYYYMMDD-YYYYMMDD; services running entirely outside it are
    /// reported
    #[arg(long)]
    pub reference_range: Option<String>,
}

impl QueryArgs {
    pub fn to_config(&self) -> Result<QueryConfig> {
        let (window_start, window_end) = parse_window(&self.start, &self.end)?;
        Ok(QueryConfig {
            day: parse_day(&self.day)?,
            window_start,
            window_end,
            mode: self.mode.into(),
            compute_max_wait: !self.skip_max_wait,
            reference_range: self
                .reference_range
                .as_deref()
                .map(parse_date_range)
                .transpose()?,
        })
    }
}

/// "HH:MM" to minutes since midnight. Hours past 23 are accepted for
/// schedules that run into the next morning.
pub fn parse_clock(value: &str) -> Result<u32> {
    let (hours, minutes) = value
        .trim()
        .split_once(':')
        .with_context(|| format!("Expected HH:MM, got {value:?}"))?;
    let hours: u32 = hours
        .parse()
        .with_context(|| format!("Invalid hours in {value:?}"))?;
    let minutes: u32 = minutes
        .parse()
        .with_context(|| format!("Invalid minutes in {value:?}"))?;
    if minutes >= 60 || hours >= 48 {
        bail!("Time of day out of range: {value:?}");
    }
    Ok(hours * 60 + minutes)
}

/// Window bounds in minutes; an end before the start moves to the next day
pub fn parse_window(start: &str, end: &str) -> Result<(u32, u32)> {
    let start = parse_clock(start)?;
    let mut end = parse_clock(end)?;
    if end < start {
        end += MINUTES_PER_DAY;
    }
    Ok((start, end))
}

pub fn parse_day(value: &str) -> Result<ServiceDay> {
    if let Some(date) = parse_gtfs_date(value) {
        return Ok(ServiceDay::Date(date));
    }
    let weekday = Weekday::from_str(value.trim())
        .map_err(|_| anyhow::anyhow!("Expected a weekday name or YYYYMMDD date, got {value:?}"))?;
    Ok(ServiceDay::Weekday(weekday))
}

pub fn parse_date_range(value: &str) -> Result<DateRange> {
    let (start, end) = value
        .split_once('-')
        .with_context(|| format!("Expected YYYYMMDD-YYYYMMDD, got {value:?}"))?;
    let start = parse_gtfs_date(start).with_context(|| format!("Invalid start date in {value:?}"))?;
    let end = parse_gtfs_date(end).with_context(|| format!("Invalid end date in {value:?}"))?;
    if end < start {
        bail!("Reference range ends before it starts: {value:?}");
    }
    Ok(DateRange::new(start, end))
}

/// `--feed` value: either `namespace=path` or a bare directory, which is
/// namespaced by its own name
pub fn parse_feed(value: &str) -> FeedSource {
    match value.split_once('=') {
        Some((namespace, path)) if !namespace.is_empty() => FeedSource::directory(namespace, path),
        _ => FeedSource::from_directory(value),
    }
}
