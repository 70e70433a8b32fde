//! Row types for the GTFS tables the loader reads.
//!
//! Each table gets its own typed record so malformed rows fail at parse time
//! instead of turning into silently defaulted values downstream.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub(crate) struct StopRecord {
    pub stop_id: String,
    #[serde(default)]
    pub stop_name: Option<String>,
    #[serde(default)]
    pub stop_lat: Option<f64>,
    #[serde(default)]
    pub stop_lon: Option<f64>,
    #[serde(default)]
    pub parent_station: Option<String>,
    #[serde(default)]
    pub location_type: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RouteRecord {
    pub route_id: String,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
    #[serde(default)]
    pub route_type: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TripRecord {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    #[serde(default)]
    pub direction_id: Option<u8>,
    #[serde(default)]
    pub trip_headsign: Option<String>,
}

/// Times stay as text here: a blank value has to be reported against the
/// row, which a numeric field would hide behind a generic parse error.
#[derive(Debug, Deserialize)]
pub(crate) struct StopTimeRecord {
    pub trip_id: String,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default)]
    pub departure_time: Option<String>,
    pub stop_id: String,
    #[serde(default)]
    pub stop_sequence: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarRecord {
    pub service_id: String,
    #[serde(deserialize_with = "parse_bool")]
    pub monday: bool,
    #[serde(deserialize_with = "parse_bool")]
    pub tuesday: bool,
    #[serde(deserialize_with = "parse_bool")]
    pub wednesday: bool,
    #[serde(deserialize_with = "parse_bool")]
    pub thursday: bool,
    #[serde(deserialize_with = "parse_bool")]
    pub friday: bool,
    #[serde(deserialize_with = "parse_bool")]
    pub saturday: bool,
    #[serde(deserialize_with = "parse_bool")]
    pub sunday: bool,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarDateRecord {
    pub service_id: String,
    pub date: String,
    pub exception_type: u8,
}

fn parse_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let n = <u8>::deserialize(d)?;
    match n {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(serde::de::Error::custom(format!("Unknown bool value {n}"))),
    }
}
