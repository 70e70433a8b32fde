//! Core data types and enums for transit data.

use geo::Point;
use std::sync::Arc;

use crate::identifiers::*;

// ============================================================================
// Enums
// ============================================================================

/// GTFS route types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RouteType {
    Tram = 0,
    Subway = 1,
    Rail = 2,
    Bus = 3,
    Ferry = 4,
    CableTram = 5,
    AerialLift = 6,
    Funicular = 7,
}

impl RouteType {
    pub fn from_gtfs(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Tram),
            1 => Some(Self::Subway),
            2 => Some(Self::Rail),
            3 => Some(Self::Bus),
            4 => Some(Self::Ferry),
            5 => Some(Self::CableTram),
            6 => Some(Self::AerialLift),
            7 => Some(Self::Funicular),
            _ => None,
        }
    }

    pub fn to_gtfs(self) -> u16 {
        self as u16
    }
}

/// Trip direction (0 = outbound, 1 = inbound per GTFS)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum DirectionId {
    Outbound = 0,
    Inbound = 1,
}

impl DirectionId {
    pub fn from_gtfs(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Outbound),
            1 => Some(Self::Inbound),
            _ => None,
        }
    }

    pub fn to_gtfs(self) -> u8 {
        self as u8
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A boarding location. Stations and entrances are loaded too so that
/// `parent_station` references resolve, but they rarely carry stop times.
#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    pub id: StopIdentifier,
    pub name: Arc<str>,
    pub location: Option<Point>,
    /// Non-owning reference to the enclosing station, if any
    pub parent_station: Option<StopIdentifier>,
    pub location_type: Option<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub id: RouteIdentifier,
    pub short_name: Arc<str>,
    pub long_name: Arc<str>,
    pub route_type: Option<RouteType>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trip {
    pub id: TripIdentifier,
    pub route_id: RouteIdentifier,
    pub service_id: ServiceIdentifier,
    pub direction_id: Option<DirectionId>,
    pub headsign: Option<Arc<str>>,
}

/// A single scheduled visit of a trip at a stop.
///
/// Times are stored as seconds since midnight of the service day.
/// GTFS times can exceed 24 hours for trips past midnight
/// (e.g., 25:30:00 = 91800 seconds for 1:30am the next day).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: TripIdentifier,
    pub stop_id: StopIdentifier,
    pub arrival: u32,
    pub departure: u32,
    pub stop_sequence: u32,
}

/// Arrival and departure of one visit, in seconds since service-day midnight
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitTimes {
    pub arrival: u32,
    pub departure: u32,
}

/// Every visit one trip makes to a queried stop or set of stops.
///
/// A trip appears once per lookup even when it serves several of the
/// requested stops (or one stop twice, on a loop).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateTrip {
    pub trip_id: TripIdentifier,
    pub visits: Vec<VisitTimes>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Feed {feed} has no calendar.txt entries; exception-only calendars are not supported")]
    MissingCalendar { feed: FeedNamespace },

    #[error("Feed {feed} has a stop time with a blank arrival or departure (trip {trip_id}, stop {stop_id}, line {line})")]
    IncompleteStopTime {
        feed: FeedNamespace,
        trip_id: String,
        stop_id: String,
        line: u64,
    },

    #[error("Feed {feed}: invalid time of day {value:?} in {table}")]
    InvalidTime {
        feed: FeedNamespace,
        table: &'static str,
        value: String,
    },

    #[error("Feed {feed}: invalid date {value:?} in {table}")]
    InvalidDate {
        feed: FeedNamespace,
        table: &'static str,
        value: String,
    },

    #[error("Feed {feed}: duplicate {table} identifier {id}")]
    DuplicateIdentifier {
        feed: FeedNamespace,
        table: &'static str,
        id: String,
    },

    #[error("Feed {feed}: {table} references unknown {field} {id}")]
    UnknownReference {
        feed: FeedNamespace,
        table: &'static str,
        field: &'static str,
        id: String,
    },

    #[error("Feed namespace {0} was loaded twice")]
    DuplicateNamespace(FeedNamespace),

    #[error("Feed namespace '{0}' must be non-empty and must not contain ':'")]
    InvalidNamespace(FeedNamespace),

    #[error("Stop not found: {0}")]
    StopNotFound(StopIdentifier),

    #[error("Invalid time window: end ({end}) must be after start ({start}) and fit in a u32 of seconds")]
    InvalidWindow { start: u32, end: u32 },

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Schedule store error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, TransitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_type_from_gtfs() {
        assert_eq!(RouteType::from_gtfs(1), Some(RouteType::Subway));
        assert_eq!(RouteType::from_gtfs(3), Some(RouteType::Bus));
        assert_eq!(RouteType::from_gtfs(99), None);
        assert_eq!(RouteType::Ferry.to_gtfs(), 4);
    }

    #[test]
    fn test_direction_from_gtfs() {
        assert_eq!(DirectionId::from_gtfs(0), Some(DirectionId::Outbound));
        assert_eq!(DirectionId::from_gtfs(1), Some(DirectionId::Inbound));
        assert_eq!(DirectionId::from_gtfs(2), None);
    }

    #[test]
    fn test_error_messages_name_the_feed() {
        let err = TransitError::MissingCalendar {
            feed: FeedNamespace::new("metro"),
        };
        assert!(err.to_string().contains("metro"));

        let err = TransitError::InvalidWindow { start: 600, end: 540 };
        assert!(err.to_string().contains("600"));
    }
}
