//! Transit data models, types, and traits.

pub mod calendar;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use calendar::{DateRange, ServiceCalendar, ServiceDay, WeekdayFlags};
pub use traits::ScheduleIndex;
pub use types::{
    CandidateTrip, DirectionId, Result, Route, RouteType, Stop, StopTime, TransitError, Trip,
    VisitTimes,
};
