//! Small in-memory feeds shared by the unit tests.

use crate::feed::{self, FeedSource};
use crate::store::ScheduleStore;

const STOPS: &str = "\
stop_id,stop_name,stop_lat,stop_lon,parent_station
A,Alpha,0.0,0.0,
B,Beta,0.0,0.01,
C,Gamma,0.0,0.02,
";

const ROUTES: &str = "\
route_id,route_short_name,route_long_name,route_type
R1,1,Crosstown,3
R2,2,Night Owl,3
";

const CALENDAR: &str = "\
service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date
wk,1,1,1,1,1,0,0,20240101,20241231
sat,0,0,0,0,0,1,0,20240101,20241231
";

const TRIPS: &str = "\
route_id,service_id,trip_id,direction_id,trip_headsign
R1,wk,t1,0,East
R1,wk,t2,0,East
R2,wk,t3,1,West
R1,sat,t4,0,East
R2,wk,t5,1,West
";

/// t1 and t2 serve A then B; t3 serves B then C; t4 runs on Saturdays only;
/// t5 runs after midnight (minute 1460 at A).
const STOP_TIMES: &str = "\
trip_id,arrival_time,departure_time,stop_id,stop_sequence
t1,08:00:00,08:01:00,A,1
t1,08:05:00,08:06:00,B,2
t2,08:30:00,08:31:00,A,1
t2,08:35:00,08:36:00,B,2
t3,09:10:00,09:11:00,B,1
t3,09:20:00,09:21:00,C,2
t4,10:00:00,10:00:00,A,1
t5,24:20:00,24:20:00,A,1
t5,24:30:00,24:30:00,C,2
";

pub fn basic_tables() -> Vec<(&'static str, &'static str)> {
    vec![
        (feed::STOPS, STOPS),
        (feed::ROUTES, ROUTES),
        (feed::CALENDAR, CALENDAR),
        (feed::TRIPS, TRIPS),
        (feed::STOP_TIMES, STOP_TIMES),
    ]
}

/// Replace (or with `None`, drop) one table
pub fn with_table(
    mut tables: Vec<(&'static str, &'static str)>,
    name: &'static str,
    contents: Option<&'static str>,
) -> Vec<(&'static str, &'static str)> {
    tables.retain(|(table, _)| *table != name);
    if let Some(contents) = contents {
        tables.push((name, contents));
    }
    tables
}

pub fn basic_store() -> ScheduleStore {
    feed::load_feeds(&[FeedSource::in_memory("metro", basic_tables())]).unwrap()
}
