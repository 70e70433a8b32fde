//! Frequency statistics over the trips found in a window.

use super::{TimeWindow, TripVisit};

/// Output metrics for one stop, route, point or region.
///
/// Headway and wait times are in minutes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrequencyStats {
    pub num_trips: usize,
    pub trips_per_hour: f64,
    pub avg_headway: Option<f64>,
    /// Longest gap between consecutive trips. `None` when fewer than two
    /// trips run, when disabled, or when the wait before the first trip or
    /// after the last one is strictly longer than every interior gap (the
    /// true maximum then lies outside the window).
    pub max_wait_time: Option<f64>,
}

impl FrequencyStats {
    /// `visits` must be sorted by timestamp, as returned by
    /// [`trips_in_window`](super::trips_in_window)
    pub fn from_visits(visits: &[TripVisit], window: &TimeWindow, compute_max_wait: bool) -> Self {
        let timestamps: Vec<u32> = visits.iter().map(|v| v.timestamp).collect();
        Self::from_timestamps(&timestamps, window, compute_max_wait)
    }

    /// Sorted timestamps in seconds since service-day midnight
    pub fn from_timestamps(timestamps: &[u32], window: &TimeWindow, compute_max_wait: bool) -> Self {
        let num_trips = timestamps.len();
        let trips_per_hour = num_trips as f64 / window.hours();

        let minutes: Vec<f64> = timestamps.iter().map(|&t| f64::from(t) / 60.0).collect();

        let (avg_headway, max_wait_time) = match (minutes.first(), minutes.last()) {
            (Some(&first), Some(&last)) if num_trips >= 2 => {
                let avg = (last - first) / (num_trips - 1) as f64;
                let max_wait = if compute_max_wait {
                    max_wait(&minutes, window)
                } else {
                    None
                };
                (Some(avg), max_wait)
            }
            _ => (None, None),
        };

        Self {
            num_trips,
            trips_per_hour,
            avg_headway,
            max_wait_time,
        }
    }
}

fn max_wait(minutes: &[f64], window: &TimeWindow) -> Option<f64> {
    let interior = minutes
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold(f64::NEG_INFINITY, f64::max);

    let first = *minutes.first()?;
    let last = *minutes.last()?;
    let leading = first - f64::from(window.start());
    let trailing = f64::from(window.end()) - last;

    // A tie with the boundary still reports the interior gap
    if leading > interior || trailing > interior {
        None
    } else {
        Some(interior)
    }
}
