//! Service-area generation around a location.
//!
//! Real walking areas come from a street network, which lives outside this
//! crate. [`CircularBuffer`] is the straight-line stand-in.

use std::f64::consts::TAU;

use geo::{Coord, LineString, Point, Polygon};

use crate::models::types::{Result, TransitError};

use super::geometry::is_valid_polygon;
use super::queries::meters_to_degrees_at;

/// Produces the area reachable from a location within a budget
pub trait BufferGenerator: Send + Sync {
    /// One-time setup before any area is requested. A failure here aborts the
    /// whole pass.
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Area reachable from `location` within `budget` meters.
    ///
    /// `restrictions` names network features the walker may not use; the
    /// meaning is up to the generator.
    fn service_area(&self, location: Point, budget: f64, restrictions: &[String]) -> Result<Polygon<f64>>;
}

/// Circle approximated by a regular polygon
#[derive(Clone, Copy, Debug)]
pub struct CircularBuffer {
    segments: usize,
}

impl CircularBuffer {
    pub const DEFAULT_SEGMENTS: usize = 32;

    pub fn new(segments: usize) -> Self {
        Self {
            segments: segments.max(3),
        }
    }
}

impl Default for CircularBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEGMENTS)
    }
}

impl BufferGenerator for CircularBuffer {
    fn service_area(&self, location: Point, budget: f64, restrictions: &[String]) -> Result<Polygon<f64>> {
        if !(budget.is_finite() && budget > 0.0) {
            return Err(TransitError::Geometry(format!(
                "buffer distance must be positive, got {budget}"
            )));
        }
        if !restrictions.is_empty() {
            tracing::debug!(?restrictions, "Straight-line buffers ignore restrictions");
        }

        let (dx, dy) = meters_to_degrees_at(budget, location.y());
        let mut ring: Vec<Coord<f64>> = (0..self.segments)
            .map(|i| {
                let angle = TAU * i as f64 / self.segments as f64;
                Coord {
                    x: location.x() + dx * angle.cos(),
                    y: location.y() + dy * angle.sin(),
                }
            })
            .collect();
        ring.push(ring[0]);

        let polygon = Polygon::new(LineString::new(ring), vec![]);
        if !is_valid_polygon(&polygon) {
            return Err(TransitError::Geometry(format!(
                "degenerate buffer around ({}, {})",
                location.x(),
                location.y()
            )));
        }
        Ok(polygon)
    }
}
