//! Spatial indexing, service-area generation and coverage overlay.

pub mod buffer;
pub mod geometry;
pub mod index;
pub mod overlay;
pub mod queries;

pub use buffer::{BufferGenerator, CircularBuffer};
pub use index::StopIndex;
pub use overlay::{decompose, CoverageArea, OverlayFailure, OverlayResult, Region};
pub use queries::{haversine_distance, meters_to_degrees_approx, meters_to_degrees_at};
