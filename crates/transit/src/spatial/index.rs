//! R-tree of stop positions.
//!
//! ## Two-Stage Filtering
//!
//! Lookups first ask the R-tree for stops within a Euclidean radius (in
//! degrees) that is guaranteed to cover the target, then confirm each
//! candidate exactly: `Contains` for polygons, Haversine distance for radii.

use geo::{BoundingRect, Contains, Point, Polygon};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::identifiers::StopIdentifier;
use crate::models::types::Stop;

use super::queries::{haversine_distance, meters_to_degrees_at};

// ============================================================================
// Stop Spatial Node
// ============================================================================

#[derive(Clone, Debug)]
pub struct StopNode {
    pub stop_id: StopIdentifier,
    point: [f64; 2],
}

impl StopNode {
    pub fn new(location: Point, stop_id: StopIdentifier) -> Self {
        Self {
            stop_id,
            point: [location.x(), location.y()],
        }
    }

    pub fn location(&self) -> Point {
        Point::new(self.point[0], self.point[1])
    }
}

impl RTreeObject for StopNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StopNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ============================================================================
// Index
// ============================================================================

/// Spatial index over boarding locations that have coordinates
pub struct StopIndex {
    tree: RTree<StopNode>,
}

impl StopIndex {
    /// Stations, entrances and other non-boarding locations are left out
    pub fn new<'a>(stops: impl IntoIterator<Item = &'a Stop>) -> Self {
        let nodes: Vec<StopNode> = stops
            .into_iter()
            .filter(|s| matches!(s.location_type, None | Some(0)))
            .filter_map(|s| s.location.map(|p| StopNode::new(p, s.id.clone())))
            .collect();

        tracing::debug!(stops = nodes.len(), "Built stop index");

        Self {
            tree: RTree::bulk_load(nodes),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Stops inside `polygon`, sorted by id
    pub fn stops_within(&self, polygon: &Polygon<f64>) -> Vec<StopIdentifier> {
        let Some(rect) = polygon.bounding_rect() else {
            return Vec::new();
        };

        // Circle around the bounding box centre that covers every corner
        let center = rect.center();
        let half_diagonal_2 = (rect.width() / 2.0).powi(2) + (rect.height() / 2.0).powi(2);

        let mut found: Vec<StopIdentifier> = self
            .tree
            .locate_within_distance([center.x, center.y], half_diagonal_2 * (1.0 + 1e-9))
            .filter(|node| polygon.contains(&node.location()))
            .map(|node| node.stop_id.clone())
            .collect();

        found.sort();
        found
    }

    /// Stops within `meters` of `point`, sorted by id
    pub fn stops_near(&self, point: Point, meters: f64) -> Vec<StopIdentifier> {
        let (lon_deg, lat_deg) = meters_to_degrees_at(meters, point.y());
        let radius = lon_deg.max(lat_deg);

        let mut found: Vec<StopIdentifier> = self
            .tree
            .locate_within_distance([point.x(), point.y()], radius * radius)
            .filter(|node| haversine_distance(point, node.location()) <= meters)
            .map(|node| node.stop_id.clone())
            .collect();

        found.sort();
        found
    }
}
