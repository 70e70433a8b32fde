//! Decomposes overlapping coverage areas into disjoint regions.
//!
//! Each output [`Region`] carries the exact set of stops whose coverage area
//! contains it, so a region's trips can be counted once even when several
//! nearby stops serve the same trip.
//!
//! Overlapping inputs are found through an R-tree of bounding boxes and
//! grouped into connected components. Components are independent, so they
//! are decomposed in parallel; a stop with no overlapping neighbour becomes a
//! region directly without touching the boolean engine.

use std::collections::{BTreeMap, BTreeSet};
use std::panic;

use geo::algorithm::area::Area;
use geo::{BooleanOps, BoundingRect, Intersects, MultiPolygon, Polygon, Rect};
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, info, warn};

use crate::identifiers::StopIdentifier;
use crate::models::types::{Result, TransitError};

use super::geometry::{invalid_reason, is_valid_polygon, without_slivers, MIN_AREA};

/// Service area around one stop
#[derive(Clone, Debug)]
pub struct CoverageArea {
    pub stop_id: StopIdentifier,
    pub polygon: Polygon<f64>,
}

impl CoverageArea {
    pub fn new(stop_id: StopIdentifier, polygon: Polygon<f64>) -> Self {
        Self { stop_id, polygon }
    }
}

/// Disjoint piece of the covered area
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub geometry: MultiPolygon<f64>,
    pub stops: BTreeSet<StopIdentifier>,
}

/// An input that could not take part in the decomposition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayFailure {
    pub stop_id: StopIdentifier,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct OverlayResult {
    /// Sorted by stop set
    pub regions: Vec<Region>,
    pub failures: Vec<OverlayFailure>,
}

/// Decompose with the default sliver tolerance
pub fn decompose(inputs: Vec<CoverageArea>) -> Result<OverlayResult> {
    decompose_with_tolerance(inputs, MIN_AREA)
}

/// Fails only when inputs were supplied but none of them is a usable polygon.
pub fn decompose_with_tolerance(inputs: Vec<CoverageArea>, min_area: f64) -> Result<OverlayResult> {
    let supplied = inputs.len();
    let mut failures = Vec::new();

    let valid: Vec<CoverageArea> = inputs
        .into_iter()
        .filter_map(|input| {
            if is_valid_polygon(&input.polygon) {
                Some(input)
            } else {
                let reason = invalid_reason(&input.polygon);
                warn!(stop = %input.stop_id, reason, "Skipping invalid coverage polygon");
                failures.push(OverlayFailure {
                    stop_id: input.stop_id,
                    reason: reason.to_string(),
                });
                None
            }
        })
        .collect();

    if valid.is_empty() {
        if supplied > 0 {
            return Err(TransitError::Geometry(format!(
                "none of the {supplied} coverage polygons is valid"
            )));
        }
        return Ok(OverlayResult::default());
    }

    let components = overlap_components(&valid);
    info!(
        inputs = valid.len(),
        components = components.len(),
        "Decomposing coverage areas"
    );

    let decomposed: Vec<(Vec<Region>, Vec<OverlayFailure>)> = components
        .into_par_iter()
        .map(|members| {
            let mut areas: Vec<&CoverageArea> = members.iter().map(|&i| &valid[i]).collect();
            areas.sort_by(|a, b| a.stop_id.cmp(&b.stop_id));
            decompose_component(&areas, min_area)
        })
        .collect();

    // Stop sets repeat only for duplicated stop ids; their pieces are disjoint
    let mut by_stops: BTreeMap<BTreeSet<StopIdentifier>, Vec<Polygon<f64>>> = BTreeMap::new();
    for (regions, component_failures) in decomposed {
        failures.extend(component_failures);
        for region in regions {
            by_stops.entry(region.stops).or_default().extend(region.geometry.0);
        }
    }

    let regions: Vec<Region> = by_stops
        .into_iter()
        .map(|(stops, polygons)| Region {
            geometry: MultiPolygon::new(polygons),
            stops,
        })
        .collect();

    debug!(regions = regions.len(), failures = failures.len(), "Overlay complete");

    Ok(OverlayResult { regions, failures })
}

// ============================================================================
// Components
// ============================================================================

struct EnvelopeNode {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for EnvelopeNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn envelope_of(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Groups of input indices connected by actual polygon overlap
fn overlap_components(areas: &[CoverageArea]) -> Vec<Vec<usize>> {
    let nodes: Vec<EnvelopeNode> = areas
        .iter()
        .enumerate()
        .filter_map(|(index, area)| {
            area.polygon
                .bounding_rect()
                .map(|rect| EnvelopeNode {
                    index,
                    aabb: envelope_of(rect),
                })
        })
        .collect();
    let tree = RTree::bulk_load(nodes);

    let mut parents: Vec<usize> = (0..areas.len()).collect();
    for (a, b) in tree.intersection_candidates_with_other_tree(&tree) {
        if a.index >= b.index {
            continue;
        }
        if areas[a.index].polygon.intersects(&areas[b.index].polygon) {
            union(&mut parents, a.index, b.index);
        }
    }

    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..areas.len() {
        let root = find(&mut parents, i);
        components.entry(root).or_default().push(i);
    }
    components.into_values().collect()
}

fn find(parents: &mut [usize], mut i: usize) -> usize {
    while parents[i] != i {
        parents[i] = parents[parents[i]];
        i = parents[i];
    }
    i
}

fn union(parents: &mut [usize], a: usize, b: usize) {
    let ra = find(parents, a);
    let rb = find(parents, b);
    if ra != rb {
        parents[ra.max(rb)] = ra.min(rb);
    }
}

// ============================================================================
// Incremental split
// ============================================================================

fn decompose_component(areas: &[&CoverageArea], min_area: f64) -> (Vec<Region>, Vec<OverlayFailure>) {
    if let [single] = areas {
        return (
            vec![Region {
                geometry: MultiPolygon::new(vec![single.polygon.clone()]),
                stops: BTreeSet::from([single.stop_id.clone()]),
            }],
            Vec::new(),
        );
    }

    let mut regions: Vec<Region> = Vec::new();
    let mut failures = Vec::new();

    for area in areas {
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            fold_in(&regions, area, min_area)
        }));

        match result {
            Ok(next) => regions = next,
            Err(_) => {
                warn!(stop = %area.stop_id, "Boolean operation panicked, skipping coverage polygon");
                failures.push(OverlayFailure {
                    stop_id: area.stop_id.clone(),
                    reason: "boolean operation failed".to_string(),
                });
            }
        }
    }

    (regions, failures)
}

/// Split every region `area` touches and add the uncovered rest of `area`
fn fold_in(regions: &[Region], area: &CoverageArea, min_area: f64) -> Vec<Region> {
    let incoming = MultiPolygon::new(vec![area.polygon.clone()]);
    let incoming_rect = area.polygon.bounding_rect();
    let mut uncovered = incoming.clone();
    let mut next = Vec::with_capacity(regions.len() + 2);

    for region in regions {
        let touches = match (region.geometry.bounding_rect(), incoming_rect) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        };
        if !touches {
            next.push(region.clone());
            continue;
        }

        let inside = without_slivers(region.geometry.intersection(&incoming), min_area);
        if inside.unsigned_area() < min_area {
            next.push(region.clone());
            continue;
        }

        let outside = without_slivers(region.geometry.difference(&incoming), min_area);
        uncovered = uncovered.difference(&region.geometry);

        let mut stops = region.stops.clone();
        stops.insert(area.stop_id.clone());
        next.push(Region {
            geometry: inside,
            stops,
        });
        if outside.unsigned_area() >= min_area {
            next.push(Region {
                geometry: outside,
                stops: region.stops.clone(),
            });
        }
    }

    let uncovered = without_slivers(uncovered, min_area);
    if uncovered.unsigned_area() >= min_area {
        next.push(Region {
            geometry: uncovered,
            stops: BTreeSet::from([area.stop_id.clone()]),
        });
    }

    next
}
