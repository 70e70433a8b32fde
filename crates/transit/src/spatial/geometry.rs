//! Polygon checks shared by the overlay and the buffer generator.

use geo::algorithm::area::Area;
use geo::{MultiPolygon, Polygon};

/// Areas below this many square degrees are treated as empty
pub const MIN_AREA: f64 = 1e-12;

/// Check if a polygon is valid (basic checks)
pub fn is_valid_polygon(poly: &Polygon<f64>) -> bool {
    let exterior = poly.exterior();

    // Must have at least 4 points (3 unique + closing point)
    if exterior.0.len() < 4 {
        return false;
    }

    if exterior
        .coords()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return false;
    }

    // Must be closed
    match (exterior.0.first(), exterior.0.last()) {
        (Some(first), Some(last)) => {
            if (first.x - last.x).abs() > 1e-9 || (first.y - last.y).abs() > 1e-9 {
                return false;
            }
        }
        _ => return false,
    }

    poly.unsigned_area() >= MIN_AREA
}

/// Why a polygon failed [`is_valid_polygon`], for diagnostics
pub fn invalid_reason(poly: &Polygon<f64>) -> &'static str {
    let exterior = poly.exterior();
    if exterior.0.len() < 4 {
        "exterior ring has fewer than 4 points"
    } else if exterior.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        "non-finite coordinate"
    } else if exterior.0.first() != exterior.0.last() {
        "exterior ring is not closed"
    } else {
        "zero area"
    }
}

/// Drop member polygons that are too small to matter
pub fn without_slivers(mp: MultiPolygon<f64>, min_area: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(
        mp.0
            .into_iter()
            .filter(|p| p.unsigned_area() >= min_area)
            .collect(),
    )
}

#[cfg(test)]
pub(crate) fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
    use geo::{Coord, LineString};

    Polygon::new(
        LineString::new(vec![
            Coord { x, y },
            Coord { x: x + size, y },
            Coord {
                x: x + size,
                y: y + size,
            },
            Coord { x, y: y + size },
            Coord { x, y },
        ]),
        vec![],
    )
}
