//! Distance helpers for WGS84 coordinates.
//!
//! Uses Haversine formula for accurate distances on Earth's surface.

use geo::{Distance, Haversine, Point};

const METERS_PER_DEGREE: f64 = 111_320.0;

/// Calculate Haversine distance between two points in meters
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    Haversine.distance(p1, p2)
}

/// Convert meters to degrees at equator (for bounding box queries)
pub fn meters_to_degrees_approx(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Degrees of (longitude, latitude) spanned by `meters` at `latitude`.
///
/// Longitude degrees shrink towards the poles; the cosine is clamped so the
/// result stays finite there.
pub fn meters_to_degrees_at(meters: f64, latitude: f64) -> (f64, f64) {
    let lat = meters_to_degrees_approx(meters);
    let cos = latitude.to_radians().cos().abs().max(1e-6);
    (lat / cos, lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_haversine_distance() {
        // Distance from NYC to LA is approximately 3,936 km
        let nyc = Point::new(-74.0060, 40.7128);
        let la = Point::new(-118.2437, 34.0522);

        let dist = haversine_distance(nyc, la);
        assert!((dist - 3_936_000.0).abs() < 50_000.0); // Within 50km
    }

    #[test]
    fn test_meters_to_degrees_latitude_correction() {
        let (lon, lat) = meters_to_degrees_at(1_000.0, 0.0);
        assert_relative_eq!(lon, lat, epsilon = 1e-12);

        let (lon, lat) = meters_to_degrees_at(1_000.0, 60.0);
        assert_relative_eq!(lon, 2.0 * lat, epsilon = 1e-9);

        // A degree of longitude spans about 500 m at 60 degrees north
        let east = Point::new(lon, 60.0);
        let dist = haversine_distance(Point::new(0.0, 60.0), east);
        assert!((dist - 1_000.0).abs() < 10.0);
    }
}
