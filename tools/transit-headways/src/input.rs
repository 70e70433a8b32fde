//! GeoJSON inputs: query points and precomputed coverage polygons.

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, Point, Polygon};
use geojson::{feature::Id, Feature, GeoJson};
use headway_transit::prelude::*;
use std::path::Path;

/// A location to measure service at
#[derive(Clone, Debug, PartialEq)]
pub struct QueryPoint {
    pub id: String,
    pub location: Point<f64>,
}

pub fn read_geojson(path: &Path) -> Result<GeoJson> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read GeoJSON file: {}", path.display()))?;

    content
        .parse()
        .with_context(|| format!("Failed to parse GeoJSON from: {}", path.display()))
}

fn features(geojson: GeoJson) -> Vec<Feature> {
    match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        }],
    }
}

fn string_property(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Point features; the id comes from the feature id, an `id` property, or
/// the feature's position in the file
pub fn read_points(path: &Path) -> Result<Vec<QueryPoint>> {
    let mut points = Vec::new();

    for (i, feature) in features(read_geojson(path)?).into_iter().enumerate() {
        let id = match &feature.id {
            Some(Id::String(s)) => s.clone(),
            Some(Id::Number(n)) => n.to_string(),
            None => string_property(&feature, "id").unwrap_or_else(|| format!("point-{i}")),
        };

        match feature.geometry.map(|g| g.value) {
            Some(geojson::Value::Point(coords)) if coords.len() >= 2 => points.push(QueryPoint {
                id,
                location: Point::new(coords[0], coords[1]),
            }),
            _ => tracing::warn!(feature = i, "Skipping feature without a point geometry"),
        }
    }

    if points.is_empty() {
        bail!("No point features found in: {}", path.display());
    }
    Ok(points)
}

/// Polygon features carrying a `stop_id` property. Multipolygons contribute
/// each member polygon under the same stop.
pub fn read_coverage(path: &Path) -> Result<Vec<CoverageArea>> {
    let mut areas = Vec::new();

    for (i, feature) in features(read_geojson(path)?).into_iter().enumerate() {
        let Some(stop_id) = string_property(&feature, "stop_id") else {
            tracing::warn!(feature = i, "Skipping coverage feature without a stop_id property");
            continue;
        };
        let stop_id = StopIdentifier::new(stop_id);

        let polygons = match feature.geometry.map(|g| g.value) {
            Some(geojson::Value::Polygon(rings)) => vec![rings_to_polygon(&rings)?],
            Some(geojson::Value::MultiPolygon(polygons)) => polygons
                .iter()
                .map(|rings| rings_to_polygon(rings))
                .collect::<Result<Vec<_>>>()?,
            _ => {
                tracing::warn!(stop = %stop_id, "Skipping coverage feature that is not a polygon");
                continue;
            }
        };

        areas.extend(
            polygons
                .into_iter()
                .map(|polygon| CoverageArea::new(stop_id.clone(), polygon)),
        );
    }

    Ok(areas)
}

/// Every id must name a stop in the store. Ids written without their feed
/// prefix would otherwise match nothing and report zero trips.
pub fn require_known_stops<'a, I: ScheduleIndex + ?Sized>(
    index: &I,
    ids: impl IntoIterator<Item = &'a StopIdentifier>,
) -> Result<()> {
    let mut unknown: Vec<&StopIdentifier> = ids
        .into_iter()
        .filter(|id| index.stop(id).is_none())
        .collect();
    unknown.sort();
    unknown.dedup();

    let Some(first) = unknown.first() else {
        return Ok(());
    };
    for id in &unknown {
        tracing::warn!(stop = %id, "Stop is not in the schedule store");
    }
    bail!(
        "{} stop id(s) are not in the schedule store, first {}; ids take the form <feed>{}<stop_id>",
        unknown.len(),
        first,
        NAMESPACE_SEPARATOR
    )
}

/// Convert GeoJSON polygon rings to a geo Polygon
pub fn rings_to_polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let Some((exterior, interiors)) = rings.split_first() else {
        bail!("Polygon has no rings");
    };
    Ok(Polygon::new(
        coords_to_linestring(exterior)?,
        interiors
            .iter()
            .map(|ring| coords_to_linestring(ring))
            .collect::<Result<Vec<_>>>()?,
    ))
}

/// Convert GeoJSON coordinate array to LineString
fn coords_to_linestring(coords: &[Vec<f64>]) -> Result<LineString<f64>> {
    coords
        .iter()
        .map(|c| match c.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => bail!("Position needs at least two coordinates"),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_store() -> ScheduleStore {
        let tables = [
            ("stops.txt", "stop_id,stop_name,stop_lat,stop_lon\nS1,First,40.75,-73.99\nS2,Second,40.76,-73.99\n"),
            ("routes.txt", "route_id,route_short_name,route_long_name,route_type\nR,1,One,3\n"),
            (
                "calendar.txt",
                "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
                 wk,1,1,1,1,1,0,0,20240101,20241231\n",
            ),
            ("trips.txt", "route_id,service_id,trip_id\nR,wk,t1\n"),
            (
                "stop_times.txt",
                "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
                 t1,08:00:00,08:00:00,S1,1\n\
                 t1,08:05:00,08:05:00,S2,2\n",
            ),
        ];
        load_feeds(&[FeedSource::in_memory("bus", tables)]).unwrap()
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("transit-headways-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_points() {
        let path = write_temp(
            "points.geojson",
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","id":"home","geometry":{"type":"Point","coordinates":[-73.99,40.75]},"properties":{}},
                {"type":"Feature","geometry":{"type":"Point","coordinates":[-73.98,40.76]},"properties":{"id":7}},
                {"type":"Feature","geometry":{"type":"Point","coordinates":[-73.97,40.77]},"properties":null},
                {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]},"properties":null}
            ]}"#,
        );

        let points = read_points(&path).unwrap();
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["home", "7", "point-2"]);
        assert_eq!(points[0].location, Point::new(-73.99, 40.75));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_read_coverage() {
        let path = write_temp(
            "coverage.geojson",
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]},"properties":{"stop_id":"bus:S1"}},
                {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[5,5],[6,5],[6,6],[5,5]]]},"properties":{}}
            ]}"#,
        );

        let areas = read_coverage(&path).unwrap();
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].stop_id.as_str(), "bus:S1");
        assert_eq!(areas[0].polygon.exterior().0.len(), 5);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_short_position_is_an_error() {
        assert!(rings_to_polygon(&[vec![vec![0.0]]]).is_err());
        assert!(rings_to_polygon(&[]).is_err());
    }

    #[test]
    fn test_unprefixed_coverage_ids_are_rejected() {
        let path = write_temp(
            "raw-ids.geojson",
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[-74.0,40.7],[-73.9,40.7],[-73.9,40.8],[-74.0,40.7]]]},"properties":{"stop_id":"S1"}},
                {"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[-74.0,40.7],[-73.9,40.7],[-73.9,40.8],[-74.0,40.7]]]},"properties":{"stop_id":"bus:S2"}}
            ]}"#,
        );
        let store = small_store();
        let areas = read_coverage(&path).unwrap();

        let err = require_known_stops(&store, areas.iter().map(|a| &a.stop_id)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("1 stop id(s)"), "{message}");
        assert!(message.contains("S1"), "{message}");

        let known = [StopIdentifier::new("bus:S1"), StopIdentifier::new("bus:S2")];
        assert!(require_known_stops(&store, known.iter()).is_ok());
    }
}
