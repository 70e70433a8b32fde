//! CSV and GeoJSON writers for analysis results, plus the region checkpoint.

use anyhow::{bail, Context, Result};
use geo::{MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use headway_transit::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::input::{read_geojson, rings_to_polygon};

// ============================================================================
// CSV rows
// ============================================================================

/// Metric values shared by every row type. csv can't flatten nested
/// structs, so each row repeats the columns.
#[derive(Debug, Default, PartialEq)]
struct Metrics {
    pub num_trips: Option<usize>,
    pub trips_per_hour: Option<f64>,
    pub max_wait_time: Option<f64>,
}

impl Metrics {
    fn from_stats(stats: &FrequencyStats, null_sentinel: bool) -> Self {
        Self {
            num_trips: Some(stats.num_trips),
            trips_per_hour: Some(round2(stats.trips_per_hour)),
            max_wait_time: match stats.max_wait_time {
                Some(wait) => Some(round2(wait)),
                None if null_sentinel => Some(-1.0),
                None => None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StopRow {
    #[serde(rename = "StopID")]
    pub stop_id: String,
    #[serde(rename = "StopName")]
    pub stop_name: String,
    #[serde(rename = "NumTrips")]
    pub num_trips: Option<usize>,
    #[serde(rename = "NumTripsPerHr")]
    pub trips_per_hour: Option<f64>,
    #[serde(rename = "MaxWaitTime")]
    pub max_wait_time: Option<f64>,
    #[serde(rename = "AvgHeadway")]
    pub avg_headway: Option<f64>,
    #[serde(rename = "Diagnostic")]
    pub diagnostic: String,
}

#[derive(Debug, Serialize)]
pub struct RouteRow {
    #[serde(rename = "StopID")]
    pub stop_id: String,
    #[serde(rename = "RouteID")]
    pub route_id: String,
    #[serde(rename = "RouteShortName")]
    pub route_short_name: String,
    #[serde(rename = "DirectionID")]
    pub direction_id: Option<u8>,
    #[serde(rename = "NumTrips")]
    pub num_trips: Option<usize>,
    #[serde(rename = "NumTripsPerHr")]
    pub trips_per_hour: Option<f64>,
    #[serde(rename = "MaxWaitTime")]
    pub max_wait_time: Option<f64>,
    #[serde(rename = "AvgHeadway")]
    pub avg_headway: Option<f64>,
    #[serde(rename = "Diagnostic")]
    pub diagnostic: String,
}

#[derive(Debug, Serialize)]
pub struct PointRow {
    #[serde(rename = "PointID")]
    pub point_id: String,
    #[serde(rename = "NumStopsInRange")]
    pub num_stops_in_range: Option<usize>,
    #[serde(rename = "NumTrips")]
    pub num_trips: Option<usize>,
    #[serde(rename = "NumTripsPerHr")]
    pub trips_per_hour: Option<f64>,
    #[serde(rename = "MaxWaitTime")]
    pub max_wait_time: Option<f64>,
    #[serde(rename = "Diagnostic")]
    pub diagnostic: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn stop_rows<I: ScheduleIndex + ?Sized>(index: &I, report: &BatchReport, null_sentinel: bool) -> Vec<StopRow> {
    report
        .outcomes
        .iter()
        .map(|outcome| {
            let stop_name = index
                .stop(&StopIdentifier::new(&outcome.unit_id))
                .map(|s| s.name.to_string())
                .unwrap_or_default();
            let (metrics, avg_headway, diagnostic) = match &outcome.result {
                Ok(row) => (
                    Metrics::from_stats(&row.stats, null_sentinel),
                    row.stats.avg_headway.map(round2),
                    String::new(),
                ),
                Err(err) => (Metrics::default(), None, err.to_string()),
            };
            StopRow {
                stop_id: outcome.unit_id.clone(),
                stop_name,
                num_trips: metrics.num_trips,
                trips_per_hour: metrics.trips_per_hour,
                max_wait_time: metrics.max_wait_time,
                avg_headway,
                diagnostic,
            }
        })
        .collect()
}

pub fn route_rows<I: ScheduleIndex + ?Sized>(
    index: &I,
    report: &BatchReport<Vec<FrequencyRow>>,
    null_sentinel: bool,
) -> Vec<RouteRow> {
    let mut rows = Vec::new();

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(route_rows) => {
                for row in route_rows {
                    let Some((route_id, direction)) = &row.route else {
                        continue;
                    };
                    let metrics = Metrics::from_stats(&row.stats, null_sentinel);
                    rows.push(RouteRow {
                        stop_id: outcome.unit_id.clone(),
                        route_id: route_id.to_string(),
                        route_short_name: index
                            .route(route_id)
                            .map(|r| r.short_name.to_string())
                            .unwrap_or_default(),
                        direction_id: direction.map(DirectionId::to_gtfs),
                        num_trips: metrics.num_trips,
                        trips_per_hour: metrics.trips_per_hour,
                        max_wait_time: metrics.max_wait_time,
                        avg_headway: row.stats.avg_headway.map(round2),
                        diagnostic: String::new(),
                    });
                }
            }
            Err(err) => rows.push(RouteRow {
                stop_id: outcome.unit_id.clone(),
                route_id: String::new(),
                route_short_name: String::new(),
                direction_id: None,
                num_trips: None,
                trips_per_hour: None,
                max_wait_time: None,
                avg_headway: None,
                diagnostic: err.to_string(),
            }),
        }
    }

    rows
}

pub fn point_rows(report: &BatchReport, null_sentinel: bool) -> Vec<PointRow> {
    report
        .outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(row) => {
                let metrics = Metrics::from_stats(&row.stats, null_sentinel);
                PointRow {
                    point_id: outcome.unit_id.clone(),
                    num_stops_in_range: row.num_stops_in_range,
                    num_trips: metrics.num_trips,
                    trips_per_hour: metrics.trips_per_hour,
                    max_wait_time: metrics.max_wait_time,
                    diagnostic: String::new(),
                }
            }
            Err(err) => failed_point_row(&outcome.unit_id, err.to_string()),
        })
        .collect()
}

pub fn failed_point_row(point_id: &str, diagnostic: String) -> PointRow {
    PointRow {
        point_id: point_id.to_string(),
        num_stops_in_range: None,
        num_trips: None,
        trips_per_hour: None,
        max_wait_time: None,
        diagnostic,
    }
}

pub fn write_csv<T: Serialize>(rows: &[T], output_path: &Path) -> Result<()> {
    tracing::info!("Writing {} rows to {}", rows.len(), output_path.display());

    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    for row in rows {
        writer.serialize(row).context("Failed to write CSV row")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(())
}

// ============================================================================
// GeoJSON
// ============================================================================

/// Convert a geo Polygon to GeoJSON rings
fn polygon_to_rings(poly: &Polygon<f64>) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(poly.exterior())
        .chain(poly.interiors())
        .map(|ring| ring.0.iter().map(|c| vec![c.x, c.y]).collect())
        .collect()
}

/// Convert a geo MultiPolygon to GeoJSON Value
fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    Value::MultiPolygon(mp.0.iter().map(polygon_to_rings).collect())
}

fn feature(mp: &MultiPolygon<f64>, properties: serde_json::Map<String, serde_json::Value>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(multipolygon_to_geojson(mp))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn write_features(features: Vec<Feature>, output_path: &Path) -> Result<()> {
    let feature_collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let geojson = GeoJson::from(feature_collection);
    let json_string = serde_json::to_string_pretty(&geojson)
        .context("Failed to serialize GeoJSON")?;

    std::fs::write(output_path, json_string)
        .with_context(|| format!("Failed to write GeoJSON to {}", output_path.display()))?;

    Ok(())
}

/// Region analysis results, one feature per region with the point-row
/// properties
pub fn write_region_results(regions: &[Region], report: &BatchReport, null_sentinel: bool, output_path: &Path) -> Result<()> {
    tracing::info!("Writing {} regions to {}", regions.len(), output_path.display());

    let rows = point_rows(report, null_sentinel);
    let features = regions
        .iter()
        .zip(rows)
        .map(|(region, row)| {
            let mut properties = match serde_json::to_value(&row)? {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            properties.insert("Stops".to_string(), stops_json(&region.stops));
            Ok(feature(&region.geometry, properties))
        })
        .collect::<Result<Vec<_>>>()?;

    write_features(features, output_path)
}

fn stops_json(stops: &BTreeSet<StopIdentifier>) -> serde_json::Value {
    serde_json::Value::Array(
        stops
            .iter()
            .map(|s| serde_json::Value::String(s.to_string()))
            .collect(),
    )
}

/// Save decomposed regions so later runs can skip the overlay
pub fn write_regions_checkpoint(regions: &[Region], output_path: &Path) -> Result<()> {
    tracing::info!("Checkpointing {} regions to {}", regions.len(), output_path.display());

    let features = regions
        .iter()
        .map(|region| {
            let mut properties = serde_json::Map::new();
            properties.insert("stops".to_string(), stops_json(&region.stops));
            feature(&region.geometry, properties)
        })
        .collect();

    write_features(features, output_path)
}

pub fn read_regions_checkpoint(path: &Path) -> Result<Vec<Region>> {
    let GeoJson::FeatureCollection(fc) = read_geojson(path)? else {
        bail!("Region checkpoint is not a FeatureCollection: {}", path.display());
    };

    fc.features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| {
            let stops: BTreeSet<StopIdentifier> = match feature.property("stops") {
                Some(serde_json::Value::Array(ids)) => ids
                    .iter()
                    .filter_map(|id| id.as_str().map(StopIdentifier::new))
                    .collect(),
                _ => bail!("Region {i} in {} has no stops list", path.display()),
            };
            let geometry = match feature.geometry.map(|g| g.value) {
                Some(Value::MultiPolygon(polygons)) => MultiPolygon::new(
                    polygons
                        .iter()
                        .map(|rings| rings_to_polygon(rings))
                        .collect::<Result<Vec<_>>>()?,
                ),
                Some(Value::Polygon(rings)) => MultiPolygon::new(vec![rings_to_polygon(&rings)?]),
                _ => bail!("Region {i} in {} has no polygon geometry", path.display()),
            };
            Ok(Region { geometry, stops })
        })
        .collect()
}
