use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use headway_transit::prelude::*;

mod input;
mod output;
mod params;

use input::{read_coverage, read_points, require_known_stops};
use output::{
    failed_point_row, point_rows, read_regions_checkpoint, route_rows, stop_rows, write_csv,
    write_region_results, write_regions_checkpoint,
};
use params::{parse_feed, QueryArgs};

#[derive(Parser, Debug)]
#[command(
    name = "transit-headways",
    author,
    version,
    about = "Measure transit service frequency from GTFS data",
    long_about = "Counts the distinct trips serving stops, routes, arbitrary points and \
                  coverage areas within a time window, and reports trips per hour, \
                  average headway and the longest wait between trips.\n\n\
                  Run `build` once to index one or more GTFS feeds into a SQLite file; \
                  every analysis subcommand reads that file."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads for the analysis (defaults to one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load GTFS feeds and write the indexed schedule to a SQLite file
    Build {
        /// GTFS directory, optionally prefixed with a namespace (`bus=path/to/gtfs`).
        /// Repeat to merge several feeds.
        #[arg(short, long = "feed", required = true)]
        feeds: Vec<String>,

        /// Output SQLite file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Frequency at each stop
    Stops {
        #[command(flatten)]
        query: QueryArgs,

        /// Only these stops (namespaced ids); defaults to every served stop
        #[arg(long = "stop")]
        stops: Vec<String>,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Frequency of each route and direction at each stop
    Routes {
        #[command(flatten)]
        query: QueryArgs,

        /// Only these stops (namespaced ids); defaults to every served stop
        #[arg(long = "stop")]
        stops: Vec<String>,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Frequency reachable from each point of a GeoJSON file
    Points {
        #[command(flatten)]
        query: QueryArgs,

        /// GeoJSON file of Point features
        #[arg(long)]
        points: PathBuf,

        /// Walking distance in meters
        #[arg(long, default_value_t = 400.0)]
        distance: f64,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Frequency for every disjoint area covered by stop service areas
    Areas {
        #[command(flatten)]
        query: QueryArgs,

        /// GeoJSON of service-area polygons with a `stop_id` property.
        /// Without it, circles of --distance around each served stop are used.
        #[arg(long)]
        coverage: Option<PathBuf>,

        /// Walking distance in meters for generated service areas
        #[arg(long, default_value_t = 400.0)]
        distance: f64,

        /// Reuse decomposed regions from this file if it exists, or write
        /// them there after the overlay
        #[arg(long)]
        regions_checkpoint: Option<PathBuf>,

        /// Output GeoJSON file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

fn open_store(path: &Path) -> Result<ScheduleStore> {
    if !path.exists() {
        bail!("Schedule store does not exist: {} (run `build` first)", path.display());
    }
    let store = ScheduleStore::open(path)
        .with_context(|| format!("Failed to open schedule store {}", path.display()))?;
    info!(
        feeds = store.feeds().len(),
        stops = store.stops().len(),
        trips = store.trips().len(),
        "Opened schedule store"
    );
    Ok(store)
}

fn selected_stops(store: &ScheduleStore, requested: &[String]) -> Vec<StopIdentifier> {
    if requested.is_empty() {
        store.served_stops().into_iter().map(|s| s.id.clone()).collect()
    } else {
        requested.iter().map(StopIdentifier::new).collect()
    }
}

fn report_diagnostics<T>(report: &BatchReport<T>) {
    for warning in &report.services.warnings {
        warn!("{}", warning);
    }
    if report.services.is_empty() {
        warn!("No service runs on the requested day; every count will be zero");
    }
    let failed = report.failures().count();
    if failed > 0 {
        warn!("{} of {} units could not be evaluated", failed, report.outcomes.len());
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    match cli.command {
        Command::Build { feeds, output } => build(&feeds, &output),
        Command::Stops { query, stops, output } => run_stops(&query, &stops, &output),
        Command::Routes { query, stops, output } => run_routes(&query, &stops, &output),
        Command::Points {
            query,
            points,
            distance,
            output,
        } => run_points(&query, &points, distance, &output),
        Command::Areas {
            query,
            coverage,
            distance,
            regions_checkpoint,
            output,
        } => run_areas(
            &query,
            coverage.as_deref(),
            distance,
            regions_checkpoint.as_deref(),
            &output,
        ),
    }
}

fn build(feeds: &[String], output: &Path) -> Result<()> {
    let sources: Vec<FeedSource> = feeds.iter().map(|f| parse_feed(f)).collect();
    for source in &sources {
        if let headway_transit::feed::FeedLocation::Directory(dir) = &source.location {
            if !dir.is_dir() {
                bail!("Feed directory does not exist: {}", dir.display());
            }
        }
        info!("Feed {}", source.namespace);
    }

    let store = load_feeds(&sources).context("Failed to load GTFS feeds")?;
    store
        .save(output)
        .with_context(|| format!("Failed to write schedule store {}", output.display()))?;

    info!(
        stops = store.stops().len(),
        trips = store.trips().len(),
        stop_times = store.stop_times().len(),
        "Wrote schedule store to {}",
        output.display()
    );
    Ok(())
}

fn run_stops(query: &QueryArgs, stops: &[String], output: &Path) -> Result<()> {
    let config = query.to_config()?;
    let store = open_store(&query.store)?;

    let units: Vec<QueryUnit> = selected_stops(&store, stops)
        .into_iter()
        .map(QueryUnit::Stop)
        .collect();
    info!("Analysing {} stops", units.len());

    let pb = progress_bar(units.len());
    let report = run_units_with_progress(&store, &config, &units, &|| pb.inc(1));
    pb.finish_and_clear();

    report_diagnostics(&report);
    write_csv(&stop_rows(&store, &report, query.null_sentinel), output)
}

fn run_routes(query: &QueryArgs, stops: &[String], output: &Path) -> Result<()> {
    let config = query.to_config()?;
    let store = open_store(&query.store)?;

    let stops = selected_stops(&store, stops);
    info!("Analysing routes at {} stops", stops.len());

    let report = run_route_units(&store, &config, &stops);
    report_diagnostics(&report);
    write_csv(&route_rows(&store, &report, query.null_sentinel), output)
}

fn run_points(query: &QueryArgs, points_path: &Path, distance: f64, output: &Path) -> Result<()> {
    let config = query.to_config()?;
    let store = open_store(&query.store)?;
    let points = read_points(points_path).context("Failed to read query points")?;

    let mut generator = CircularBuffer::default();
    generator
        .prepare()
        .context("Failed to prepare service-area generator")?;
    let index = StopIndex::new(store.stops());

    let mut units = Vec::with_capacity(points.len());
    let mut failed = Vec::new();
    for point in points {
        match generator.service_area(point.location, distance, &[]) {
            Ok(area) => units.push(QueryUnit::Point {
                stops: index.stops_within(&area),
                id: point.id,
            }),
            Err(err) => {
                warn!(point = %point.id, "Could not build service area: {}", err);
                failed.push(failed_point_row(&point.id, err.to_string()));
            }
        }
    }
    info!("Analysing {} points", units.len());

    let pb = progress_bar(units.len());
    let report = run_units_with_progress(&store, &config, &units, &|| pb.inc(1));
    pb.finish_and_clear();

    report_diagnostics(&report);
    let mut rows = point_rows(&report, query.null_sentinel);
    rows.extend(failed);
    write_csv(&rows, output)
}

fn run_areas(
    query: &QueryArgs,
    coverage: Option<&Path>,
    distance: f64,
    checkpoint: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let config = query.to_config()?;
    let store = open_store(&query.store)?;

    let regions = match checkpoint {
        Some(path) if path.exists() => {
            info!("Reusing regions from {}", path.display());
            let regions = read_regions_checkpoint(path).context("Failed to read region checkpoint")?;
            require_known_stops(&store, regions.iter().flat_map(|r| r.stops.iter()))
                .context("Region checkpoint does not match the schedule store")?;
            regions
        }
        _ => {
            let areas = match coverage {
                Some(path) => {
                    let areas = read_coverage(path).context("Failed to read coverage polygons")?;
                    require_known_stops(&store, areas.iter().map(|a| &a.stop_id))
                        .context("Coverage polygons do not match the schedule store")?;
                    areas
                }
                None => generate_coverage(&store, distance)?,
            };
            let overlay = decompose(areas).context("Coverage overlay failed")?;
            for failure in &overlay.failures {
                warn!(stop = %failure.stop_id, "Coverage polygon skipped: {}", failure.reason);
            }
            if let Some(path) = checkpoint {
                write_regions_checkpoint(&overlay.regions, path)
                    .context("Failed to write region checkpoint")?;
            }
            overlay.regions
        }
    };

    let units: Vec<QueryUnit> = regions
        .iter()
        .enumerate()
        .map(|(i, region)| QueryUnit::Region {
            id: format!("region-{i}"),
            stops: region.stops.iter().cloned().collect(),
        })
        .collect();
    info!("Analysing {} regions", units.len());

    let pb = progress_bar(units.len());
    let report = run_units_with_progress(&store, &config, &units, &|| pb.inc(1));
    pb.finish_and_clear();

    report_diagnostics(&report);
    write_region_results(&regions, &report, query.null_sentinel, output)
}

/// Straight-line service areas around every served stop with a position
fn generate_coverage(store: &ScheduleStore, distance: f64) -> Result<Vec<CoverageArea>> {
    let mut generator = CircularBuffer::default();
    generator
        .prepare()
        .context("Failed to prepare service-area generator")?;

    let mut areas = Vec::new();
    for stop in store.served_stops() {
        let Some(location) = stop.location else {
            continue;
        };
        match generator.service_area(location, distance, &[]) {
            Ok(polygon) => areas.push(CoverageArea::new(stop.id.clone(), polygon)),
            Err(err) => warn!(stop = %stop.id, "Could not build service area: {}", err),
        }
    }
    info!("Generated {} service areas", areas.len());
    Ok(areas)
}
