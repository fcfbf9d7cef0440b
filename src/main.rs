//! Spot map clustering tool
//!
//! Reads records with hex-encoded point geometries from a CSV file, clusters
//! them for a map viewport and writes the resulting markers as CSV. With
//! `--expand` it prints the camera target for tapping one of the clusters.

use clap::Parser;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use spotmap_cluster::engine::{ClusteringEngine, EngineConfig, StrategyChoice};
use spotmap_cluster::viewport::MIN_EXPANSION_DELTA;
use spotmap_cluster::{BoundingBox, ClusterEntity, ClusterId, FeaturePoint, RawRecord, Viewport};


/// Extra room around the data when no viewport is given
const DATA_VIEW_PADDING: f64 = 1.2;

const PASS_TIMEOUT: Duration = Duration::from_secs(60);

/// Free-form columns of an input row
type Properties = BTreeMap<String, String>;

#[derive(Parser)]
#[command(name = "spotmap_cluster")]
#[command(about = "Viewport marker clustering for point geometries", long_about = None)]
struct Args {
    /// Input CSV file with id,geometry columns (geometry as hex WKB)
    #[arg(short, long, default_value = "spots.csv")]
    input: PathBuf,

    /// Output CSV file with markers (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON engine config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Viewport center latitude (default: center of the data)
    #[arg(long, allow_negative_numbers = true)]
    center_lat: Option<f64>,

    /// Viewport center longitude (default: center of the data)
    #[arg(long, allow_negative_numbers = true)]
    center_lon: Option<f64>,

    /// Viewport latitude span in degrees (default: fits the data)
    #[arg(long)]
    lat_delta: Option<f64>,

    /// Viewport longitude span in degrees (default: fits the data)
    #[arg(long)]
    lon_delta: Option<f64>,

    /// Cluster radius in pixels
    #[arg(short, long)]
    radius: Option<u32>,

    #[arg(long)]
    min_zoom: Option<u8>,

    #[arg(long)]
    max_zoom: Option<u8>,

    /// Minimum number of points in a cluster
    #[arg(short = 'm', long)]
    min_points: Option<usize>,

    /// Maximum number of markers written
    #[arg(long)]
    max_entities: Option<usize>,

    #[arg(short, long, value_enum)]
    strategy: Option<StrategyChoice>,

    /// Print the camera target for tapping this cluster id instead of the markers
    #[arg(short, long)]
    expand: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let config = build_config(args)?;
    let records = read_records(&args.input)?;
    debug!(records = records.len(), input = ?args.input, "read input");

    let mut engine = ClusteringEngine::new(config)?;
    if engine.set_records(&records) == 0 {
        return Err("no decodable points in input".into());
    }

    let viewport = resolve_viewport(args, engine.points())?;
    engine.set_viewport(viewport, Instant::now());
    engine.flush();
    if !engine.wait_for_pass(PASS_TIMEOUT) {
        return Err("clustering pass timed out".into());
    }
    debug!(
        entities = engine.entities().len(),
        strategy = engine.strategy_name(),
        zoom = viewport.zoom(),
        "clustered"
    );

    if let Some(id) = args.expand {
        let cluster = engine
            .find_cluster(ClusterId(id))
            .cloned()
            .ok_or_else(|| format!("no cluster {} in this view", id))?;
        let target = engine
            .press_cluster(&cluster)
            .ok_or("cluster cannot be expanded")?;
        println!("{}", serde_json::to_string_pretty(&target)?);
        return Ok(());
    }

    match &args.output {
        None => write_entities(io::stdout().lock(), engine.entities())?,
        Some(path) => {
            write_entities(File::create(path)?, engine.entities())?;
            debug!(output = ?path, "markers written");
        }
    }
    Ok(())
}

/// Loads the config file if any and applies the command-line overrides
fn build_config(args: &Args) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(radius) = args.radius {
        config.options.radius = radius;
    }
    if let Some(min_zoom) = args.min_zoom {
        config.options.min_zoom = min_zoom;
    }
    if let Some(max_zoom) = args.max_zoom {
        config.options.max_zoom = max_zoom;
    }
    if let Some(min_points) = args.min_points {
        config.options.min_points = min_points;
    }
    if let Some(max_entities) = args.max_entities {
        config.max_entities = max_entities;
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }

    config.validate()?;
    Ok(config)
}

/// Reads `id,geometry,...` rows; the other columns become properties
///
/// Rows without an id or geometry are skipped with a warning.
fn read_records(path: &Path) -> Result<Vec<RawRecord<Properties>>, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let id_col = headers
        .iter()
        .position(|h| h == "id")
        .ok_or("input has no `id` column")?;
    let geometry_col = headers
        .iter()
        .position(|h| h == "geometry")
        .ok_or("input has no `geometry` column")?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let id = record.get(id_col).unwrap_or_default();
        let geometry = record.get(geometry_col).unwrap_or_default();
        if id.is_empty() || geometry.is_empty() {
            // header is line 1
            warn!(line = row + 2, "skipping row without id or geometry");
            continue;
        }

        let properties: Properties = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(col, _)| *col != id_col && *col != geometry_col)
            .map(|(_, (name, value))| (name.to_string(), value.to_string()))
            .collect();
        records.push(RawRecord::new(id, geometry, properties));
    }

    Ok(records)
}

/// Viewport from the flags, with the data's bounds filling in what is missing
fn resolve_viewport(
    args: &Args,
    points: &[FeaturePoint<Properties>],
) -> Result<Viewport, Box<dyn Error>> {
    let bounds = BoundingBox::around(points.iter().map(|p| &p.geometry))
        .ok_or("no points to view")?;
    let center = bounds.center();

    let viewport = Viewport::new(
        args.center_lat.unwrap_or(center.latitude),
        args.center_lon.unwrap_or(center.longitude),
        args.lat_delta
            .unwrap_or_else(|| (bounds.lat_span() * DATA_VIEW_PADDING).max(MIN_EXPANSION_DELTA)),
        args.lon_delta
            .unwrap_or_else(|| (bounds.lon_span() * DATA_VIEW_PADDING).max(MIN_EXPANSION_DELTA)),
    );

    if !viewport.is_valid() {
        return Err(format!("invalid viewport {:?}", viewport).into());
    }
    Ok(viewport)
}

/// CSV row of a marker: kind,id,latitude,longitude,point_count,members
fn entity_row(entity: &ClusterEntity<Properties>) -> [String; 6] {
    match entity {
        ClusterEntity::Point(p) => [
            "point".to_string(),
            p.id.clone(),
            p.geometry.latitude.to_string(),
            p.geometry.longitude.to_string(),
            "1".to_string(),
            p.id.clone(),
        ],
        ClusterEntity::Cluster(c) => [
            "cluster".to_string(),
            c.id.to_string(),
            c.coordinate.latitude.to_string(),
            c.coordinate.longitude.to_string(),
            c.point_count.to_string(),
            c.member_ids.join(";"),
        ],
    }
}

fn write_entities<W: io::Write>(
    out: W,
    entities: &[ClusterEntity<Properties>],
) -> Result<(), Box<dyn Error>> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer.write_record(["kind", "id", "latitude", "longitude", "point_count", "members"])?;
    for entity in entities {
        writer.write_record(&entity_row(entity))?;
    }
    writer.flush()?;
    Ok(())
}
