use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

use crate::commands::nav::db::{open_rw, with_tx};
use crate::commands::nav::error::NavError;
use crate::commands::nav::graph::{Insertion, MergePolicy, NavigationGraph};
use crate::commands::nav::models::{Point, Trader, TraderType};

const BOM: char = '\u{feff}';
const NO_DESTINATION: &str = "---";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImportFormat {
    /// `points_of_interest.tsv` from the game's map folder.
    Tsv,
    /// Webmap layer export.
    Geojson,
    /// Campaign Cartographer waypoint export.
    CampaignCartographer,
}

impl ImportFormat {
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tsv" => Some(ImportFormat::Tsv),
            "geojson" => Some(ImportFormat::Geojson),
            "json" => Some(ImportFormat::CampaignCartographer),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct ImportOptions {
    /// World spawn in absolute coordinates; subtracted from Campaign Cartographer positions.
    pub offset: (i32, i32),
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { offset: (500_000, 500_000) }
    }
}

/// Records parsed from one file. Bad records are collected in `skipped`.
#[derive(Clone, Debug, Default)]
pub struct ImportReport {
    pub graph: NavigationGraph,
    pub translocators: usize,
    pub landmarks: usize,
    pub traders: usize,
    pub skipped: Vec<NavError>,
}

impl ImportReport {
    fn add_translocator(&mut self, origin: Point, destination: Point) {
        if let Insertion::Added(_) = self.graph.add_translocator(origin, destination, MergePolicy::KeepExisting) {
            self.translocators += 1;
        }
    }

    fn add_landmark(&mut self, name: &str, position: Point) {
        if self.graph.add_landmark(name, position) {
            self.landmarks += 1;
        }
    }

    fn add_trader(&mut self, trader: Trader) {
        if self.graph.add_trader(trader) {
            self.traders += 1;
        }
    }

    fn skip(&mut self, err: NavError) {
        warn!("{}", err);
        self.skipped.push(err);
    }
}

pub fn import_file(path: &Path, opts: &ImportOptions) -> Result<ImportReport> {
    let Some(format) = ImportFormat::detect(path) else {
        bail!("no importer for {} (expected .tsv, .geojson or .json)", path.display());
    };
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let report = match format {
        ImportFormat::Tsv => import_tsv(&raw),
        ImportFormat::Geojson => import_geojson(&raw).with_context(|| format!("parse {}", path.display()))?,
        ImportFormat::CampaignCartographer => {
            import_campaign_cartographer(&raw, opts).with_context(|| format!("parse {}", path.display()))?
        }
    };
    info!(
        "{}: {} translocators, {} landmarks, {} traders, {} skipped",
        path.display(),
        report.translocators,
        report.landmarks,
        report.traders,
        report.skipped.len()
    );
    Ok(report)
}

/// Imports files into the graph store at `db`, merging with what is already there.
pub fn cmd_import(files: &[impl AsRef<Path>], db: &Path, opts: &ImportOptions, policy: MergePolicy, dry_run: bool) -> Result<()> {
    let mut conn = open_rw(db)?;
    let mut graph = crate::db::load_graph(&conn)?;
    info!("store {} holds {} translocators before import", db.display(), graph.len());

    for file in files {
        let report = import_file(file.as_ref(), opts)?;
        let stats = graph.merge(report.graph, policy);
        info!(
            "{}: merged {} new, {} replaced, {} kept translocators; {} landmarks, {} traders",
            file.as_ref().display(),
            stats.translocators_added,
            stats.translocators_replaced,
            stats.translocators_kept,
            stats.landmarks_added,
            stats.traders_added
        );
    }

    if dry_run {
        println!("dry run: {} translocators would be stored in {}", graph.len(), db.display());
        return Ok(());
    }
    let saved = with_tx(&mut conn, |tx| crate::db::save_graph(tx, &graph))?;
    println!(
        "Stored {} translocators, {} landmarks and {} traders in {}",
        saved.translocators,
        saved.landmarks,
        saved.traders,
        db.display()
    );
    Ok(())
}

// --- points_of_interest.tsv ---

pub fn import_tsv(raw: &str) -> ImportReport {
    let mut report = ImportReport::default();
    let mut lines = raw.lines().enumerate();
    let Some((_, header)) = lines.next() else {
        return report;
    };
    let columns: Vec<String> = header
        .split('\t')
        .map(|c| c.trim().trim_start_matches(BOM).to_string())
        .collect();
    let col = |name: &str| columns.iter().position(|c| c.eq_ignore_ascii_case(name));
    let (name_col, location_col, destination_col, description_col) =
        (col("Name"), col("Location"), col("Destination"), col("Description"));

    for (idx, line) in lines {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |c: Option<usize>| c.and_then(|i| fields.get(i)).map(|s| s.trim()).unwrap_or("");
        let description = field(description_col);

        match field(name_col) {
            "Translocator" => {
                let destination = field(destination_col);
                if destination.is_empty() || destination == NO_DESTINATION {
                    info!("translocator at line {} has no destination: {}", line_no, description);
                    continue;
                }
                match (parse_xyz(field(location_col), line_no), parse_xyz(destination, line_no)) {
                    (Ok(origin), Ok(dest)) => report.add_translocator(origin, dest),
                    (Err(e), _) | (_, Err(e)) => report.skip(e),
                }
            }
            "Sign" => {
                let Some(name) = sign_label(description) else {
                    report.skip(NavError::malformed(line_no, format!("malformed <AM:XXX> label `{}`", description)));
                    continue;
                };
                match parse_xyz(field(location_col), line_no) {
                    Ok(p) => report.add_landmark(name, p),
                    Err(e) => report.skip(e),
                }
            }
            "Trader" => {
                let Some((name, profession)) = description.split_once(" the ") else {
                    report.skip(NavError::malformed(line_no, format!("trader could not be parsed: `{}`", description)));
                    continue;
                };
                match parse_xyz(field(location_col), line_no) {
                    Ok(position) => report.add_trader(Trader {
                        trader_type: TraderType::from_description(profession),
                        name: name.trim().to_string(),
                        position,
                    }),
                    Err(e) => report.skip(e),
                }
            }
            other => debug!("line {}: ignoring `{}` record", line_no, other),
        }
    }
    report
}

/// `X 512, Y 110, Z -300` (also `X: 512` / `X=512`) to `(x, z)`.
fn parse_xyz(field: &str, line: usize) -> Result<Point, NavError> {
    let bad = || NavError::malformed(line, format!("bad coordinate `{}`", field));
    let mut values = [0i32; 3];
    let mut parts = field.split(',');
    for (value, axis) in values.iter_mut().zip(['X', 'Y', 'Z']) {
        let part = parts.next().ok_or_else(bad)?.trim();
        let rest = part
            .strip_prefix(axis)
            .or_else(|| part.strip_prefix(axis.to_ascii_lowercase()))
            .ok_or_else(bad)?;
        let rest = rest.trim_start_matches([':', '=', ' ']);
        *value = rest.trim().parse().map_err(|_| bad())?;
    }
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok(Point::new(values[0], values[2]))
}

/// Text after the `<AM:TAG>` marker of a sign description.
fn sign_label(description: &str) -> Option<&str> {
    let start = description.find("<AM:")?;
    let end = start + description[start..].find('>')?;
    let label = description[end + 1..].trim();
    (!label.is_empty()).then_some(label)
}

// --- Campaign Cartographer ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct CcExport {
    #[serde(default)]
    waypoints: Vec<CcWaypoint>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct CcWaypoint {
    #[serde(default)]
    title: String,
    #[serde(default)]
    server_icon: String,
    #[serde(default)]
    position: Option<CcPosition>,
}

#[derive(Deserialize, Debug)]
struct CcPosition {
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Z")]
    z: f64,
}

pub fn import_campaign_cartographer(raw: &str, opts: &ImportOptions) -> Result<ImportReport> {
    let export: CcExport = serde_json::from_str(raw)?;
    let mut report = ImportReport::default();
    for (idx, wp) in export.waypoints.iter().enumerate() {
        let record = idx + 1;
        let Some(pos) = &wp.position else {
            report.skip(NavError::malformed(record, format!("waypoint `{}` has no position", wp.title)));
            continue;
        };
        let shifted = (
            block_coord(pos.x).and_then(|x| x.checked_sub(opts.offset.0)),
            block_coord(pos.z).and_then(|z| z.checked_sub(opts.offset.1)),
        );
        let (Some(x), Some(y)) = shifted else {
            report.skip(NavError::malformed(record, format!("waypoint `{}` is outside the world", wp.title)));
            continue;
        };
        let position = Point::new(x, y);
        match wp.server_icon.as_str() {
            "spiral" => match translocator_target(&wp.title) {
                Some(dest) => report.add_translocator(position, dest),
                None => report.skip(NavError::malformed(record, format!("unrecognised translocator title `{}`", wp.title))),
            },
            "trader" => {
                let title = wp.title.trim();
                let title = title.strip_prefix("Local Goods - ").unwrap_or(title);
                match title.split_once(" the ") {
                    Some((name, profession)) => report.add_trader(Trader {
                        trader_type: TraderType::from_description(profession),
                        name: name.trim().to_string(),
                        position,
                    }),
                    None => report.skip(NavError::malformed(record, format!("trader could not be parsed: `{}`", wp.title))),
                }
            }
            "home" | "star1" => report.add_landmark(&wp.title.to_lowercase(), position),
            other => debug!("waypoint {}: ignoring icon `{}`", record, other),
        }
    }
    Ok(report)
}

/// `Translocator to (x, y, z)` to `(x, z)`.
fn translocator_target(title: &str) -> Option<Point> {
    let inner = title.trim().strip_prefix("Translocator to (")?.strip_suffix(')')?;
    let nums: Vec<i32> = inner.split(',').map(|s| s.trim().parse().ok()).collect::<Option<_>>()?;
    match nums.as_slice() {
        [x, _, z] => Some(Point::new(*x, *z)),
        _ => None,
    }
}

// --- webmap GeoJSON ---

#[derive(Deserialize, Debug)]
struct GeoLayer {
    #[serde(default = "default_layer")]
    name: String,
    #[serde(default)]
    features: Vec<JsonValue>,
}

fn default_layer() -> String {
    "translocators".to_string()
}

pub fn import_geojson(raw: &str) -> Result<ImportReport> {
    let layer: GeoLayer = serde_json::from_str(raw)?;
    let mut report = ImportReport::default();
    match layer.name.as_str() {
        "translocators" => {
            for (idx, feature) in layer.features.iter().enumerate() {
                let coords = feature.pointer("/geometry/coordinates").and_then(JsonValue::as_array);
                let ends: Option<Vec<Point>> = coords.and_then(|c| c.iter().map(webmap_point).collect());
                match ends.as_deref() {
                    Some([a, b]) => {
                        report.add_translocator(*a, *b);
                        report.add_translocator(*b, *a);
                    }
                    _ => report.skip(NavError::malformed(idx + 1, "translocator feature needs two coordinates")),
                }
            }
        }
        "traders" => {
            for (idx, feature) in layer.features.iter().enumerate() {
                let position = feature.pointer("/geometry/coordinates").and_then(webmap_point);
                let name = feature.pointer("/properties/name").and_then(JsonValue::as_str);
                let wares = feature.pointer("/properties/wares").and_then(JsonValue::as_str).unwrap_or("");
                match (position, name) {
                    (Some(position), Some(name)) => report.add_trader(Trader {
                        trader_type: TraderType::from_description(wares),
                        name: name.to_string(),
                        position,
                    }),
                    _ => report.skip(NavError::malformed(idx + 1, "trader feature needs a name and a point")),
                }
            }
        }
        other => warn!("geojson layer `{}` is not supported; ignoring {} features", other, layer.features.len()),
    }
    Ok(report)
}

/// Webmap points are `[x, -z]`.
fn webmap_point(v: &JsonValue) -> Option<Point> {
    let arr = v.as_array()?;
    match arr.as_slice() {
        [x, y, ..] => Some(Point::new(block_coord(x.as_f64()?)?, block_coord(y.as_f64()?)?.checked_neg()?)),
        _ => None,
    }
}

/// Truncates an exported position to a block coordinate; `None` when it does not fit.
fn block_coord(v: f64) -> Option<i32> {
    let v = v.trunc();
    (v.is_finite() && v >= i32::MIN as f64 && v <= i32::MAX as f64).then_some(v as i32)
}
