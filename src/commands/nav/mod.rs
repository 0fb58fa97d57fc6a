use anyhow::Result;
use clap::{Args, Subcommand};
use log::{debug, info};
use std::path::{Path, PathBuf};

pub mod config;
pub mod db;
pub mod distance;
pub mod error;
pub mod graph;
pub mod linker;
pub mod logging;
pub mod models;
pub mod narrator;
pub mod nearby;
pub mod search;

use crate::commands::import::{cmd_import, ImportOptions};
use graph::{MergePolicy, NavigationGraph};
use linker::LinkOptions;
use models::TraderType;

/// Config file picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "vspath.toml";

#[derive(Args, Debug, Clone)]
pub struct CommonOpts {
    /// SQLite graph store (default: data/navgraph.db or VSPATH_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// TOML config file (default: ./vspath.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log level (trace|debug|info|warn|error)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,
    /// Number of worker threads (rayon)
    #[arg(long, global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum NavCommand {
    /// Import translocators, landmarks and traders into the graph store
    Import {
        /// points_of_interest.tsv, webmap .geojson or Campaign Cartographer .json exports
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// World spawn as x,z, subtracted from Campaign Cartographer positions
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<String>,
        /// Imported translocators replace stored ones with the same origin
        #[arg(long)]
        replace: bool,
        /// Parse and merge only; do not modify the store
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Find a route between two coordinates (x,y) or landmarks
    Route {
        #[arg(allow_hyphen_values = true)]
        origin: String,
        #[arg(allow_hyphen_values = true)]
        goal: String,
        /// Search time budget in milliseconds
        #[arg(long = "budget-ms")]
        budget_ms: Option<u64>,
        /// Longest walk between translocators to consider
        #[arg(long = "link-distance")]
        link_distance: Option<i64>,
        /// Cost charged per translocator hop
        #[arg(long = "teleport-cost")]
        teleport_cost: Option<i64>,
    },
    /// List traders near a coordinate or landmark
    Nearby {
        #[arg(allow_hyphen_values = true)]
        origin: String,
        #[arg(long = "trader-type", value_enum)]
        trader_type: Option<TraderType>,
        #[arg(long = "max-distance")]
        max_distance: Option<i64>,
        /// Measure distance through the translocator network instead of walking
        #[arg(long)]
        network: bool,
        /// Cost charged per translocator hop (with --network)
        #[arg(long = "teleport-cost")]
        teleport_cost: Option<i64>,
    },
    /// List known landmark names
    Landmarks,
    /// Remove every stored translocator, landmark and trader
    Clean,
}

pub fn cmd_nav(common: CommonOpts, sub: NavCommand) -> Result<()> {
    // defaults, then file, then CLI; env overrides CLI when set
    let mut cfg = match common.config.as_deref() {
        Some(path) => config::Config::load_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => config::Config::load_file(Path::new(DEFAULT_CONFIG_FILE))?,
        None => config::Config::default(),
    };
    if common.db.is_some() { cfg.db = common.db.clone(); }
    if common.threads.is_some() { cfg.threads = common.threads; }
    if common.log_level.is_some() { cfg.log_level = common.log_level.clone(); }
    match &sub {
        NavCommand::Import { offset: Some(raw), .. } => {
            cfg.offset = config::parse_offset(raw)
                .ok_or_else(|| anyhow::anyhow!("--offset expects x,z, got `{}`", raw))?;
        }
        NavCommand::Route { budget_ms, link_distance, teleport_cost, .. } => {
            if let Some(ms) = budget_ms { cfg.time_budget_ms = *ms; }
            if link_distance.is_some() { cfg.link_distance = *link_distance; }
            if let Some(c) = teleport_cost { cfg.teleport_cost = *c; }
        }
        NavCommand::Nearby { max_distance, teleport_cost, .. } => {
            if let Some(d) = max_distance { cfg.trader_distance = *d; }
            if let Some(c) = teleport_cost { cfg.teleport_cost = *c; }
        }
        _ => {}
    }
    cfg.apply_env();

    logging::init(cfg.log_level.as_deref());
    if let Some(n) = cfg.threads {
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    }
    let db_path = cfg.db_path();
    debug!("config: {:?}", cfg);

    match sub {
        NavCommand::Import { files, replace, dry_run, .. } => {
            let policy = if replace { MergePolicy::Replace } else { MergePolicy::KeepExisting };
            let opts = ImportOptions { offset: cfg.offset };
            cmd_import(files.as_slice(), &db_path, &opts, policy, dry_run)
        }
        NavCommand::Route { origin, goal, .. } => {
            let mut graph = db::load_for_routing(&db_path)?;
            let from = graph.resolve_location(&origin)?;
            let to = graph.resolve_location(&goal)?;
            linker::build_links(&mut graph, &LinkOptions { max_link_distance: cfg.link_distance });

            let result = search::find_path_with(&graph, from, to, &cfg.search_options());
            info!(
                "search: {} seeds, {} expansions, {} improvements, cost {}",
                result.stats.seeds, result.stats.expansions, result.stats.improvements, result.cost
            );
            println!("{}", narrator::narrate(&result.route, result.is_optimal));
            Ok(())
        }
        NavCommand::Nearby { origin, trader_type, network, .. } => {
            let mut graph = load_store(&db_path)?;
            let from = graph.resolve_location(&origin)?;
            let found = if network {
                linker::build_links(&mut graph, &LinkOptions { max_link_distance: cfg.link_distance });
                let cost = cfg.search_options().teleport_cost;
                nearby::find_nearby_by_network(&graph, from, trader_type, cfg.trader_distance, cost)
            } else {
                nearby::find_nearby(&graph, from, trader_type, cfg.trader_distance)
            };
            if found.is_empty() {
                println!("No traders within {}m of {}", cfg.trader_distance, from);
            }
            for t in found {
                println!(
                    "{:>6}m {:<3} {} ({}) at {}",
                    t.distance,
                    distance::bearing(from, t.position).label(),
                    t.name,
                    t.trader_type,
                    t.position
                );
            }
            Ok(())
        }
        NavCommand::Landmarks => {
            let graph = load_store(&db_path)?;
            for name in graph.landmark_names() {
                println!("{}", name);
            }
            Ok(())
        }
        NavCommand::Clean => {
            let conn = db::open_rw(&db_path)?;
            crate::db::clear_graph(&conn)?;
            println!("Cleared graph store {}", db_path.display());
            Ok(())
        }
    }
}

/// Stored graph, or an empty one when the store does not exist yet.
fn load_store(path: &Path) -> Result<NavigationGraph> {
    if !path.exists() {
        return Ok(NavigationGraph::new());
    }
    let conn = db::open_ro(path)?;
    crate::db::load_graph(&conn)
}
