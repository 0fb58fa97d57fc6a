use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use super::search::SearchOptions;

/// Runtime settings. Load order: defaults → TOML file → CLI → environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite graph store (default: data/navgraph.db).
    pub db: Option<PathBuf>,
    /// Route search time budget in milliseconds.
    pub time_budget_ms: u64,
    /// Longest walk the linker turns into an edge; unset links everything.
    pub link_distance: Option<i64>,
    /// Search radius for `nearby`.
    pub trader_distance: i64,
    /// Cost charged per translocator hop, in blocks of walking.
    pub teleport_cost: i64,
    /// Absolute position of the world spawn, subtracted from Campaign Cartographer exports.
    pub offset: (i32, i32),
    pub threads: Option<usize>,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db: None,
            time_budget_ms: 5000,
            link_distance: None,
            trader_distance: 1000,
            teleport_cost: 0,
            offset: (500_000, 500_000),
            threads: None,
            log_level: None,
        }
    }
}

impl Config {
    pub fn load_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    /// Overlays any `VSPATH_*` variables that are set and parse.
    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var("VSPATH_DB") { self.db = Some(PathBuf::from(v)); }
        if let Some(v) = env::var("VSPATH_TIME_BUDGET_MS").ok().and_then(|s| s.trim().parse().ok()) { self.time_budget_ms = v; }
        if let Some(v) = env::var("VSPATH_LINK_DISTANCE").ok().and_then(|s| s.trim().parse().ok()) { self.link_distance = Some(v); }
        if let Some(v) = env::var("VSPATH_TRADER_DISTANCE").ok().and_then(|s| s.trim().parse().ok()) { self.trader_distance = v; }
        if let Some(v) = env::var("VSPATH_TELEPORT_COST").ok().and_then(|s| s.trim().parse().ok()) { self.teleport_cost = v; }
        if let Some(v) = env::var("VSPATH_OFFSET").ok().and_then(|s| parse_offset(&s)) { self.offset = v; }
        if let Some(v) = env::var("VSPATH_THREADS").ok().and_then(|s| s.trim().parse().ok()) { self.threads = Some(v); }
        if let Ok(v) = env::var("VSPATH_LOG_LEVEL") { self.log_level = Some(v); }
    }

    pub fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(crate::util::default_db_path)
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions { time_budget: self.time_budget(), teleport_cost: self.teleport_cost.max(0) }
    }
}

/// `x,z` pair as used by `--offset`.
pub fn parse_offset(input: &str) -> Option<(i32, i32)> {
    let (x, z) = input.split_once(',')?;
    Some((x.trim().parse().ok()?, z.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("500000,500000"), Some((500000, 500000)));
        assert_eq!(parse_offset(" -10 , 20"), Some((-10, 20)));
        assert_eq!(parse_offset("bad"), None);
        assert_eq!(parse_offset("1,x"), None);
    }

    #[test]
    fn test_toml_overrides_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("vspath.toml");
        fs::write(&path, "time_budget_ms = 250\nlink_distance = 10000\noffset = [1, 2]\nteleport_cost = 40\n")?;
        let cfg = Config::load_file(&path)?;
        assert_eq!(cfg.time_budget(), Duration::from_millis(250));
        assert_eq!(cfg.link_distance, Some(10000));
        assert_eq!(cfg.offset, (1, 2));
        assert_eq!(cfg.trader_distance, 1000);
        assert_eq!(
            cfg.search_options(),
            SearchOptions { time_budget: Duration::from_millis(250), teleport_cost: 40 }
        );
        Ok(())
    }

    #[test]
    fn test_apply_env_reads_values() {
        std::env::set_var("VSPATH_DB", "/tmp/nav.db");
        std::env::set_var("VSPATH_TIME_BUDGET_MS", "42");
        std::env::set_var("VSPATH_LINK_DISTANCE", "9000");
        std::env::set_var("VSPATH_TRADER_DISTANCE", "300");
        std::env::set_var("VSPATH_OFFSET", "7,8");
        std::env::set_var("VSPATH_TELEPORT_COST", "15");
        std::env::set_var("VSPATH_THREADS", "3");
        std::env::set_var("VSPATH_LOG_LEVEL", "debug");

        let mut cfg = Config::default();
        cfg.apply_env();
        assert_eq!(cfg.db_path(), PathBuf::from("/tmp/nav.db"));
        assert_eq!(cfg.time_budget_ms, 42);
        assert_eq!(cfg.link_distance, Some(9000));
        assert_eq!(cfg.trader_distance, 300);
        assert_eq!(cfg.offset, (7, 8));
        assert_eq!(cfg.teleport_cost, 15);
        assert_eq!(cfg.threads, Some(3));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));

        // cleanup
        for k in [
            "VSPATH_DB",
            "VSPATH_TIME_BUDGET_MS",
            "VSPATH_LINK_DISTANCE",
            "VSPATH_TRADER_DISTANCE",
            "VSPATH_OFFSET",
            "VSPATH_TELEPORT_COST",
            "VSPATH_THREADS",
            "VSPATH_LOG_LEVEL",
        ] {
            std::env::remove_var(k);
        }
    }
}
