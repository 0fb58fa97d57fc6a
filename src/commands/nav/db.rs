use anyhow::{Context, Result};
use log::{info, warn};
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::error::NavError;
use super::graph::NavigationGraph;

pub fn open_ro<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("open graph store {}", path.display()))?;
    // Wait a bit for locks to clear when an import holds the DB
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(conn)
}

pub fn open_rw<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut conn = Connection::open(path).with_context(|| format!("open graph store {}", path.display()))?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    ensure_schema(&mut conn)?;
    Ok(conn)
}

pub fn ensure_schema(conn: &mut Connection) -> Result<()> {
    crate::db::create_tables(conn)
}

pub fn with_tx<T, F: FnOnce(&Transaction) -> Result<T>>(conn: &mut Connection, f: F) -> Result<T> {
    // IMMEDIATE to acquire a reserved lock up-front, reducing mid-transaction lock errors
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let out = f(&tx)?;
    tx.commit()?;
    Ok(out)
}

/// Loads the stored graph for routing. A missing store or one without
/// translocators is reported as `NavError::NoGraphData`.
pub fn load_for_routing(path: &Path) -> Result<NavigationGraph> {
    if !path.exists() {
        return Err(NavError::NoGraphData.into());
    }
    let conn = open_ro(path)?;
    let graph = crate::db::load_graph(&conn)?;
    if graph.is_empty() {
        return Err(NavError::NoGraphData.into());
    }
    match crate::db::stored_translocator_count(&conn)? {
        Some(n) if n != graph.len() => warn!(
            "store {} records {} translocators but holds {}; re-import to repair",
            path.display(),
            n,
            graph.len()
        ),
        _ => info!("loaded {} translocators from {}", graph.len(), path.display()),
    }
    Ok(graph)
}
