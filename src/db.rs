use anyhow::Result;
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;

use crate::commands::nav::graph::{MergePolicy, NavigationGraph};
use crate::commands::nav::models::{Point, Trader, TraderType};

pub fn create_tables(conn: &mut Connection) -> Result<()> {
    let translocator_columns: BTreeSet<&'static str> =
        ["origin_x", "origin_y", "dest_x", "dest_y"].into_iter().collect();
    let landmark_columns: BTreeSet<&'static str> = ["name", "x", "y"].into_iter().collect();
    let trader_columns: BTreeSet<&'static str> = ["trader_type", "name", "x", "y"].into_iter().collect();

    // Older stores kept elevation and a different key layout; they are rebuilt on next import.
    if table_exists(conn, "translocators")? && !table_has_columns(conn, "translocators", &translocator_columns)? {
        warn!("dropping translocators table with outdated layout");
        conn.execute("DROP TABLE translocators", [])?;
    }
    if table_exists(conn, "landmarks")? && !table_has_columns(conn, "landmarks", &landmark_columns)? {
        warn!("dropping landmarks table with outdated layout");
        conn.execute("DROP TABLE landmarks", [])?;
    }
    if table_exists(conn, "traders")? && !table_has_columns(conn, "traders", &trader_columns)? {
        warn!("dropping traders table with outdated layout");
        conn.execute("DROP TABLE traders", [])?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS translocators (
            origin_x INTEGER NOT NULL,
            origin_y INTEGER NOT NULL,
            dest_x   INTEGER NOT NULL,
            dest_y   INTEGER NOT NULL,
            PRIMARY KEY (origin_x, origin_y)
        );

        CREATE TABLE IF NOT EXISTS landmarks (
            name TEXT NOT NULL,
            x    INTEGER NOT NULL,
            y    INTEGER NOT NULL,
            UNIQUE (name, x, y)
        );

        CREATE TABLE IF NOT EXISTS traders (
            trader_type TEXT NOT NULL,
            name        TEXT NOT NULL,
            x           INTEGER NOT NULL,
            y           INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_traders_type ON traders(trader_type);

        CREATE TABLE IF NOT EXISTS meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    "#,
    )?;
    Ok(())
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SaveStats {
    pub translocators: usize,
    pub landmarks: usize,
    pub traders: usize,
}

/// Replaces the stored graph with `graph`. Links are not stored.
///
/// Expects the schema to exist; run it inside a transaction (`with_tx`) so a
/// failed write leaves the previous graph intact.
pub fn save_graph(tx: &Connection, graph: &NavigationGraph) -> Result<SaveStats> {
    let mut stats = SaveStats::default();
    tx.execute_batch("DELETE FROM translocators; DELETE FROM landmarks; DELETE FROM traders;")?;
    {
        let mut ins = tx.prepare("INSERT INTO translocators (origin_x, origin_y, dest_x, dest_y) VALUES (?1,?2,?3,?4)")?;
        for t in graph.translocators() {
            ins.execute(params![t.origin.x, t.origin.y, t.destination.x, t.destination.y])?;
            stats.translocators += 1;
        }
        let mut ins = tx.prepare("INSERT OR IGNORE INTO landmarks (name, x, y) VALUES (?1,?2,?3)")?;
        for l in graph.landmarks() {
            stats.landmarks += ins.execute(params![l.name, l.position.x, l.position.y])?;
        }
        let mut ins = tx.prepare("INSERT INTO traders (trader_type, name, x, y) VALUES (?1,?2,?3,?4)")?;
        for t in graph.traders() {
            ins.execute(params![t.trader_type.key(), t.name, t.position.x, t.position.y])?;
            stats.traders += 1;
        }
    }
    tx.execute(
        "INSERT INTO meta (key, value) VALUES ('translocator_count', ?1) \
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![stats.translocators.to_string()],
    )?;
    info!(
        "stored {} translocators, {} landmarks, {} traders",
        stats.translocators, stats.landmarks, stats.traders
    );
    Ok(stats)
}

/// Rebuilds a graph in stored (insertion) order. Missing tables yield an empty graph.
pub fn load_graph(conn: &Connection) -> Result<NavigationGraph> {
    let mut graph = NavigationGraph::new();
    if table_exists(conn, "translocators")? {
        let mut q = conn.prepare("SELECT origin_x, origin_y, dest_x, dest_y FROM translocators ORDER BY rowid")?;
        let rows = q.query_map([], |r| {
            Ok((Point::new(r.get(0)?, r.get(1)?), Point::new(r.get(2)?, r.get(3)?)))
        })?;
        for r in rows {
            let (origin, destination) = r?;
            graph.add_translocator(origin, destination, MergePolicy::KeepExisting);
        }
    }
    if table_exists(conn, "landmarks")? {
        let mut q = conn.prepare("SELECT name, x, y FROM landmarks ORDER BY rowid")?;
        let rows = q.query_map([], |r| Ok((r.get::<_, String>(0)?, Point::new(r.get(1)?, r.get(2)?))))?;
        for r in rows {
            let (name, p) = r?;
            graph.add_landmark(&name, p);
        }
    }
    if table_exists(conn, "traders")? {
        let mut q = conn.prepare("SELECT trader_type, name, x, y FROM traders ORDER BY rowid")?;
        let rows = q.query_map([], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, Point::new(r.get(2)?, r.get(3)?)))
        })?;
        for r in rows {
            let (key, name, position) = r?;
            let trader_type = TraderType::from_key(&key).unwrap_or_else(|| {
                warn!("unknown trader type `{}` for {}; treating as unknown", key, name);
                TraderType::Unknown
            });
            graph.add_trader(Trader { trader_type, name, position });
        }
    }
    Ok(graph)
}

/// Translocator count recorded by the last `save_graph`, if any.
pub fn stored_translocator_count(conn: &Connection) -> Result<Option<usize>> {
    if !table_exists(conn, "meta")? {
        return Ok(None);
    }
    let value: Option<String> = conn
        .query_row("SELECT value FROM meta WHERE key='translocator_count'", [], |row| row.get(0))
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()))
}

pub fn clear_graph(conn: &Connection) -> Result<()> {
    conn.execute_batch("DELETE FROM translocators; DELETE FROM landmarks; DELETE FROM traders; DELETE FROM meta;")?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn table_has_columns(conn: &Connection, table: &str, required: &BTreeSet<&str>) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    let mut present = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        present.insert(name);
    }
    Ok(required.iter().all(|c| present.contains(*c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outdated_translocator_table_is_replaced() -> Result<()> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute_batch("CREATE TABLE translocators (x INTEGER, y INTEGER, z INTEGER);")?;
        create_tables(&mut conn)?;
        let cols: BTreeSet<&str> = ["origin_x", "dest_y"].into_iter().collect();
        assert!(table_has_columns(&conn, "translocators", &cols)?);
        Ok(())
    }

    #[test]
    fn translocator_count_is_recorded() -> Result<()> {
        let mut conn = Connection::open_in_memory()?;
        assert_eq!(stored_translocator_count(&conn)?, None);
        create_tables(&mut conn)?;
        assert_eq!(stored_translocator_count(&conn)?, None);

        let mut g = NavigationGraph::new();
        g.add_translocator(Point::new(0, 0), Point::new(10, 10), MergePolicy::KeepExisting);
        g.add_translocator(Point::new(5, 5), Point::new(-10, 10), MergePolicy::KeepExisting);
        save_graph(&conn, &g)?;
        assert_eq!(stored_translocator_count(&conn)?, Some(2));

        clear_graph(&conn)?;
        assert_eq!(stored_translocator_count(&conn)?, None);
        Ok(())
    }

    #[test]
    fn load_from_blank_database_is_empty() -> Result<()> {
        let conn = Connection::open_in_memory()?;
        let g = load_graph(&conn)?;
        assert!(g.is_empty());
        assert_eq!(g.trader_count(), 0);
        Ok(())
    }
}
