//! repos / metrics lookups.

use openrisk_core::errors::StorageError;
use openrisk_core::{MetricId, RepoId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::sqlite_err;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRecord {
    pub id: RepoId,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub id: MetricId,
    pub name: String,
}

/// All repositories, ordered by id.
pub fn load_repos(conn: &Connection) -> Result<Vec<RepoRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT id, full_name FROM repos ORDER BY id")
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RepoRecord {
                id: row.get(0)?,
                full_name: row.get(1)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// All metrics, ordered by id.
pub fn load_metrics(conn: &Connection) -> Result<Vec<MetricRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached("SELECT id, name FROM metrics ORDER BY id")
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MetricRecord {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// Insert a repository if missing and return its id.
pub fn upsert_repo(conn: &Connection, full_name: &str) -> Result<RepoId, StorageError> {
    conn.execute(
        "INSERT OR IGNORE INTO repos (full_name) VALUES (?1)",
        params![full_name],
    )
    .map_err(sqlite_err)?;
    conn.query_row(
        "SELECT id FROM repos WHERE full_name = ?1",
        params![full_name],
        |row| row.get(0),
    )
    .map_err(sqlite_err)
}

/// Insert a metric if missing and return its id.
pub fn upsert_metric(conn: &Connection, name: &str) -> Result<MetricId, StorageError> {
    conn.execute(
        "INSERT OR IGNORE INTO metrics (name) VALUES (?1)",
        params![name],
    )
    .map_err(sqlite_err)?;
    conn.query_row(
        "SELECT id FROM metrics WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .map_err(sqlite_err)
}

pub fn find_repo(conn: &Connection, full_name: &str) -> Result<Option<RepoId>, StorageError> {
    conn.query_row(
        "SELECT id FROM repos WHERE full_name = ?1",
        params![full_name],
        |row| row.get(0),
    )
    .optional()
    .map_err(sqlite_err)
}
