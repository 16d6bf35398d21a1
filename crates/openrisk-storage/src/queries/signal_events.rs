//! signal_events queries.

use openrisk_core::errors::StorageError;
use openrisk_core::{MetricId, Month, RepoId};
use rusqlite::{params, Connection};

use crate::sqlite_err;

/// A signal event as written by the materializer.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEventRecord {
    pub repo_id: RepoId,
    pub signal_id: String,
    /// `None` for composite signals.
    pub metric_id: Option<MetricId>,
    pub start_month: Month,
    pub end_month: Month,
    pub confidence: f64,
    pub severity: f64,
    /// Serialized evidence document.
    pub evidence: String,
}

/// Delete every event. Returns the number of rows removed.
pub fn delete_all(conn: &Connection) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM signal_events", []).map_err(sqlite_err)
}

/// Insert a batch of events. Call inside a transaction.
pub fn insert_events(conn: &Connection, events: &[SignalEventRecord]) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO signal_events
                (repo_id, signal_id, metric_id, start_month, end_month, confidence, severity, evidence_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .map_err(sqlite_err)?;
    for e in events {
        stmt.execute(params![
            e.repo_id,
            e.signal_id,
            e.metric_id,
            e.start_month.to_string(),
            e.end_month.to_string(),
            e.confidence,
            e.severity,
            e.evidence,
        ])
        .map_err(sqlite_err)?;
    }
    Ok(())
}

pub fn count_events(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM signal_events", [], |row| row.get(0))
        .map_err(sqlite_err)
}

/// Events of one repository ordered by end month.
///
/// Rows whose months do not parse are skipped with a warning; they cannot
/// be placed on the timeline.
pub fn load_for_repo(
    conn: &Connection,
    repo_id: RepoId,
) -> Result<Vec<SignalEventRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT repo_id, signal_id, metric_id, start_month, end_month, confidence, severity, evidence_ref
             FROM signal_events
             WHERE repo_id = ?1
             ORDER BY end_month, id",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![repo_id], |row| {
            Ok((
                row.get::<_, RepoId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<MetricId>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<f64>>(5)?,
                row.get::<_, Option<f64>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })
        .map_err(sqlite_err)?;

    let mut out = Vec::new();
    for row in rows {
        let (repo_id, signal_id, metric_id, start, end, confidence, severity, evidence) =
            row.map_err(sqlite_err)?;
        let (Ok(start_month), Ok(end_month)) = (start.parse::<Month>(), end.parse::<Month>()) else {
            tracing::warn!(repo_id, signal_id = %signal_id, start = %start, end = %end, "skipping event with malformed months");
            continue;
        };
        out.push(SignalEventRecord {
            repo_id,
            signal_id,
            metric_id,
            start_month,
            end_month,
            confidence: confidence.unwrap_or(0.0),
            severity: severity.unwrap_or(0.0),
            evidence: evidence.unwrap_or_default(),
        });
    }
    Ok(out)
}
