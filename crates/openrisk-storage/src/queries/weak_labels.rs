//! weak_labels / weak_label_meta queries.

use openrisk_core::errors::StorageError;
use openrisk_core::{Month, RepoId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::migrations::v003_weak_labels;
use crate::sqlite_err;

/// One label row, keyed by (repo_id, as_of_month, horizon_months).
#[derive(Debug, Clone, PartialEq)]
pub struct WeakLabelRecord {
    pub repo_id: RepoId,
    pub as_of_month: Month,
    pub horizon_months: u32,
    pub risk_score: f64,
    pub risk_soft: f64,
    pub risk_binary: bool,
    pub sample_weight: f64,
    pub events_count: i64,
    pub mean_event_confidence: f64,
    pub evidence_json: String,
    pub created_at: String,
}

/// Drop and recreate the label tables.
pub fn reset_label_tables(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS weak_labels;
         DROP TABLE IF EXISTS weak_label_meta;",
    )
    .map_err(sqlite_err)?;
    conn.execute_batch(v003_weak_labels::MIGRATION_SQL)
        .map_err(sqlite_err)?;
    tracing::info!("recreated weak label tables");
    Ok(())
}

/// Upsert a batch of labels by natural key. Call inside a transaction.
pub fn upsert_labels(conn: &Connection, labels: &[WeakLabelRecord]) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO weak_labels
                (repo_id, as_of_month, horizon_months, risk_score, risk_soft, risk_binary,
                 sample_weight, events_count, mean_event_confidence, evidence_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (repo_id, as_of_month, horizon_months) DO UPDATE SET
                risk_score = excluded.risk_score,
                risk_soft = excluded.risk_soft,
                risk_binary = excluded.risk_binary,
                sample_weight = excluded.sample_weight,
                events_count = excluded.events_count,
                mean_event_confidence = excluded.mean_event_confidence,
                evidence_json = excluded.evidence_json,
                created_at = excluded.created_at",
        )
        .map_err(sqlite_err)?;
    for l in labels {
        stmt.execute(params![
            l.repo_id,
            l.as_of_month.to_string(),
            l.horizon_months,
            l.risk_score,
            l.risk_soft,
            l.risk_binary,
            l.sample_weight,
            l.events_count,
            l.mean_event_confidence,
            l.evidence_json,
            l.created_at,
        ])
        .map_err(sqlite_err)?;
    }
    Ok(())
}

pub fn upsert_meta(conn: &Connection, key: &str, value: &str) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO weak_label_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT (key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .map_err(sqlite_err)?;
    Ok(())
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, StorageError> {
    conn.query_row(
        "SELECT value FROM weak_label_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(sqlite_err)
}

pub fn count_labels(conn: &Connection, horizon_months: u32) -> Result<i64, StorageError> {
    conn.query_row(
        "SELECT COUNT(*) FROM weak_labels WHERE horizon_months = ?1",
        params![horizon_months],
        |row| row.get(0),
    )
    .map_err(sqlite_err)
}

/// Labels of one repository at one horizon, ordered by month.
pub fn load_labels(
    conn: &Connection,
    repo_id: RepoId,
    horizon_months: u32,
) -> Result<Vec<WeakLabelRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT repo_id, as_of_month, horizon_months, risk_score, risk_soft, risk_binary,
                    sample_weight, events_count, mean_event_confidence, evidence_json, created_at
             FROM weak_labels
             WHERE repo_id = ?1 AND horizon_months = ?2
             ORDER BY as_of_month",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![repo_id, horizon_months], |row| {
            let month: String = row.get(1)?;
            let Ok(as_of_month) = month.parse::<Month>() else {
                return Ok(None);
            };
            Ok(Some(WeakLabelRecord {
                repo_id: row.get(0)?,
                as_of_month,
                horizon_months: row.get(2)?,
                risk_score: row.get(3)?,
                risk_soft: row.get(4)?,
                risk_binary: row.get(5)?,
                sample_weight: row.get(6)?,
                events_count: row.get(7)?,
                mean_event_confidence: row.get(8)?,
                evidence_json: row.get(9)?,
                created_at: row.get(10)?,
            }))
        })
        .map_err(sqlite_err)?;

    let mut out = Vec::new();
    for row in rows {
        if let Some(record) = row.map_err(sqlite_err)? {
            out.push(record);
        }
    }
    Ok(out)
}
