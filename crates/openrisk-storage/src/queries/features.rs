//! derived_features queries.

use openrisk_core::errors::StorageError;
use openrisk_core::{MetricId, RepoId};
use rusqlite::{params, Connection};

use crate::sqlite_err;

/// One monthly feature value. `period` is kept as stored; callers decide
/// what to do with malformed periods.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub repo_id: RepoId,
    pub period: String,
    pub value: f64,
}

/// A coarse-period `trend_dir` value (period_type `quarter` or `year`).
#[derive(Debug, Clone, PartialEq)]
pub struct TrendRow {
    pub repo_id: RepoId,
    pub metric_id: MetricId,
    pub period: String,
    pub value: f64,
}

/// Monthly values of one (metric, feature) across every repository.
pub fn load_monthly_feature(
    conn: &Connection,
    metric_id: MetricId,
    feature: &str,
) -> Result<Vec<FeatureRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT repo_id, period, value
             FROM derived_features
             WHERE metric_id = ?1 AND feature = ?2 AND period_type = 'month'",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![metric_id, feature], |row| {
            Ok(FeatureRow {
                repo_id: row.get(0)?,
                period: row.get(1)?,
                value: row.get(2)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// All `trend_dir` rows of one coarse period type.
pub fn load_trend_features(
    conn: &Connection,
    period_type: &str,
) -> Result<Vec<TrendRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT repo_id, metric_id, period, value
             FROM derived_features
             WHERE period_type = ?1 AND feature = 'trend_dir'",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![period_type], |row| {
            Ok(TrendRow {
                repo_id: row.get(0)?,
                metric_id: row.get(1)?,
                period: row.get(2)?,
                value: row.get(3)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

pub fn count_features(conn: &Connection) -> Result<i64, StorageError> {
    conn.query_row("SELECT COUNT(*) FROM derived_features", [], |row| row.get(0))
        .map_err(sqlite_err)
}

/// Insert or replace one feature value.
pub fn insert_feature(
    conn: &Connection,
    repo_id: RepoId,
    metric_id: MetricId,
    period: &str,
    period_type: &str,
    feature: &str,
    value: f64,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO derived_features (repo_id, metric_id, period, period_type, feature, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (repo_id, metric_id, period, period_type, feature)
         DO UPDATE SET value = excluded.value",
        params![repo_id, metric_id, period, period_type, feature, value],
    )
    .map_err(sqlite_err)?;
    Ok(())
}
