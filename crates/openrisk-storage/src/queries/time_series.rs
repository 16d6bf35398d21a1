//! time_series (raw value table) queries.

use openrisk_core::errors::StorageError;
use openrisk_core::{MetricId, RepoId};
use rusqlite::{params, Connection};

use crate::sqlite_err;

/// Monthly periods that carry a regular (non-raw) point, per repository.
pub fn load_monthly_periods(
    conn: &Connection,
    metric_id: MetricId,
) -> Result<Vec<(RepoId, String)>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT repo_id, period
             FROM time_series
             WHERE metric_id = ?1 AND period_type = 'month' AND is_raw = 0",
        )
        .map_err(sqlite_err)?;
    let rows = stmt
        .query_map(params![metric_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

/// First and last month of a repository's regular monthly series.
pub fn month_bounds(
    conn: &Connection,
    repo_id: RepoId,
) -> Result<Option<(String, String)>, StorageError> {
    let (min, max): (Option<String>, Option<String>) = conn
        .query_row(
            "SELECT MIN(period), MAX(period)
             FROM time_series
             WHERE repo_id = ?1 AND period_type = 'month' AND is_raw = 0",
            params![repo_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(sqlite_err)?;
    Ok(min.zip(max))
}

/// Insert or replace one point.
pub fn insert_point(
    conn: &Connection,
    repo_id: RepoId,
    metric_id: MetricId,
    period: &str,
    value: f64,
    is_raw: bool,
) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO time_series (repo_id, metric_id, period, period_type, value, is_raw, source_key)
         VALUES (?1, ?2, ?3, 'month', ?4, ?5, ?3)
         ON CONFLICT (repo_id, metric_id, period, period_type, is_raw)
         DO UPDATE SET value = excluded.value",
        params![repo_id, metric_id, period, value, is_raw],
    )
    .map_err(sqlite_err)?;
    Ok(())
}
