//! V001: Input tables owned by the ingestion and feature collaborators.
//! repos, metrics, time_series, derived_features.
//!
//! `IF NOT EXISTS` throughout: on a store populated upstream these already
//! exist, possibly with extra columns, and are left untouched.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repos (
    id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS metrics (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Raw value table. is_raw = 1 marks directly-published points,
-- is_raw = 0 the regular monthly series.
CREATE TABLE IF NOT EXISTS time_series (
    id INTEGER PRIMARY KEY,
    repo_id INTEGER NOT NULL,
    metric_id INTEGER NOT NULL,
    period TEXT NOT NULL,
    period_type TEXT NOT NULL,
    value REAL NOT NULL,
    is_raw INTEGER NOT NULL DEFAULT 0,
    source_key TEXT NOT NULL DEFAULT '',
    UNIQUE (repo_id, metric_id, period, period_type, is_raw)
);

CREATE TABLE IF NOT EXISTS derived_features (
    id INTEGER PRIMARY KEY,
    repo_id INTEGER NOT NULL,
    metric_id INTEGER NOT NULL,
    period TEXT NOT NULL,
    period_type TEXT NOT NULL,
    feature TEXT NOT NULL,
    value REAL NOT NULL,
    UNIQUE (repo_id, metric_id, period, period_type, feature)
);

CREATE INDEX IF NOT EXISTS idx_derived_features_lookup
    ON derived_features(metric_id, feature, period_type);
CREATE INDEX IF NOT EXISTS idx_time_series_repo
    ON time_series(repo_id, period_type);
"#;
