//! V002: signal_events.
//!
//! An older copy of the table required a metric for every event, which
//! composite events do not have. The table is rebuilt in place: rows are
//! copied into the new shape, then the old table is dropped and the new one
//! renamed. A store without the table gets an empty one.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS signal_events (
    id INTEGER PRIMARY KEY,
    repo_id INTEGER NOT NULL,
    signal_id TEXT NOT NULL,
    metric_id INTEGER,
    start_month TEXT NOT NULL,
    end_month TEXT NOT NULL,
    confidence REAL NOT NULL,
    severity REAL NOT NULL,
    evidence_ref TEXT NOT NULL
);

DROP TABLE IF EXISTS signal_events_new;

CREATE TABLE signal_events_new (
    id INTEGER PRIMARY KEY,
    repo_id INTEGER NOT NULL,
    signal_id TEXT NOT NULL,
    metric_id INTEGER,
    start_month TEXT NOT NULL,
    end_month TEXT NOT NULL,
    confidence REAL NOT NULL,
    severity REAL NOT NULL,
    evidence_ref TEXT NOT NULL
);

INSERT INTO signal_events_new
    (id, repo_id, signal_id, metric_id, start_month, end_month, confidence, severity, evidence_ref)
SELECT id, repo_id, signal_id, metric_id, start_month, end_month, confidence, severity, evidence_ref
FROM signal_events;

DROP TABLE signal_events;

ALTER TABLE signal_events_new RENAME TO signal_events;

CREATE INDEX IF NOT EXISTS idx_signal_events_repo_end
    ON signal_events(repo_id, end_month);
CREATE INDEX IF NOT EXISTS idx_signal_events_signal
    ON signal_events(signal_id);
"#;
