//! V003: weak_labels, weak_label_meta.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS weak_labels (
    id INTEGER PRIMARY KEY,
    repo_id INTEGER NOT NULL,
    as_of_month TEXT NOT NULL,
    horizon_months INTEGER NOT NULL,
    risk_score REAL NOT NULL,
    risk_soft REAL NOT NULL,
    risk_binary INTEGER NOT NULL,
    sample_weight REAL NOT NULL,
    events_count INTEGER NOT NULL,
    mean_event_confidence REAL NOT NULL,
    evidence_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (repo_id, as_of_month, horizon_months)
);

CREATE TABLE IF NOT EXISTS weak_label_meta (
    id INTEGER PRIMARY KEY,
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL
);
"#;
