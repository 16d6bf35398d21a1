//! End-to-end runs of the command surface against an on-disk store.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use openrisk_cli::{execute, Cli, Command};
use openrisk_core::errors::ErrorCode;
use openrisk_storage::queries::{catalog, features, signal_events, time_series, weak_labels};
use openrisk_storage::DatabaseManager;
use tempfile::TempDir;

const SIGNALS: &str = r#"
windows:
  win3: { months: 3 }
scoring:
  severity_levels:
    high: { score: 60 }
signals:
  - id: stars_decline
    dimension: community
    severity: high
    conditions: { feature: stars_yoy, op: "<" }
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        ws.write("sources.yaml", "repos:\n  - { org: acme, repo: widget }\n");
        ws.write("signals.yaml", SIGNALS);
        ws.write("metrics.yaml", "");
        ws.write("model.yaml", "task: { horizon_months: 3 }\n");
        ws
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write(&self, name: &str, body: &str) {
        fs::write(self.path(name), body).unwrap();
    }

    fn db_path(&self) -> PathBuf {
        self.path("store/openrisk.db")
    }

    fn seed_store(&self) {
        let db = DatabaseManager::open(&self.db_path()).unwrap();
        let repo = catalog::upsert_repo(db.conn(), "acme/widget").unwrap();
        let stars = catalog::upsert_metric(db.conn(), "stars").unwrap();
        for month in ["2024-01", "2024-02", "2024-03"] {
            features::insert_feature(db.conn(), repo, stars, month, "month", "value", 5.0).unwrap();
            features::insert_feature(db.conn(), repo, stars, month, "month", "yoy", -0.4).unwrap();
            time_series::insert_point(db.conn(), repo, stars, month, 5.0, false).unwrap();
        }
        db.checkpoint().unwrap();
    }

    /// A store written before any migration ran: one event, user_version 0.
    fn seed_legacy_store(&self) {
        fs::create_dir_all(self.path("store")).unwrap();
        let conn = rusqlite::Connection::open(self.db_path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE signal_events (
                id INTEGER PRIMARY KEY, repo_id INTEGER NOT NULL, signal_id TEXT NOT NULL,
                metric_id INTEGER NOT NULL, start_month TEXT NOT NULL, end_month TEXT NOT NULL,
                confidence REAL NOT NULL, severity REAL NOT NULL, evidence_ref TEXT NOT NULL);
             INSERT INTO signal_events
                (repo_id, signal_id, metric_id, start_month, end_month, confidence, severity, evidence_ref)
             VALUES (1, 'stars_decline', 1, '2023-01', '2023-03', 0.5, 60.0, '{}');",
        )
        .unwrap();
    }

    /// (user_version, signal_events rows) read without running migrations.
    fn raw_state(&self) -> (u32, i64) {
        let conn = rusqlite::Connection::open(self.db_path()).unwrap();
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM signal_events", [], |r| r.get(0))
            .unwrap();
        (version, rows)
    }

    fn cli(&self, args: &[&str]) -> Cli {
        let p = |name: &str| self.path(name).display().to_string();
        let mut argv: Vec<String> = vec!["openrisk".into()];
        argv.extend(args.iter().map(|a| a.to_string()));
        argv.extend([
            "--sources".into(),
            p("sources.yaml"),
            "--db".into(),
            self.db_path().display().to_string(),
        ]);
        match args.first() {
            Some(&"signals") => argv.extend(self.signal_flags()),
            Some(&"labels") => argv.extend(["--model".into(), p("model.yaml")]),
            Some(&"run") => {
                argv.extend(self.signal_flags());
                argv.extend(["--model".into(), p("model.yaml")]);
            }
            _ => {}
        }
        Cli::try_parse_from(argv).unwrap()
    }

    fn signal_flags(&self) -> Vec<String> {
        vec![
            "--signals".into(),
            self.path("signals.yaml").display().to_string(),
            "--metrics".into(),
            self.path("metrics.yaml").display().to_string(),
            "--no-export-reports".into(),
        ]
    }
}

fn open(path: &Path) -> DatabaseManager {
    DatabaseManager::open(path).unwrap()
}

#[test]
fn parses_repeated_horizons() {
    let cli = Cli::try_parse_from([
        "openrisk", "labels", "--horizon", "3", "--horizon", "6", "--replace", "-v",
    ])
    .unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.sources, PathBuf::from("configs/sources.yaml"));
    match cli.command {
        Command::Labels(args) => {
            assert_eq!(args.horizons, vec![3, 6]);
            assert!(args.replace);
            assert_eq!(args.model, PathBuf::from("configs/model.yaml"));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn unknown_flag_is_a_usage_error() {
    assert!(Cli::try_parse_from(["openrisk", "signals", "--bogus"]).is_err());
    assert!(Cli::try_parse_from(["openrisk"]).is_err());
}

#[test]
fn run_detects_signals_then_builds_labels() {
    let ws = Workspace::new();
    ws.seed_store();

    let lines = execute(&ws.cli(&["run"])).unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("signal_events=1 "), "{lines:?}");
    assert_eq!(lines[1], "weak_labels=3 horizon=3");

    let db = open(&ws.db_path());
    assert_eq!(signal_events::count_events(db.conn()).unwrap(), 1);
    assert_eq!(weak_labels::count_labels(db.conn(), 3).unwrap(), 3);
}

#[test]
fn signals_then_labels_as_separate_commands() {
    let ws = Workspace::new();
    ws.seed_store();
    let lines = execute(&ws.cli(&["signals"])).unwrap();
    assert_eq!(lines.len(), 1);
    let lines = execute(&ws.cli(&["labels", "--horizon", "1", "--horizon", "2"])).unwrap();
    assert_eq!(lines, vec!["weak_labels=3 horizon=1", "weak_labels=3 horizon=2"]);
}

#[test]
fn missing_config_fails_before_touching_the_store() {
    let ws = Workspace::new();
    fs::remove_file(ws.path("signals.yaml")).unwrap();
    let err = execute(&ws.cli(&["signals"])).unwrap_err();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert!(err.diagnostic().starts_with("error[CONFIG_ERROR]: "));
    assert!(!ws.db_path().exists());
}

const CYCLIC_SIGNALS: &str = r#"
signals:
  - id: a
    requires: { triggered_signals_any: [b] }
    conditions: { feature: stars_yoy, op: "<" }
  - id: b
    requires: { triggered_signals_all: [a] }
    conditions: { feature: stars, op: ">" }
"#;

#[test]
fn signal_cycle_leaves_an_unmigrated_store_untouched() {
    let ws = Workspace::new();
    ws.seed_legacy_store();
    ws.write("signals.yaml", CYCLIC_SIGNALS);

    for command in ["signals", "run"] {
        let err = execute(&ws.cli(&[command])).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR", "{command}");
        assert!(err.to_string().contains("a, b"), "{err}");
        assert_eq!(ws.raw_state(), (0, 1), "{command}");
    }
}

#[test]
fn invalid_horizon_leaves_an_unmigrated_store_untouched() {
    let ws = Workspace::new();
    ws.seed_legacy_store();

    let err = execute(&ws.cli(&["labels", "--horizon", "3", "--horizon", "0"])).unwrap_err();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert_eq!(ws.raw_state(), (0, 1));

    ws.write("model.yaml", "task: { horizon_months: 0 }\n");
    let err = execute(&ws.cli(&["run"])).unwrap_err();
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert_eq!(ws.raw_state(), (0, 1));
}

#[test]
fn labels_keep_events_of_a_legacy_store() {
    let ws = Workspace::new();
    ws.seed_legacy_store();
    execute(&ws.cli(&["labels"])).unwrap();
    assert_eq!(ws.raw_state(), (3, 1));
}

#[test]
fn empty_store_reports_missing_data() {
    let ws = Workspace::new();
    let err = execute(&ws.cli(&["signals"])).unwrap_err();
    assert_eq!(err.error_code(), "MISSING_DATA");
}

#[cfg(unix)]
#[test]
fn failing_report_command_is_fatal() {
    let ws = Workspace::new();
    ws.seed_store();
    ws.write(
        "sources.yaml",
        "repos: []\nreports:\n  commands:\n    - [sh, -c, \"exit 4\"]\n",
    );
    let mut cli = ws.cli(&["signals"]);
    if let Command::Signals(args) = &mut cli.command {
        args.no_export_reports = false;
    }
    let err = execute(&cli).unwrap_err();
    assert_eq!(err.error_code(), "REPORT_FAILED");
}
