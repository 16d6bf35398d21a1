//! Tests for loading configuration documents from disk.

use std::path::Path;
use std::sync::Mutex;

use openrisk_core::config::{
    load_document, resolve_store_path, LabelConfig, MetricsConfig, ModelConfig, SignalsConfig,
    SourcesConfig, DEFAULT_SQLITE_PATH, STORE_ENV,
};
use openrisk_core::errors::{ConfigError, ErrorCode};

/// Serializes tests that touch `OPENRISK_DB`.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn loads_all_documents_from_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let sources = write(
        &dir,
        "sources.yaml",
        "defaults: { sqlite_path: data/test.db }\nrepos:\n  - { org: a, repo: b }\n",
    );
    let metrics = write(
        &dir,
        "metrics.yaml",
        "efficiency: { primary_metric: change_request_response_time, fallback_metric: issue_response_time }\n",
    );
    let signals = write(
        &dir,
        "signals.yaml",
        "signals:\n  - { id: s, conditions: { feature: stars, op: '<', value: 1 } }\n",
    );
    let model = write(&dir, "model.yaml", "");

    let sources: SourcesConfig = load_document(&sources).unwrap();
    assert_eq!(sources.enabled_full_names(), vec!["a/b".to_string()]);

    let metrics: MetricsConfig = load_document(&metrics).unwrap();
    assert_eq!(
        metrics.efficiency.fallback_pair(),
        Some(("change_request_response_time", "issue_response_time"))
    );

    let signals = SignalsConfig::load(&signals).unwrap();
    assert_eq!(signals.signals.len(), 1);

    let model: ModelConfig = load_document(&model).unwrap();
    assert_eq!(LabelConfig::from_model(&model).unwrap().horizon_months, 3);
}

#[test]
fn missing_signals_file_is_config_error() {
    let err = SignalsConfig::load(Path::new("/definitely/missing/signals.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
    assert_eq!(err.error_code(), "CONFIG_ERROR");
}

#[test]
fn store_path_resolution_order() {
    let _lock = ENV_MUTEX.lock().unwrap();
    std::env::remove_var(STORE_ENV);

    let mut sources = SourcesConfig::default();
    assert_eq!(
        resolve_store_path(None, &sources),
        Path::new(DEFAULT_SQLITE_PATH)
    );

    sources.defaults.sqlite_path = Some("from/sources.db".into());
    assert_eq!(resolve_store_path(None, &sources), Path::new("from/sources.db"));

    std::env::set_var(STORE_ENV, "from/env.db");
    assert_eq!(resolve_store_path(None, &sources), Path::new("from/env.db"));

    assert_eq!(
        resolve_store_path(Some(Path::new("from/cli.db")), &sources),
        Path::new("from/cli.db")
    );
    std::env::remove_var(STORE_ENV);
}
