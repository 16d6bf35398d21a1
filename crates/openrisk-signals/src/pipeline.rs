//! Run pipelines against the store: the signal pass and the label pass.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use openrisk_core::config::{LabelConfig, MetricsConfig, ModelConfig, SignalsConfig, SourcesConfig};
use openrisk_core::errors::{ConfigError, PipelineError};
use openrisk_core::Month;
use openrisk_storage::connection::writer::with_immediate_transaction;
use openrisk_storage::queries::catalog::{self, RepoRecord};
use openrisk_storage::queries::signal_events::{self, SignalEventRecord};
use openrisk_storage::queries::{features, time_series, weak_labels};
use openrisk_storage::DatabaseManager;
use rusqlite::Connection;

use crate::features::load_feature_store;
use crate::labels::aggregate_repo;
use crate::materializer::{Materializer, SignalEvent};
use crate::ordering::EvaluationPlan;
use crate::registry::FiredRegistry;

/// Outcome of a signal pass.
#[derive(Debug, Clone)]
pub struct SignalRunSummary {
    pub events_written: i64,
    pub signals_evaluated: usize,
    pub elapsed: Duration,
}

impl fmt::Display for SignalRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signal_events={} elapsed={:.2}s",
            self.events_written,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Outcome of one horizon of a label pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRunSummary {
    pub horizon_months: u32,
    pub labels_written: usize,
    pub repos: usize,
}

impl fmt::Display for LabelRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weak_labels={} horizon={}", self.labels_written, self.horizon_months)
    }
}

/// Rebuild every signal event from the current feature table.
///
/// Configuration problems surface before anything is deleted.
pub fn run_signal_pass(
    db: &DatabaseManager,
    signals: &SignalsConfig,
    metrics: &MetricsConfig,
) -> Result<SignalRunSummary, PipelineError> {
    let plan = EvaluationPlan::build(signals)?;
    run_signal_plan(db, &plan, signals, metrics)
}

/// Rebuild every signal event following an already validated plan.
///
/// Events are cleared in one statement and then written one transaction per
/// signal, so a failure part way leaves a partial table; re-running restores
/// it.
pub fn run_signal_plan(
    db: &DatabaseManager,
    plan: &EvaluationPlan<'_>,
    signals: &SignalsConfig,
    metrics: &MetricsConfig,
) -> Result<SignalRunSummary, PipelineError> {
    let started = Instant::now();
    if plan.is_empty() {
        tracing::warn!("no enabled signals; the pass only clears signal events");
    }
    let conn = db.conn();

    if features::count_features(conn)? == 0 {
        return Err(PipelineError::MissingData {
            message: "derived_features has no rows; compute features before detecting signals"
                .to_string(),
        });
    }

    let repos = catalog::load_repos(conn)?;
    let store = load_feature_store(conn, signals, metrics)?;
    tracing::info!(
        repos = repos.len(),
        simple = plan.simple.len(),
        composite = plan.composite.len(),
        "starting signal pass"
    );

    let removed = signal_events::delete_all(conn)?;
    tracing::debug!(removed, "cleared signal events");

    let materializer = Materializer::new(signals, &store, metrics);
    let mut registry = FiredRegistry::new();
    for signal in plan.simple.iter().chain(&plan.composite) {
        let events = materializer.evaluate_signal(signal, &repos, &mut registry);
        let records: Vec<SignalEventRecord> = events.iter().map(SignalEvent::to_record).collect();
        with_immediate_transaction(conn, |tx| signal_events::insert_events(tx, &records))?;
    }

    let summary = SignalRunSummary {
        events_written: signal_events::count_events(conn)?,
        signals_evaluated: plan.len(),
        elapsed: started.elapsed(),
    };
    tracing::info!(
        events = summary.events_written,
        signals = summary.signals_evaluated,
        "signal pass complete"
    );
    Ok(summary)
}

/// Validated label parameters for each requested horizon.
///
/// An empty `horizons` uses `task.horizon_months` from the model document.
pub fn label_configs(model: &ModelConfig, horizons: &[i64]) -> Result<Vec<LabelConfig>, ConfigError> {
    if horizons.is_empty() {
        return Ok(vec![LabelConfig::from_model(model)?]);
    }
    horizons
        .iter()
        .map(|h| LabelConfig::with_horizon(model, Some(*h)))
        .collect()
}

/// Build weak labels for each requested horizon.
///
/// Every horizon is validated before the store is touched.
pub fn run_label_pass(
    db: &DatabaseManager,
    sources: &SourcesConfig,
    model: &ModelConfig,
    model_path: &Path,
    horizons: &[i64],
    replace: bool,
) -> Result<Vec<LabelRunSummary>, PipelineError> {
    let configs = label_configs(model, horizons)?;
    run_label_configs(db, sources, &configs, model_path, replace)
}

/// Build weak labels for already validated label parameters.
pub fn run_label_configs(
    db: &DatabaseManager,
    sources: &SourcesConfig,
    configs: &[LabelConfig],
    model_path: &Path,
    replace: bool,
) -> Result<Vec<LabelRunSummary>, PipelineError> {
    let conn = db.conn();
    if replace {
        weak_labels::reset_label_tables(conn)?;
    }

    let created_at = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    with_immediate_transaction(conn, |tx| {
        weak_labels::upsert_meta(tx, "model_yaml", &model_path.display().to_string())?;
        weak_labels::upsert_meta(tx, "created_at", &created_at)
    })?;

    let histories = load_histories(conn, sources)?;
    let mut summaries = Vec::with_capacity(configs.len());
    for config in configs {
        let mut written = 0usize;
        for (repo, months, events) in &histories {
            let labels = aggregate_repo(repo, months, events, config, &created_at);
            with_immediate_transaction(conn, |tx| weak_labels::upsert_labels(tx, &labels))?;
            written += labels.len();
        }
        tracing::info!(
            horizon = config.horizon_months,
            labels = written,
            repos = histories.len(),
            "label pass complete"
        );
        summaries.push(LabelRunSummary {
            horizon_months: config.horizon_months,
            labels_written: written,
            repos: histories.len(),
        });
    }
    Ok(summaries)
}

type RepoHistory = (RepoRecord, Vec<Month>, Vec<SignalEventRecord>);

/// Repositories to label, by full name, with their observed months and events.
///
/// Enabled repositories from `sources.yaml`; every stored repository when
/// none are listed. Repositories without a monthly history are skipped.
fn load_histories(conn: &Connection, sources: &SourcesConfig) -> Result<Vec<RepoHistory>, PipelineError> {
    let configured = sources.enabled_full_names();
    let mut repos: Vec<RepoRecord> = catalog::load_repos(conn)?
        .into_iter()
        .filter(|r| configured.is_empty() || configured.contains(&r.full_name))
        .collect();
    repos.sort_by(|a, b| a.full_name.cmp(&b.full_name));

    let mut histories = Vec::with_capacity(repos.len());
    for repo in repos {
        let Some((first, last)) = time_series::month_bounds(conn, repo.id)? else {
            tracing::debug!(repo = %repo.full_name, "no monthly history, skipping");
            continue;
        };
        let (Ok(first), Ok(last)) = (first.parse::<Month>(), last.parse::<Month>()) else {
            tracing::warn!(repo = %repo.full_name, %first, %last, "unparseable history bounds, skipping");
            continue;
        };
        let months = Month::sequence(first, last);
        let events = signal_events::load_for_repo(conn, repo.id)?;
        histories.push((repo, months, events));
    }
    Ok(histories)
}
