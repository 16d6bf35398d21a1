//! Command dispatch. Every command returns its stdout summary lines.

use openrisk_core::config::{
    load_document, resolve_store_path, LabelConfig, MetricsConfig, ModelConfig, SignalsConfig,
    SourcesConfig,
};
use openrisk_core::errors::PipelineError;
use openrisk_signals::{label_configs, run_label_configs, run_signal_plan, EvaluationPlan};
use openrisk_storage::DatabaseManager;

use crate::cli::{Cli, Command, LabelArgs, SignalArgs};
use crate::reports;

/// Run the selected command.
///
/// Every configuration document is loaded and validated, including signal
/// ordering and label horizons, before the store is opened. Configuration
/// errors therefore never migrate or mutate it.
pub fn execute(cli: &Cli) -> Result<Vec<String>, PipelineError> {
    let sources: SourcesConfig = load_document(&cli.sources)?;
    match &cli.command {
        Command::Signals(args) => {
            let (signals, metrics) = load_signal_documents(args)?;
            let plan = EvaluationPlan::build(&signals)?;
            let db = open_store(cli, &sources)?;
            signal_command(&db, &sources, args, &plan, &signals, &metrics)
        }
        Command::Labels(args) => {
            let configs = load_label_configs(args)?;
            let db = open_store(cli, &sources)?;
            label_command(&db, &sources, args, &configs)
        }
        Command::Run { signals: signal_args, labels: label_args } => {
            let (signals, metrics) = load_signal_documents(signal_args)?;
            let plan = EvaluationPlan::build(&signals)?;
            let configs = load_label_configs(label_args)?;
            let db = open_store(cli, &sources)?;
            let mut lines = signal_command(&db, &sources, signal_args, &plan, &signals, &metrics)?;
            lines.extend(label_command(&db, &sources, label_args, &configs)?);
            Ok(lines)
        }
    }
}

fn load_signal_documents(args: &SignalArgs) -> Result<(SignalsConfig, MetricsConfig), PipelineError> {
    let signals = SignalsConfig::load(&args.signals)?;
    let metrics: MetricsConfig = load_document(&args.metrics)?;
    tracing::info!(
        signals = signals.signals.len(),
        path = %args.signals.display(),
        "loaded signal definitions"
    );
    Ok((signals, metrics))
}

fn load_label_configs(args: &LabelArgs) -> Result<Vec<LabelConfig>, PipelineError> {
    let model: ModelConfig = load_document(&args.model)?;
    Ok(label_configs(&model, &args.horizons)?)
}

fn open_store(cli: &Cli, sources: &SourcesConfig) -> Result<DatabaseManager, PipelineError> {
    let path = resolve_store_path(cli.db.as_deref(), sources);
    tracing::debug!(path = %path.display(), "opening store");
    Ok(DatabaseManager::open(&path)?)
}

fn signal_command(
    db: &DatabaseManager,
    sources: &SourcesConfig,
    args: &SignalArgs,
    plan: &EvaluationPlan<'_>,
    signals: &SignalsConfig,
    metrics: &MetricsConfig,
) -> Result<Vec<String>, PipelineError> {
    let summary = run_signal_plan(db, plan, signals, metrics)?;
    db.checkpoint()?;
    if args.no_export_reports {
        tracing::info!("report export skipped (--no-export-reports)");
    } else {
        let ran = reports::run_report_commands(&sources.reports.commands, db.path())?;
        tracing::info!(commands = ran, "report export complete");
    }
    Ok(vec![summary.to_string()])
}

fn label_command(
    db: &DatabaseManager,
    sources: &SourcesConfig,
    args: &LabelArgs,
    configs: &[LabelConfig],
) -> Result<Vec<String>, PipelineError> {
    let summaries = run_label_configs(db, sources, configs, &args.model, args.replace)?;
    db.checkpoint()?;
    Ok(summaries.iter().map(ToString::to_string).collect())
}
