//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "openrisk",
    about = "Detect governance-risk signals in repository metrics and derive weak labels",
    version
)]
pub struct Cli {
    /// Path to sources.yaml (repositories, store location, report commands).
    #[arg(long, global = true, default_value = "configs/sources.yaml")]
    pub sources: PathBuf,

    /// SQLite store path. Overrides OPENRISK_DB and sources.yaml.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Raise the default log level to debug.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild signal events from the feature table.
    Signals(SignalArgs),

    /// Build weak labels from the current signal events.
    Labels(LabelArgs),

    /// Run the signal pass, then the label pass.
    Run {
        #[command(flatten)]
        signals: SignalArgs,

        #[command(flatten)]
        labels: LabelArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SignalArgs {
    /// Path to signals.yaml.
    #[arg(long, default_value = "configs/signals.yaml")]
    pub signals: PathBuf,

    /// Path to metrics.yaml.
    #[arg(long, default_value = "configs/metrics.yaml")]
    pub metrics: PathBuf,

    /// Skip the report commands listed in sources.yaml.
    #[arg(long)]
    pub no_export_reports: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LabelArgs {
    /// Path to model.yaml.
    #[arg(long, default_value = "configs/model.yaml")]
    pub model: PathBuf,

    /// Label horizon in months. Repeat for several horizons; defaults to
    /// task.horizon_months.
    #[arg(long = "horizon")]
    pub horizons: Vec<i64>,

    /// Drop and recreate the label tables first.
    #[arg(long)]
    pub replace: bool,
}
