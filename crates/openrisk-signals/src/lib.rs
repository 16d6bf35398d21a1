//! # openrisk-signals
//!
//! Temporal signal detection over per-month feature series, and the weak
//! labels derived from the detected events.
//!
//! Data flows leaf-first: [`features`] resolves references against an
//! in-memory snapshot, [`conditions`] evaluates a signal's tree at one month,
//! [`window`] applies k-of-n consistency, [`scoring`] computes severity and
//! confidence, and [`materializer`] ties them together per (signal, repo).
//! [`labels`] scans the persisted events forward in time. [`pipeline`] runs
//! both passes against the store.

pub mod conditions;
pub mod features;
pub mod labels;
pub mod materializer;
pub mod ordering;
pub mod pipeline;
pub mod registry;
pub mod scoring;
pub mod window;

pub use features::{FeatureRef, FeatureStore, MetricCatalog};
pub use materializer::{MaterializeOutcome, Materializer, SignalEvent};
pub use ordering::EvaluationPlan;
pub use pipeline::{
    label_configs, run_label_configs, run_label_pass, run_signal_pass, run_signal_plan,
    LabelRunSummary, SignalRunSummary,
};
pub use registry::FiredRegistry;
