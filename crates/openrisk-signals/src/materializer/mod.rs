//! Signal Event Materializer.
//!
//! Per (signal, repo) the evaluation moves through:
//! `gated-out` (a prerequisite gate failed), or `evaluating` which ends in
//! `no-candidates` or `emitting` one event per candidate end.

pub mod engine;
pub mod evidence;
pub mod gates;

use openrisk_core::{MetricId, Month, RepoId};
use openrisk_storage::queries::signal_events::SignalEventRecord;

pub use engine::Materializer;
pub use gates::GateFailure;

/// One detected event. `end_month >= start_month`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub repo_id: RepoId,
    pub signal_id: String,
    /// `None` for composite signals.
    pub metric_id: Option<MetricId>,
    pub start_month: Month,
    pub end_month: Month,
    /// Months the event covers, in order. Recorded in the fired registry.
    pub months: Vec<Month>,
    pub confidence: f64,
    pub severity: f64,
    pub evidence: serde_json::Value,
}

impl SignalEvent {
    /// Inclusive span length in months, at least 1.
    pub fn duration(&self) -> i64 {
        (self.start_month.months_until(self.end_month) + 1).max(1)
    }

    pub fn to_record(&self) -> SignalEventRecord {
        SignalEventRecord {
            repo_id: self.repo_id,
            signal_id: self.signal_id.clone(),
            metric_id: self.metric_id,
            start_month: self.start_month,
            end_month: self.end_month,
            confidence: self.confidence,
            severity: self.severity,
            evidence: self.evidence.to_string(),
        }
    }
}

/// Terminal state of one (signal, repo) evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterializeOutcome {
    GatedOut(GateFailure),
    NoCandidates,
    Emitting(Vec<SignalEvent>),
}
