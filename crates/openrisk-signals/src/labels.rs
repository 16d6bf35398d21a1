//! Weak-Label Aggregator.
//!
//! For each observed month `t` of a repository, the events whose end month
//! falls in `(t, t + H]` (and inside the observed history) are folded into a
//! capped risk score, a saturating soft score, a thresholded binary label,
//! and a positive/unlabeled sample weight.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use openrisk_core::config::LabelConfig;
use openrisk_core::Month;
use openrisk_storage::queries::catalog::RepoRecord;
use openrisk_storage::queries::signal_events::SignalEventRecord;
use openrisk_storage::queries::weak_labels::WeakLabelRecord;
use serde_json::json;

use crate::materializer::evidence::evidence_dimension;
use crate::scoring::clamp01;

/// `1 - exp(-score / scale)`, clamped to [0, 1]. Zero when `scale <= 0`.
pub fn soft_from_score(score: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return 0.0;
    }
    clamp01(1.0 - (-score.max(0.0) / scale).exp())
}

/// Score contributed by one event.
pub fn event_contribution(severity: f64, confidence: f64, duration: i64, duration_weight: f64) -> f64 {
    let duration = duration.max(1) as f64;
    severity * (0.5 + 0.5 * confidence) * (1.0 + duration_weight * (duration - 1.0))
}

/// Positive weight only for confident, multi-dimensional positives.
pub fn sample_weight(binary: bool, mean_confidence: f64, dimensions: usize, config: &LabelConfig) -> f64 {
    if binary
        && mean_confidence >= config.pos_min_confidence
        && dimensions >= config.min_dimensions_for_positive
    {
        config.pos_weight
    } else {
        config.unlabeled_weight
    }
}

/// A persisted event prepared for aggregation.
#[derive(Debug)]
struct LabelEvent<'a> {
    record: &'a SignalEventRecord,
    duration: i64,
    dimension: Option<String>,
}

/// Build one label per observed month of a repository.
///
/// `months` is the repository's observed history in order; `events` are its
/// persisted signal events.
pub fn aggregate_repo(
    repo: &RepoRecord,
    months: &[Month],
    events: &[SignalEventRecord],
    config: &LabelConfig,
    created_at: &str,
) -> Vec<WeakLabelRecord> {
    let Some(&last_observed) = months.last() else {
        return Vec::new();
    };
    let observed: BTreeSet<Month> = months.iter().copied().collect();

    let mut by_end: BTreeMap<Month, Vec<LabelEvent<'_>>> = BTreeMap::new();
    for record in events.iter().filter(|e| config.includes_signal(&e.signal_id)) {
        by_end.entry(record.end_month).or_default().push(LabelEvent {
            record,
            duration: (record.start_month.months_until(record.end_month) + 1).max(1),
            dimension: evidence_dimension(&record.evidence).filter(|d| !d.is_empty()),
        });
    }

    let horizon = i64::from(config.horizon_months);
    months
        .iter()
        .map(|&as_of| {
            let window_end = as_of.offset(horizon).min(last_observed);
            let contributing: Vec<&LabelEvent<'_>> = if window_end > as_of {
                by_end
                    .range((Bound::Excluded(as_of), Bound::Included(window_end)))
                    .filter(|(end, _)| observed.contains(end))
                    .flat_map(|(_, evs)| evs)
                    .collect()
            } else {
                Vec::new()
            };
            label_for_month(repo, as_of, &contributing, config, created_at)
        })
        .collect()
}

fn label_for_month(
    repo: &RepoRecord,
    as_of: Month,
    contributing: &[&LabelEvent<'_>],
    config: &LabelConfig,
    created_at: &str,
) -> WeakLabelRecord {
    let raw_score: f64 = contributing
        .iter()
        .map(|e| {
            event_contribution(
                e.record.severity,
                e.record.confidence,
                e.duration,
                config.duration_weight,
            )
        })
        .sum();
    let score = raw_score.min(config.score_cap);
    let soft = soft_from_score(score, config.soft_scale);
    let binary = soft >= config.binary_threshold;
    let mean_confidence = if contributing.is_empty() {
        0.0
    } else {
        contributing.iter().map(|e| e.record.confidence).sum::<f64>() / contributing.len() as f64
    };
    let dimensions: BTreeSet<&str> = contributing
        .iter()
        .filter_map(|e| e.dimension.as_deref())
        .collect();
    let weight = sample_weight(binary, mean_confidence, dimensions.len(), config);

    let summaries: Vec<_> = contributing
        .iter()
        .take(config.evidence_cap)
        .map(|e| {
            json!({
                "signal_id": e.record.signal_id,
                "start_month": e.record.start_month,
                "end_month": e.record.end_month,
                "duration_months": e.duration,
                "severity": e.record.severity,
                "confidence": e.record.confidence,
            })
        })
        .collect();
    let evidence = json!({
        "repo": repo.full_name,
        "as_of_month": as_of,
        "horizon_months": config.horizon_months,
        "risk_score": score,
        "risk_soft": soft,
        "risk_binary": u8::from(binary),
        "events_count": contributing.len(),
        "mean_event_confidence": mean_confidence,
        "dimensions_triggered": dimensions,
        "events": summaries,
    });

    WeakLabelRecord {
        repo_id: repo.id,
        as_of_month: as_of,
        horizon_months: config.horizon_months,
        risk_score: score,
        risk_soft: soft,
        risk_binary: binary,
        sample_weight: weight,
        events_count: contributing.len() as i64,
        mean_event_confidence: mean_confidence,
        evidence_json: evidence.to_string(),
        created_at: created_at.to_string(),
    }
}
