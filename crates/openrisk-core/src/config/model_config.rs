//! `model.yaml`: weak-label aggregation parameters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelConfig {
    pub task: TaskSpec,
    pub labels: LabelsSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TaskSpec {
    /// Default: 3.
    pub horizon_months: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LabelsSpec {
    pub include_signal_ids: Vec<String>,
    pub exclude_signal_ids: Vec<String>,
    pub aggregation: AggregationSpec,
    pub pu_weighting: PuWeightingSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AggregationSpec {
    /// Default: 100.0.
    pub score_cap: Option<f64>,
    /// Default: 0.5.
    pub binary_threshold: Option<f64>,
    /// Default: 0.25.
    pub duration_weight: Option<f64>,
    /// Default: 2.
    pub min_dimensions_for_positive: Option<usize>,
    /// Default: 200.
    pub evidence_cap: Option<usize>,
    pub score_to_soft: ScoreToSoftSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoreToSoftSpec {
    /// Default: 40.0.
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PuWeightingSpec {
    /// Default: 0.34.
    pub pos_min_confidence: Option<f64>,
    /// Default: 3.0.
    pub pos_weight: Option<f64>,
    /// Default: 0.5.
    pub unlabeled_weight: Option<f64>,
}

/// Validated label parameters for one horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelConfig {
    pub horizon_months: u32,
    pub include_signal_ids: BTreeSet<String>,
    pub exclude_signal_ids: BTreeSet<String>,
    pub score_cap: f64,
    pub soft_scale: f64,
    pub binary_threshold: f64,
    pub duration_weight: f64,
    pub min_dimensions_for_positive: usize,
    pub evidence_cap: usize,
    pub pos_min_confidence: f64,
    pub pos_weight: f64,
    pub unlabeled_weight: f64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            horizon_months: 3,
            include_signal_ids: BTreeSet::new(),
            exclude_signal_ids: BTreeSet::new(),
            score_cap: 100.0,
            soft_scale: 40.0,
            binary_threshold: 0.5,
            duration_weight: 0.25,
            min_dimensions_for_positive: 2,
            evidence_cap: 200,
            pos_min_confidence: 0.34,
            pos_weight: 3.0,
            unlabeled_weight: 0.5,
        }
    }
}

impl LabelConfig {
    /// Build the label parameters from `model.yaml`, using `task.horizon_months`.
    pub fn from_model(model: &ModelConfig) -> Result<Self, ConfigError> {
        Self::with_horizon(model, model.task.horizon_months)
    }

    /// Build the label parameters from `model.yaml` with an explicit horizon.
    /// `None` falls back to `task.horizon_months`, then to 3.
    pub fn with_horizon(model: &ModelConfig, horizon: Option<i64>) -> Result<Self, ConfigError> {
        let d = Self::default();
        let labels = &model.labels;
        let agg = &labels.aggregation;
        let pu = &labels.pu_weighting;

        let horizon = horizon.or(model.task.horizon_months).unwrap_or(3);
        if horizon < 1 {
            return Err(ConfigError::validation(
                "task.horizon_months",
                format!("must be at least 1, got {horizon}"),
            ));
        }
        let horizon_months = u32::try_from(horizon).map_err(|_| {
            ConfigError::invalid("task.horizon_months", format!("{horizon} is out of range"))
        })?;

        let cfg = Self {
            horizon_months,
            include_signal_ids: labels.include_signal_ids.iter().cloned().collect(),
            exclude_signal_ids: labels.exclude_signal_ids.iter().cloned().collect(),
            score_cap: agg.score_cap.unwrap_or(d.score_cap),
            soft_scale: agg.score_to_soft.scale.unwrap_or(d.soft_scale),
            binary_threshold: agg.binary_threshold.unwrap_or(d.binary_threshold),
            duration_weight: agg.duration_weight.unwrap_or(d.duration_weight),
            min_dimensions_for_positive: agg
                .min_dimensions_for_positive
                .unwrap_or(d.min_dimensions_for_positive),
            evidence_cap: agg.evidence_cap.unwrap_or(d.evidence_cap),
            pos_min_confidence: pu.pos_min_confidence.unwrap_or(d.pos_min_confidence),
            pos_weight: pu.pos_weight.unwrap_or(d.pos_weight),
            unlabeled_weight: pu.unlabeled_weight.unwrap_or(d.unlabeled_weight),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_positive(self.soft_scale) {
            return Err(ConfigError::validation(
                "labels.aggregation.score_to_soft.scale",
                "must be greater than 0",
            ));
        }
        if !is_positive(self.pos_weight) {
            return Err(ConfigError::validation(
                "labels.pu_weighting.pos_weight",
                "must be greater than 0",
            ));
        }
        if !is_positive(self.unlabeled_weight) {
            return Err(ConfigError::validation(
                "labels.pu_weighting.unlabeled_weight",
                "must be greater than 0",
            ));
        }
        if self.score_cap < 0.0 || self.score_cap.is_nan() {
            return Err(ConfigError::validation(
                "labels.aggregation.score_cap",
                "must not be negative",
            ));
        }
        Ok(())
    }

    /// Whether events of `signal_id` contribute to labels.
    pub fn includes_signal(&self, signal_id: &str) -> bool {
        if !self.include_signal_ids.is_empty() && !self.include_signal_ids.contains(signal_id) {
            return false;
        }
        !self.exclude_signal_ids.contains(signal_id)
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
