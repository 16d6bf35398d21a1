//! `metrics.yaml`: only the efficiency fallback pair is consumed here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    pub efficiency: EfficiencyConfig,
}

/// When a signal's primary metric is `primary_metric` and a repository has
/// no data for it, `fallback_metric` is evaluated instead.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EfficiencyConfig {
    pub primary_metric: Option<String>,
    pub fallback_metric: Option<String>,
}

impl EfficiencyConfig {
    /// The `(primary, fallback)` pair when both are configured.
    pub fn fallback_pair(&self) -> Option<(&str, &str)> {
        match (&self.primary_metric, &self.fallback_metric) {
            (Some(p), Some(f)) if !p.is_empty() && !f.is_empty() => Some((p, f)),
            _ => None,
        }
    }
}
