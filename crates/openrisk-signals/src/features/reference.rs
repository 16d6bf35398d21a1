//! Dotted feature references.
//!
//! A reference names a (metric, feature) pair:
//! - `issue_response_time.p95` / `.avg` expand to the `p95_value` / `avg_value`
//!   sub-series of an object metric;
//! - `issue_response_time.p95_yoy` keeps the suffix as the feature name;
//! - `stars` (an exact metric name) is the metric's base `value`;
//! - `stars_yoy` strips the longest matching metric-name prefix plus `_`.

use openrisk_core::MetricId;
use rustc_hash::FxHashMap;

/// Sub-series aliases that expand to `<alias>_value`.
const SUB_SERIES_ALIASES: &[&str] = &["avg", "p95"];

/// Feature name of a metric's base series.
pub const BASE_FEATURE: &str = "value";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureRef {
    pub metric: String,
    pub feature: String,
}

impl FeatureRef {
    pub fn new(metric: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            feature: feature.into(),
        }
    }

    /// The same feature on another metric.
    pub fn with_metric(&self, metric: &str) -> Self {
        Self::new(metric, self.feature.clone())
    }

    /// The base `value` series of this reference's metric.
    pub fn base(&self) -> Self {
        Self::new(self.metric.clone(), BASE_FEATURE)
    }

    /// Key used in evidence documents: `metric` for the base series,
    /// `metric_feature` otherwise.
    pub fn evidence_key(&self) -> String {
        if self.feature == BASE_FEATURE {
            self.metric.clone()
        } else {
            format!("{}_{}", self.metric, self.feature)
        }
    }
}

/// Known metric names and their store ids.
#[derive(Debug, Clone, Default)]
pub struct MetricCatalog {
    ids: FxHashMap<String, MetricId>,
    /// Longest name first, so prefix stripping picks the most specific metric.
    by_length: Vec<String>,
}

impl MetricCatalog {
    pub fn new(metrics: impl IntoIterator<Item = (String, MetricId)>) -> Self {
        let ids: FxHashMap<String, MetricId> = metrics.into_iter().collect();
        let mut by_length: Vec<String> = ids.keys().cloned().collect();
        by_length.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { ids, by_length }
    }

    pub fn id(&self, metric: &str) -> Option<MetricId> {
        self.ids.get(metric).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolve a reference. Never fails loudly: an undotted reference that
    /// matches no metric is `None`, and a dotted one may name a metric that
    /// is not in the catalog (its lookups are simply absent).
    pub fn resolve(&self, reference: &str) -> Option<FeatureRef> {
        if let Some((metric, suffix)) = reference.split_once('.') {
            let feature = if SUB_SERIES_ALIASES.contains(&suffix) {
                format!("{suffix}_{BASE_FEATURE}")
            } else {
                suffix.to_string()
            };
            return Some(FeatureRef::new(metric, feature));
        }
        for name in &self.by_length {
            if reference == name {
                return Some(FeatureRef::new(name.clone(), BASE_FEATURE));
            }
            if let Some(rest) = reference
                .strip_prefix(name.as_str())
                .and_then(|r| r.strip_prefix('_'))
            {
                return Some(FeatureRef::new(name.clone(), rest));
            }
        }
        None
    }
}
