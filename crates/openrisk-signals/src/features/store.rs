//! In-memory snapshot of the feature table.
//!
//! Loaded once per run and read-only afterwards. Absence is first-class:
//! every lookup returns `Option`, never a zero.

use std::collections::{BTreeMap, BTreeSet};

use openrisk_core::{MetricId, Month, RepoId};
use rustc_hash::FxHashMap;

use super::reference::{FeatureRef, MetricCatalog};

/// Coarse period of a `trend_dir` feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendPeriod {
    Quarter,
    Year,
}

impl TrendPeriod {
    pub fn period_type(self) -> &'static str {
        match self {
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    /// Label of the period enclosing `month` (`2024Q2`, `2024`).
    pub fn label(self, month: Month) -> String {
        match self {
            Self::Quarter => month.quarter_label(),
            Self::Year => month.year_label(),
        }
    }
}

pub type Series = BTreeMap<Month, f64>;

#[derive(Debug, Default)]
pub struct FeatureStore {
    catalog: MetricCatalog,
    series: FxHashMap<(RepoId, MetricId), FxHashMap<String, Series>>,
    points: FxHashMap<(RepoId, MetricId), BTreeSet<Month>>,
    trends: FxHashMap<(RepoId, MetricId, TrendPeriod, String), f64>,
}

impl FeatureStore {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn insert_value(
        &mut self,
        repo: RepoId,
        metric: MetricId,
        feature: &str,
        month: Month,
        value: f64,
    ) {
        self.series
            .entry((repo, metric))
            .or_default()
            .entry(feature.to_string())
            .or_default()
            .insert(month, value);
    }

    /// Record a regular monthly point of the raw value table.
    pub fn insert_point(&mut self, repo: RepoId, metric: MetricId, month: Month) {
        self.points.entry((repo, metric)).or_default().insert(month);
    }

    pub fn insert_trend(
        &mut self,
        repo: RepoId,
        metric: MetricId,
        period: TrendPeriod,
        label: &str,
        value: f64,
    ) {
        self.trends
            .insert((repo, metric, period, label.to_string()), value);
    }

    pub fn series(&self, repo: RepoId, feature: &FeatureRef) -> Option<&Series> {
        let metric = self.catalog.id(&feature.metric)?;
        self.series.get(&(repo, metric))?.get(feature.feature.as_str())
    }

    pub fn get(&self, repo: RepoId, feature: &FeatureRef, month: Month) -> Option<f64> {
        self.series(repo, feature)?.get(&month).copied()
    }

    /// True when the repository has at least one value for the feature.
    pub fn has_feature(&self, repo: RepoId, feature: &FeatureRef) -> bool {
        self.series(repo, feature).is_some_and(|s| !s.is_empty())
    }

    /// True when the month has any data for the metric: a regular point in
    /// the raw value table or a base `value` feature.
    pub fn has_data(&self, repo: RepoId, metric: &str, month: Month) -> bool {
        let Some(metric_id) = self.catalog.id(metric) else {
            return false;
        };
        if self
            .points
            .get(&(repo, metric_id))
            .is_some_and(|p| p.contains(&month))
        {
            return true;
        }
        self.get(repo, &FeatureRef::new(metric, super::reference::BASE_FEATURE), month)
            .is_some()
    }

    pub fn trend(&self, repo: RepoId, metric: &str, period: TrendPeriod, month: Month) -> Option<f64> {
        let metric_id = self.catalog.id(metric)?;
        self.trends
            .get(&(repo, metric_id, period, period.label(month)))
            .copied()
    }

    /// Number of loaded (repo, metric, feature) series.
    pub fn series_count(&self) -> usize {
        self.series.values().map(FxHashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Month {
        s.parse().unwrap()
    }

    fn store() -> FeatureStore {
        let mut store = FeatureStore::new(MetricCatalog::new([("stars".to_string(), 1)]));
        store.insert_value(7, 1, "value", m("2024-01"), 10.0);
        store.insert_value(7, 1, "yoy", m("2024-02"), 0.5);
        store.insert_point(7, 1, m("2024-03"));
        store.insert_trend(7, 1, TrendPeriod::Quarter, "2024Q1", -1.0);
        store
    }

    #[test]
    fn lookups_are_absent_not_zero() {
        let s = store();
        let yoy = FeatureRef::new("stars", "yoy");
        assert_eq!(s.get(7, &yoy, m("2024-02")), Some(0.5));
        assert_eq!(s.get(7, &yoy, m("2024-01")), None);
        assert_eq!(s.get(8, &yoy, m("2024-02")), None);
        assert_eq!(s.get(7, &FeatureRef::new("forks", "yoy"), m("2024-02")), None);
        assert!(s.has_feature(7, &yoy));
        assert!(!s.has_feature(7, &FeatureRef::new("stars", "zscore")));
    }

    #[test]
    fn data_presence_counts_points_and_base_values() {
        let s = store();
        assert!(s.has_data(7, "stars", m("2024-01")));
        assert!(s.has_data(7, "stars", m("2024-03")));
        assert!(!s.has_data(7, "stars", m("2024-02")));
        assert!(!s.has_data(7, "forks", m("2024-01")));
    }

    #[test]
    fn trends_are_keyed_per_repo() {
        let s = store();
        assert_eq!(s.trend(7, "stars", TrendPeriod::Quarter, m("2024-03")), Some(-1.0));
        assert_eq!(s.trend(8, "stars", TrendPeriod::Quarter, m("2024-03")), None);
        assert_eq!(s.trend(7, "stars", TrendPeriod::Quarter, m("2024-04")), None);
    }
}
