//! Loads the feature snapshot a signal run needs, up front.

use std::collections::BTreeSet;

use openrisk_core::config::{MetricsConfig, SignalsConfig};
use openrisk_core::errors::StorageError;
use openrisk_core::Month;
use openrisk_storage::queries::{catalog, features, time_series};
use rusqlite::Connection;

use super::reference::{FeatureRef, MetricCatalog};
use super::store::{FeatureStore, TrendPeriod};

/// Every (metric, feature) pair any configured signal can read.
///
/// Condition features bring their metric's base series along (coverage and
/// evidence read it), and the efficiency fallback metric is mirrored for
/// every pair on the primary metric.
pub fn needed_features(
    signals: &SignalsConfig,
    metrics: &MetricsConfig,
    catalog: &MetricCatalog,
) -> BTreeSet<FeatureRef> {
    let mut needed = BTreeSet::new();
    for signal in &signals.signals {
        for reference in signal.conditions.referenced_features() {
            if let Some(f) = catalog.resolve(reference) {
                needed.insert(f.base());
                needed.insert(f);
            }
        }
        let conf = &signal.confidence;
        let req = &signal.requires;
        let extra = [
            &conf.raw_ratio_feature,
            &conf.interp_ratio_feature,
            &conf.forecast_uncertainty_feature,
        ]
        .into_iter()
        .flatten()
        .chain(&req.any_of_metrics)
        .chain(&req.all_of_metrics)
        .chain(&req.derived_features);
        needed.extend(extra.filter_map(|r| catalog.resolve(r)));
    }

    if let Some((primary, fallback)) = metrics.efficiency.fallback_pair() {
        let mirrored: Vec<FeatureRef> = needed
            .iter()
            .filter(|f| f.metric == primary)
            .flat_map(|f| [f.with_metric(fallback), f.with_metric(fallback).base()])
            .collect();
        needed.extend(mirrored);
    }
    needed
}

/// Build the in-memory feature snapshot for a signal run.
///
/// Rows whose period does not parse as a month are skipped; they are data
/// gaps, not errors.
pub fn load_feature_store(
    conn: &Connection,
    signals: &SignalsConfig,
    metrics: &MetricsConfig,
) -> Result<FeatureStore, StorageError> {
    let metric_rows = catalog::load_metrics(conn)?;
    let metric_catalog = MetricCatalog::new(metric_rows.into_iter().map(|m| (m.name, m.id)));
    let needed = needed_features(signals, metrics, &metric_catalog);

    let mut store = FeatureStore::new(metric_catalog.clone());
    let mut skipped = 0usize;
    let mut metric_ids = BTreeSet::new();

    for feature in &needed {
        let Some(metric_id) = metric_catalog.id(&feature.metric) else {
            tracing::trace!(metric = %feature.metric, "feature references unknown metric");
            continue;
        };
        metric_ids.insert(metric_id);
        for row in features::load_monthly_feature(conn, metric_id, &feature.feature)? {
            match row.period.parse::<Month>() {
                Ok(month) => store.insert_value(row.repo_id, metric_id, &feature.feature, month, row.value),
                Err(_) => skipped += 1,
            }
        }
    }

    for metric_id in &metric_ids {
        for (repo_id, period) in time_series::load_monthly_periods(conn, *metric_id)? {
            match period.parse::<Month>() {
                Ok(month) => store.insert_point(repo_id, *metric_id, month),
                Err(_) => skipped += 1,
            }
        }
    }

    for period in [TrendPeriod::Quarter, TrendPeriod::Year] {
        for row in features::load_trend_features(conn, period.period_type())? {
            store.insert_trend(row.repo_id, row.metric_id, period, &row.period, row.value);
        }
    }

    tracing::info!(
        features = needed.len(),
        series = store.series_count(),
        skipped_rows = skipped,
        "loaded feature snapshot"
    );
    Ok(store)
}
