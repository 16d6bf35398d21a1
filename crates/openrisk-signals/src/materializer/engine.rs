//! Per (signal, repo) orchestration: gates, per-month evaluation, windowing,
//! scoring and evidence.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use openrisk_core::config::{
    CompareOp, CompositeCondition, MetricsConfig, SignalDefinition, SignalsConfig,
};
use openrisk_core::Month;
use openrisk_storage::queries::catalog::RepoRecord;

use super::evidence::{self, SimpleEvidence};
use super::gates::check_gates;
use super::{MaterializeOutcome, SignalEvent};
use crate::conditions::{evaluate, EvalContext, MetricSubstitution};
use crate::features::{FeatureRef, FeatureStore, TrendPeriod};
use crate::registry::FiredRegistry;
use crate::scoring::{self, ConfidenceInputs};
use crate::window::{candidate_ends, composite_flags, event_span};

static NEVER_FIRED: BTreeSet<Month> = BTreeSet::new();

/// Materializes events for one signal at a time against a loaded snapshot.
pub struct Materializer<'a> {
    config: &'a SignalsConfig,
    store: &'a FeatureStore,
    efficiency: Option<(&'a str, &'a str)>,
}

/// Primary series and resolved condition features of one simple evaluation.
struct SimplePlan<'a> {
    ctx: EvalContext<'a>,
    primary: FeatureRef,
    condition_features: Vec<FeatureRef>,
    fallback_used: bool,
}

impl<'a> Materializer<'a> {
    pub fn new(config: &'a SignalsConfig, store: &'a FeatureStore, metrics: &'a MetricsConfig) -> Self {
        Self {
            config,
            store,
            efficiency: metrics.efficiency.fallback_pair(),
        }
    }

    /// Evaluate one signal for one repository against the registry as it
    /// stands. Does not record anything.
    pub fn evaluate(
        &self,
        signal: &SignalDefinition,
        repo: &RepoRecord,
        registry: &FiredRegistry,
    ) -> MaterializeOutcome {
        let ctx = EvalContext::new(self.store, repo.id);
        if let Err(failure) = check_gates(&signal.requires, &ctx, registry) {
            tracing::trace!(signal = %signal.id, repo = %repo.full_name, %failure, "gated out");
            return MaterializeOutcome::GatedOut(failure);
        }

        let events = match signal.composite() {
            Some(composite) => self.evaluate_composite(signal, composite, repo, registry),
            None => self.evaluate_simple(signal, ctx, repo),
        };
        if events.is_empty() {
            MaterializeOutcome::NoCandidates
        } else {
            MaterializeOutcome::Emitting(events)
        }
    }

    /// Evaluate a signal for every repository and record the months of each
    /// emitted event in `registry`.
    pub fn evaluate_signal(
        &self,
        signal: &SignalDefinition,
        repos: &[RepoRecord],
        registry: &mut FiredRegistry,
    ) -> Vec<SignalEvent> {
        if !signal.is_composite() {
            match self.primary_feature(signal) {
                None => {
                    tracing::warn!(signal = %signal.id, "no condition feature names a metric; signal skipped");
                    return Vec::new();
                }
                Some(primary) if !self.primary_available(&primary) => {
                    tracing::warn!(
                        signal = %signal.id,
                        metric = %primary.metric,
                        "primary metric is not in the store; signal skipped"
                    );
                    return Vec::new();
                }
                Some(_) => {}
            }
            if signal.confidence.ratios_unconfigured() {
                tracing::debug!(
                    signal = %signal.id,
                    "no ratio features configured, confidence uses raw_ratio=0 interp_ratio=1"
                );
            }
        }

        let mut emitted = Vec::new();
        let mut gated = 0usize;
        for repo in repos {
            match self.evaluate(signal, repo, registry) {
                MaterializeOutcome::Emitting(events) => {
                    for event in &events {
                        registry.record(repo.id, &signal.id, event.months.iter().copied());
                    }
                    emitted.extend(events);
                }
                MaterializeOutcome::GatedOut(_) => gated += 1,
                MaterializeOutcome::NoCandidates => {}
            }
        }
        tracing::debug!(
            signal = %signal.id,
            events = emitted.len(),
            gated_repos = gated,
            "evaluated signal"
        );
        emitted
    }

    /// The first condition leaf whose reference names a metric. Its metric
    /// need not exist in the store.
    fn primary_feature(&self, signal: &SignalDefinition) -> Option<FeatureRef> {
        let catalog = self.store.catalog();
        signal
            .conditions
            .leaf_features()
            .into_iter()
            .find_map(|r| catalog.resolve(r))
    }

    /// The primary metric, or its efficiency fallback, is in the store.
    fn primary_available(&self, primary: &FeatureRef) -> bool {
        let catalog = self.store.catalog();
        catalog.id(&primary.metric).is_some()
            || matches!(self.efficiency, Some((from, to)) if primary.metric == from && catalog.id(to).is_some())
    }

    fn plan_simple(&self, signal: &SignalDefinition, ctx: EvalContext<'a>) -> Option<SimplePlan<'a>> {
        let catalog = self.store.catalog();
        let condition_features: Vec<FeatureRef> = signal
            .conditions
            .leaf_features()
            .into_iter()
            .filter_map(|r| catalog.resolve(r))
            .collect();
        let first = condition_features.first()?;

        let (ctx, fallback_used) = match self.efficiency {
            Some((from, to)) if first.metric == from && !self.store.has_feature(ctx.repo, first) => {
                (ctx.with_substitution(MetricSubstitution { from, to }), true)
            }
            _ => (ctx, false),
        };
        let condition_features: Vec<FeatureRef> = condition_features
            .into_iter()
            .map(|f| ctx.substitute(f))
            .collect();
        Some(SimplePlan {
            ctx,
            primary: condition_features[0].clone(),
            condition_features,
            fallback_used,
        })
    }

    fn evaluate_simple(
        &self,
        signal: &SignalDefinition,
        ctx: EvalContext<'a>,
        repo: &RepoRecord,
    ) -> Vec<SignalEvent> {
        let Some(plan) = self.plan_simple(signal, ctx) else {
            return Vec::new();
        };
        let Some(series) = self.store.series(repo.id, &plan.primary) else {
            return Vec::new();
        };
        let periods: Vec<Month> = series.keys().copied().collect();
        let flags: Vec<bool> = (0..periods.len())
            .map(|i| self.month_active(signal, &plan, &periods, i))
            .collect();

        let k = signal.consistency.k as usize;
        let n = signal.consistency.n as usize;
        candidate_ends(&flags, k, n)
            .into_iter()
            .filter_map(|end| event_span(end, k, n, signal.allow_partial_window))
            .map(|span| self.simple_event(signal, &plan, repo, &periods, span))
            .collect()
    }

    fn month_active(
        &self,
        signal: &SignalDefinition,
        plan: &SimplePlan<'_>,
        periods: &[Month],
        index: usize,
    ) -> bool {
        let month = periods[index];
        if signal.min_coverage.is_active() && !self.coverage_met(signal, plan, periods, index) {
            return false;
        }
        if !evaluate(&signal.conditions, &plan.ctx, month) {
            return false;
        }
        let checks = [
            (signal.require_quarter_alignment, TrendPeriod::Quarter),
            (signal.require_year_alignment, TrendPeriod::Year),
        ];
        checks
            .into_iter()
            .filter(|(required, _)| *required)
            .all(|(_, period)| self.trend_aligned(signal, plan, period, month))
    }

    /// Coverage over the trailing window (window months, clamped at the
    /// series start) ending at `index`.
    fn coverage_met(
        &self,
        signal: &SignalDefinition,
        plan: &SimplePlan<'_>,
        periods: &[Month],
        index: usize,
    ) -> bool {
        let window = &periods[(index + 1).saturating_sub(signal.window_months as usize)..=index];
        let total = window.len() as f64;
        let repo = plan.ctx.repo;
        let coverage = signal.min_coverage;

        if coverage.series > 0.0 {
            let base = plan.primary.base();
            let present = window
                .iter()
                .filter(|m| self.store.get(repo, &base, **m).is_some())
                .count();
            if (present as f64) / total < coverage.series {
                return false;
            }
        }
        if coverage.derived > 0.0 {
            let present = window
                .iter()
                .filter(|m| {
                    plan.condition_features
                        .iter()
                        .any(|f| self.store.get(repo, f, **m).is_some())
                })
                .count();
            if (present as f64) / total < coverage.derived {
                return false;
            }
        }
        true
    }

    /// The primary metric's trend at the enclosing period must point the way
    /// the first top-level comparison does. A tree without a leading
    /// comparison is not constrained.
    fn trend_aligned(
        &self,
        signal: &SignalDefinition,
        plan: &SimplePlan<'_>,
        period: TrendPeriod,
        month: Month,
    ) -> bool {
        let Some(op) = signal.conditions.alignment_op() else {
            return true;
        };
        let Some(trend) = self
            .store
            .trend(plan.ctx.repo, &plan.primary.metric, period, month)
        else {
            return false;
        };
        match op {
            CompareOp::Lt | CompareOp::Le => trend < 0.0,
            CompareOp::Gt | CompareOp::Ge => trend > 0.0,
            CompareOp::Eq => false,
        }
    }

    fn simple_event(
        &self,
        signal: &SignalDefinition,
        plan: &SimplePlan<'_>,
        repo: &RepoRecord,
        periods: &[Month],
        span: RangeInclusive<usize>,
    ) -> SignalEvent {
        let ctx = &plan.ctx;
        let (start, end) = (periods[*span.start()], periods[*span.end()]);
        let months = &periods[span];
        let mut features: BTreeMap<String, Vec<Option<f64>>> = plan
            .condition_features
            .iter()
            .map(|f| (f.evidence_key(), self.values(ctx, f, months)))
            .collect();

        let policy = &signal.confidence;
        let raw_ratio = self.ratio_mean(ctx, policy.raw_ratio_feature.as_deref(), months, &mut features);
        let interp_ratio =
            self.ratio_mean(ctx, policy.interp_ratio_feature.as_deref(), months, &mut features);
        let forecast_uncertainty = policy
            .forecast_uncertainty_feature
            .as_deref()
            .and_then(|r| ctx.resolve(r))
            .and_then(|f| mean_present(&self.values(ctx, &f, months)))
            .unwrap_or(0.0);

        let window_coverage = self.window_coverage(ctx, &plan.primary.metric, start, end);
        let raw = raw_ratio.unwrap_or(0.0);
        let interp = interp_ratio.unwrap_or(1.0);
        let tier = scoring::confidence_tier(raw, interp, &self.config.confidence_tiers);
        let confidence = scoring::confidence(ConfidenceInputs {
            base: policy.base_confidence,
            raw_ratio: raw,
            window_coverage,
            forecast_uncertainty,
        });

        let evidence = evidence::simple_evidence(
            signal,
            &SimpleEvidence {
                repo: &repo.full_name,
                metric: &plan.primary.metric,
                months,
                features,
                raw_ratio: raw,
                interp_ratio: interp,
                window_coverage,
                forecast_uncertainty,
                confidence_tier: tier,
                fallback_used: plan.fallback_used,
            },
        );

        SignalEvent {
            repo_id: repo.id,
            signal_id: signal.id.clone(),
            metric_id: self.store.catalog().id(&plan.primary.metric),
            start_month: start,
            end_month: end,
            months: months.to_vec(),
            confidence,
            severity: self.severity(signal),
            evidence,
        }
    }

    fn evaluate_composite(
        &self,
        signal: &SignalDefinition,
        composite: &CompositeCondition,
        repo: &RepoRecord,
        registry: &FiredRegistry,
    ) -> Vec<SignalEvent> {
        let referenced: Vec<&BTreeSet<Month>> = composite
            .signals
            .iter()
            .map(|id| registry.months(repo.id, id).unwrap_or(&NEVER_FIRED))
            .collect();
        let first = referenced.iter().filter_map(|m| m.first()).min();
        let last = referenced.iter().filter_map(|m| m.last()).max();
        let (Some(&first), Some(&last)) = (first, last) else {
            return Vec::new();
        };

        let periods = Month::sequence(first, last);
        let flags = composite_flags(&periods, &referenced, composite.combinator);
        let k = signal.consistency.k as usize;
        let n = signal.consistency.n as usize;
        let confidence = scoring::confidence(ConfidenceInputs::composite(signal.confidence.base_confidence));

        candidate_ends(&flags, k, n)
            .into_iter()
            .filter_map(|end| event_span(end, k, n, signal.allow_partial_window))
            .map(|span| {
                let (start, end) = (periods[*span.start()], periods[*span.end()]);
                let months = &periods[span];
                let triggered: BTreeMap<&str, Vec<Month>> = composite
                    .signals
                    .iter()
                    .zip(&referenced)
                    .map(|(id, fired)| {
                        let active = months.iter().copied().filter(|m| fired.contains(m)).collect();
                        (id.as_str(), active)
                    })
                    .collect();
                SignalEvent {
                    repo_id: repo.id,
                    signal_id: signal.id.clone(),
                    metric_id: None,
                    start_month: start,
                    end_month: end,
                    months: months.to_vec(),
                    confidence,
                    severity: self.severity(signal),
                    evidence: evidence::composite_evidence(signal, &repo.full_name, months, &triggered),
                }
            })
            .collect()
    }

    fn severity(&self, signal: &SignalDefinition) -> f64 {
        scoring::severity(self.config.severity_score(&signal.severity), signal.weight)
    }

    fn values(&self, ctx: &EvalContext<'_>, feature: &FeatureRef, months: &[Month]) -> Vec<Option<f64>> {
        months
            .iter()
            .map(|m| self.store.get(ctx.repo, feature, *m))
            .collect()
    }

    /// Mean of a configured ratio feature over the span. `None` when the
    /// reference is unconfigured or unresolvable; 0 when it has no values.
    fn ratio_mean(
        &self,
        ctx: &EvalContext<'_>,
        reference: Option<&str>,
        months: &[Month],
        features: &mut BTreeMap<String, Vec<Option<f64>>>,
    ) -> Option<f64> {
        let reference = reference?;
        let feature = ctx.resolve(reference)?;
        let values = self.values(ctx, &feature, months);
        let mean = mean_present(&values).unwrap_or(0.0);
        features.insert(reference.to_string(), values);
        Some(mean)
    }

    /// Fraction of calendar months in `start..=end` with any data for the
    /// metric.
    fn window_coverage(&self, ctx: &EvalContext<'_>, metric: &str, start: Month, end: Month) -> f64 {
        let calendar = Month::sequence(start, end);
        if calendar.is_empty() {
            return 0.0;
        }
        let covered = calendar
            .iter()
            .filter(|m| self.store.has_data(ctx.repo, metric, **m))
            .count();
        covered as f64 / calendar.len() as f64
    }
}

fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use openrisk_core::config::EfficiencyConfig;

    use super::*;
    use crate::features::MetricCatalog;

    fn m(s: &str) -> Month {
        s.parse().unwrap()
    }

    fn repo() -> RepoRecord {
        RepoRecord {
            id: 1,
            full_name: "acme/widget".into(),
        }
    }

    /// Three months of declining stars; `stars` is the only known metric.
    fn store() -> FeatureStore {
        let mut store = FeatureStore::new(MetricCatalog::new([("stars".to_string(), 1)]));
        for month in ["2024-01", "2024-02", "2024-03"] {
            store.insert_value(1, 1, "value", m(month), 5.0);
            store.insert_value(1, 1, "yoy", m(month), -0.4);
        }
        store
    }

    /// `any` of `first_leaf < 0` and `stars_yoy < 0`, k=2 of n=3.
    fn config(first_leaf: &str) -> SignalsConfig {
        SignalsConfig::from_yaml(&format!(
            r#"
signals:
  - id: decline
    consistency: {{ k: 2, n: 3 }}
    conditions:
      any:
        - {{ feature: "{first_leaf}", op: "<" }}
        - {{ feature: stars_yoy, op: "<" }}
"#
        ))
        .unwrap()
    }

    fn run(config: &SignalsConfig, metrics: &MetricsConfig) -> Vec<SignalEvent> {
        let store = store();
        let materializer = Materializer::new(config, &store, metrics);
        materializer.evaluate_signal(&config.signals[0], &[repo()], &mut FiredRegistry::new())
    }

    #[test]
    fn first_clause_on_a_metric_missing_from_the_store_skips_the_signal() {
        let cfg = config("forks.p95");
        assert!(run(&cfg, &MetricsConfig::default()).is_empty());

        let store = store();
        let metrics = MetricsConfig::default();
        let outcome = Materializer::new(&cfg, &store, &metrics).evaluate(
            &cfg.signals[0],
            &repo(),
            &FiredRegistry::new(),
        );
        assert_eq!(outcome, MaterializeOutcome::NoCandidates);
    }

    #[test]
    fn first_clause_naming_no_metric_is_passed_over() {
        let events = run(&config("mystery_yoy"), &MetricsConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_month, m("2024-01"));
        assert_eq!(events[0].end_month, m("2024-03"));
        assert_eq!(events[0].metric_id, Some(1));
        assert_eq!(events[0].evidence["metric"], "stars");
    }

    #[test]
    fn fallback_rescues_a_primary_metric_missing_from_the_store() {
        let metrics = MetricsConfig {
            efficiency: EfficiencyConfig {
                primary_metric: Some("forks".into()),
                fallback_metric: Some("stars".into()),
            },
        };
        let events = run(&config("forks.yoy"), &metrics);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].evidence["metric"], "stars");
        assert_eq!(events[0].evidence["fallback_used"], true);
    }
}
