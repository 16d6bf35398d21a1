//! Prerequisite gates checked before a signal is evaluated for a repository.

use openrisk_core::config::Requirements;

use crate::conditions::EvalContext;
use crate::registry::FiredRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateFailure {
    /// None of `any_of_metrics` has data.
    NoRequiredMetric,
    /// An entry of `all_of_metrics` has no data.
    MissingMetric(String),
    /// None of `triggered_signals_any` fired anywhere in history.
    NoAntecedentFired,
    /// An entry of `triggered_signals_all` never fired.
    AntecedentNotFired(String),
    /// An entry of `derived_features` has no data.
    MissingDerivedFeature(String),
}

impl std::fmt::Display for GateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRequiredMetric => f.write_str("no required metric present"),
            Self::MissingMetric(m) => write!(f, "required metric {m} missing"),
            Self::NoAntecedentFired => f.write_str("no antecedent signal fired"),
            Self::AntecedentNotFired(s) => write!(f, "antecedent signal {s} never fired"),
            Self::MissingDerivedFeature(x) => write!(f, "derived feature {x} missing"),
        }
    }
}

pub fn check_gates(
    requires: &Requirements,
    ctx: &EvalContext<'_>,
    registry: &FiredRegistry,
) -> Result<(), GateFailure> {
    let present = |reference: &str| {
        ctx.resolve(reference)
            .is_some_and(|f| ctx.store.has_feature(ctx.repo, &f))
    };

    if !requires.any_of_metrics.is_empty() && !requires.any_of_metrics.iter().any(|m| present(m.as_str())) {
        return Err(GateFailure::NoRequiredMetric);
    }
    if let Some(m) = requires.all_of_metrics.iter().find(|m| !present(m.as_str())) {
        return Err(GateFailure::MissingMetric(m.clone()));
    }
    if !requires.triggered_signals_any.is_empty()
        && !requires
            .triggered_signals_any
            .iter()
            .any(|s| registry.fired_anywhere(ctx.repo, s))
    {
        return Err(GateFailure::NoAntecedentFired);
    }
    if let Some(s) = requires
        .triggered_signals_all
        .iter()
        .find(|s| !registry.fired_anywhere(ctx.repo, s))
    {
        return Err(GateFailure::AntecedentNotFired(s.clone()));
    }
    if let Some(x) = requires.derived_features.iter().find(|x| !present(x.as_str())) {
        return Err(GateFailure::MissingDerivedFeature(x.clone()));
    }
    Ok(())
}
