//! Confidence & Severity Scorer.

use openrisk_core::config::ConfidenceTier;

/// Tier reported when no configured tier matches.
pub const DEFAULT_TIER: &str = "low";

/// Clamp to [0, 1]. NaN maps to 0.
pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// `min(100, tier_score * weight)`.
pub fn severity(tier_score: f64, weight: f64) -> f64 {
    (tier_score * weight).min(100.0)
}

/// Independent factors of an event's confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs {
    pub base: f64,
    /// Mean fraction of directly-measured points over the window.
    pub raw_ratio: f64,
    /// Fraction of window months with any data.
    pub window_coverage: f64,
    /// Non-negative; higher means less reliable.
    pub forecast_uncertainty: f64,
}

impl ConfidenceInputs {
    /// Composite signals have no feature window of their own: full reliability
    /// and coverage, no uncertainty.
    pub fn composite(base: f64) -> Self {
        Self {
            base,
            raw_ratio: 1.0,
            window_coverage: 1.0,
            forecast_uncertainty: 0.0,
        }
    }
}

/// `base * (0.4 + 0.6 raw) * (0.4 + 0.6 coverage) / (1 + uncertainty)`,
/// clamped to [0, 1].
pub fn confidence(inputs: ConfidenceInputs) -> f64 {
    let uncertainty = if inputs.forecast_uncertainty.is_nan() {
        0.0
    } else {
        inputs.forecast_uncertainty.max(0.0)
    };
    let penalty = 1.0 / (1.0 + uncertainty);
    clamp01(
        clamp01(inputs.base)
            * (0.4 + 0.6 * clamp01(inputs.raw_ratio))
            * (0.4 + 0.6 * clamp01(inputs.window_coverage))
            * penalty,
    )
}

/// First tier, in declared order, whose thresholds both hold.
pub fn confidence_tier(raw_ratio: f64, interp_ratio: f64, tiers: &[ConfidenceTier]) -> &str {
    tiers
        .iter()
        .find(|t| t.matches(raw_ratio, interp_ratio))
        .map_or(DEFAULT_TIER, |t| t.name.as_str())
}
