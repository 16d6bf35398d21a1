//! Self-describing evidence documents attached to every event.

use std::collections::BTreeMap;

use openrisk_core::config::SignalDefinition;
use openrisk_core::Month;
use serde_json::{json, Value};

/// Values a simple-signal evidence document records besides the definition.
#[derive(Debug)]
pub struct SimpleEvidence<'a> {
    pub repo: &'a str,
    pub metric: &'a str,
    pub months: &'a [Month],
    /// Per-feature values over `months`; `None` where absent.
    pub features: BTreeMap<String, Vec<Option<f64>>>,
    pub raw_ratio: f64,
    pub interp_ratio: f64,
    pub window_coverage: f64,
    pub forecast_uncertainty: f64,
    pub confidence_tier: &'a str,
    pub fallback_used: bool,
}

pub fn simple_evidence(signal: &SignalDefinition, e: &SimpleEvidence<'_>) -> Value {
    json!({
        "signal_id": signal.id,
        "signal_name": signal.name,
        "signal_severity": signal.severity,
        "signal_weight": signal.weight,
        "signal_window": signal.window,
        "signal_consistency": signal.consistency,
        "signal_confidence": signal.confidence,
        "signal_evidence_fields": signal.explain.evidence_fields,
        "repo": e.repo,
        "metric": e.metric,
        "dimension": signal.dimension,
        "months": e.months,
        "features": e.features,
        "raw_ratio": e.raw_ratio,
        "interp_ratio": e.interp_ratio,
        "window_coverage": e.window_coverage,
        "forecast_uncertainty_ratio": e.forecast_uncertainty,
        "confidence_tier": e.confidence_tier,
        "summary_template": signal.explain.summary_template,
        "fallback_used": e.fallback_used,
    })
}

/// Composite evidence lists, per referenced signal, the span months in which
/// it was active.
pub fn composite_evidence(
    signal: &SignalDefinition,
    repo: &str,
    months: &[Month],
    triggered: &BTreeMap<&str, Vec<Month>>,
) -> Value {
    json!({
        "signal_id": signal.id,
        "signal_name": signal.name,
        "signal_severity": signal.severity,
        "signal_weight": signal.weight,
        "signal_window": signal.window,
        "signal_consistency": signal.consistency,
        "repo": repo,
        "dimension": signal.dimension,
        "months": months,
        "triggered_signals": triggered,
        "summary_template": signal.explain.summary_template,
    })
}

/// Parse a stored evidence document. Unreadable payloads read as an empty
/// object.
pub fn parse_evidence(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            tracing::trace!("unreadable evidence document");
            Value::Object(Default::default())
        }
    }
}

/// The `dimension` tag of a stored evidence document, if readable.
pub fn evidence_dimension(text: &str) -> Option<String> {
    parse_evidence(text)
        .get("dimension")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_evidence_is_empty() {
        assert_eq!(parse_evidence("{not json"), json!({}));
        assert_eq!(parse_evidence("[1, 2]"), json!({}));
        assert_eq!(evidence_dimension("oops"), None);
        assert_eq!(evidence_dimension(r#"{"dimension": 3}"#), None);
        assert_eq!(
            evidence_dimension(r#"{"dimension": "community"}"#).as_deref(),
            Some("community")
        );
    }

    #[test]
    fn composite_document_shape() {
        let config = openrisk_core::config::SignalsConfig::from_yaml(
            r#"
signals:
  - id: combo
    dimension: maintainer
    conditions:
      composite:
        type: all_signals
        signals: [a, b]
"#,
        )
        .unwrap();
        let signal = config.get("combo").unwrap();
        let m = |s: &str| s.parse::<Month>().unwrap();
        let months = vec![m("2024-01"), m("2024-02"), m("2024-03")];
        let triggered: BTreeMap<&str, Vec<Month>> =
            [("a", vec![m("2024-02")]), ("b", vec![])].into_iter().collect();
        let doc = composite_evidence(signal, "acme/widget", &months, &triggered);
        assert_eq!(doc["repo"], "acme/widget");
        assert_eq!(doc["dimension"], "maintainer");
        assert_eq!(doc["months"], json!(["2024-01", "2024-02", "2024-03"]));
        assert_eq!(doc["triggered_signals"]["a"], json!(["2024-02"]));
        assert_eq!(doc["signal_consistency"]["k"], 1);
        assert!(doc.get("features").is_none());
    }
}
