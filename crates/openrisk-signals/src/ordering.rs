//! Two-phase evaluation plan.
//!
//! Phase 1 holds every enabled non-composite signal, phase 2 every enabled
//! composite. Within a phase signals are topologically sorted (Kahn) by their
//! antecedents so "fired anywhere in history" gates and composite lookups see
//! a fully populated registry regardless of declaration order.

use std::collections::VecDeque;

use openrisk_core::config::{SignalDefinition, SignalsConfig};
use openrisk_core::errors::ConfigError;
use rustc_hash::FxHashMap;

#[derive(Debug)]
pub struct EvaluationPlan<'a> {
    pub simple: Vec<&'a SignalDefinition>,
    pub composite: Vec<&'a SignalDefinition>,
}

impl<'a> EvaluationPlan<'a> {
    pub fn build(config: &'a SignalsConfig) -> Result<Self, ConfigError> {
        let enabled: Vec<&SignalDefinition> = config.enabled().collect();
        let by_id: FxHashMap<&str, &SignalDefinition> =
            enabled.iter().map(|s| (s.id.as_str(), *s)).collect();

        for signal in &enabled {
            for dep in signal.antecedents() {
                match by_id.get(dep) {
                    None => tracing::warn!(
                        signal = %signal.id,
                        antecedent = dep,
                        "antecedent is unknown or disabled and never fires"
                    ),
                    Some(target) if target.is_composite() && !signal.is_composite() => {
                        return Err(ConfigError::ValidationFailed {
                            field: format!("signals.{}.requires", signal.id),
                            message: format!(
                                "non-composite signal cannot depend on composite signal '{dep}'"
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        let (composite, simple): (Vec<_>, Vec<_>) =
            enabled.into_iter().partition(|s| s.is_composite());
        Ok(Self {
            simple: topological_sort(simple)?,
            composite: topological_sort(composite)?,
        })
    }

    pub fn len(&self) -> usize {
        self.simple.len() + self.composite.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kahn's algorithm over one phase. Antecedents outside the phase impose no
/// edge. Ties keep declaration order.
fn topological_sort(signals: Vec<&SignalDefinition>) -> Result<Vec<&SignalDefinition>, ConfigError> {
    let index: FxHashMap<&str, usize> = signals
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; signals.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); signals.len()];
    for (i, signal) in signals.iter().enumerate() {
        for dep in signal.antecedents() {
            if let Some(&j) = index.get(dep) {
                dependents[j].push(i);
                in_degree[i] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..signals.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(signals.len());
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &next in &dependents[node] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != signals.len() {
        let cycle: Vec<&str> = (0..signals.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| signals[i].id.as_str())
            .collect();
        return Err(ConfigError::ValidationFailed {
            field: "signals".to_string(),
            message: format!("circular signal dependency among: {}", cycle.join(", ")),
        });
    }

    Ok(order.into_iter().map(|i| signals[i]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&SignalDefinition]) -> Vec<String> {
        list.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn antecedents_run_first() {
        let cfg = SignalsConfig::from_yaml(
            r#"
signals:
  - id: late
    requires: { triggered_signals_any: [early] }
    conditions: { feature: x, op: ">" }
  - id: combo
    conditions: { composite: { signals: [late, early] } }
  - id: early
    conditions: { feature: y, op: ">" }
  - id: off
    enabled: false
    conditions: { feature: z, op: ">" }
"#,
        )
        .unwrap();
        let plan = EvaluationPlan::build(&cfg).unwrap();
        assert_eq!(ids(&plan.simple), vec!["early", "late"]);
        assert_eq!(ids(&plan.composite), vec!["combo"]);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn composites_may_reference_composites() {
        let cfg = SignalsConfig::from_yaml(
            r#"
signals:
  - id: outer
    conditions: { composite: { signals: [inner] } }
  - id: inner
    conditions: { composite: { signals: [a] } }
  - id: a
    conditions: { feature: x, op: ">" }
"#,
        )
        .unwrap();
        let plan = EvaluationPlan::build(&cfg).unwrap();
        assert_eq!(ids(&plan.composite), vec!["inner", "outer"]);
    }

    #[test]
    fn cycles_are_rejected() {
        let cfg = SignalsConfig::from_yaml(
            r#"
signals:
  - id: a
    requires: { triggered_signals_all: [b] }
    conditions: { feature: x, op: ">" }
  - id: b
    requires: { triggered_signals_any: [a] }
    conditions: { feature: y, op: ">" }
  - id: c
    conditions: { feature: z, op: ">" }
"#,
        )
        .unwrap();
        let err = EvaluationPlan::build(&cfg).unwrap_err();
        let ConfigError::ValidationFailed { message, .. } = err else {
            panic!("expected validation failure");
        };
        assert!(message.contains("a, b"), "{message}");
    }

    #[test]
    fn simple_cannot_depend_on_composite() {
        let cfg = SignalsConfig::from_yaml(
            r#"
signals:
  - id: a
    conditions: { feature: x, op: ">" }
  - id: combo
    conditions: { composite: { signals: [a] } }
  - id: b
    requires: { triggered_signals_any: [combo] }
    conditions: { feature: y, op: ">" }
"#,
        )
        .unwrap();
        assert!(EvaluationPlan::build(&cfg).is_err());
    }
}
