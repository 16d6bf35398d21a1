//! `signals.yaml`: windows, scoring, confidence tiers, and signal definitions.
//!
//! The document is deserialized loosely (`SignalsDocument`) and then
//! validated into `SignalsConfig`, whose definitions carry effective values
//! only. Condition trees are parsed into [`ConditionNode`] here so that a
//! malformed tree fails the run before the store is touched.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::loader::{load_document, parse_document};
use crate::errors::ConfigError;

const DEFAULT_WINDOW: &str = "win3";
const DEFAULT_WINDOW_MONTHS: u32 = 3;
const DEFAULT_SEVERITY: &str = "info";
const DEFAULT_DIMENSION: &str = "unknown";

// ---------------------------------------------------------------------------
// Raw document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SignalsDocument {
    pub windows: BTreeMap<String, WindowSpec>,
    pub scoring: ScoringSpec,
    pub schema: SchemaSpec,
    pub signals: Vec<SignalSpec>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WindowSpec {
    /// Default: 3.
    pub months: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ScoringSpec {
    pub severity_levels: BTreeMap<String, SeverityLevel>,
    /// Default: 1.0.
    pub default_weight: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SeverityLevel {
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SchemaSpec {
    pub confidence_policy: ConfidencePolicySpec,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConfidencePolicySpec {
    /// Tier name to thresholds, in declared order.
    #[serde(deserialize_with = "ordered_tiers")]
    pub confidence_tiers: Vec<ConfidenceTier>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SignalSpec {
    pub id: String,
    pub name: Option<String>,
    pub dimension: Option<String>,
    pub severity: Option<String>,
    pub weight: Option<f64>,
    pub enabled: Option<bool>,
    pub window: Option<String>,
    pub allow_partial_window: bool,
    pub requires: Requirements,
    pub conditions: Option<Value>,
    pub consistency: ConsistencySpec,
    pub confidence: ConfidenceSpec,
    pub min_coverage: MinCoverage,
    pub explain: Explain,
    pub require_quarter_alignment: bool,
    pub require_year_alignment: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConsistencySpec {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub k: Option<i64>,
    pub n: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConfidenceSpec {
    pub raw_ratio_feature: Option<String>,
    pub interp_ratio_feature: Option<String>,
    pub forecast_uncertainty_feature: Option<String>,
    pub base_confidence: Option<f64>,
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Prerequisite gates checked per (signal, repo) before evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Requirements {
    pub any_of_metrics: Vec<String>,
    pub all_of_metrics: Vec<String>,
    pub triggered_signals_any: Vec<String>,
    pub triggered_signals_all: Vec<String>,
    pub derived_features: Vec<String>,
}

/// Trailing-window coverage floors. A threshold of 0 disables the check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MinCoverage {
    pub series: f64,
    pub derived: f64,
}

impl MinCoverage {
    pub fn is_active(&self) -> bool {
        self.series > 0.0 || self.derived > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Explain {
    pub summary_template: Option<String>,
    pub evidence_fields: Option<Vec<String>>,
}

/// A named confidence tier. Tiers are tried in declared order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceTier {
    pub name: String,
    pub min_raw_ratio: f64,
    pub max_interp_ratio: f64,
}

impl ConfidenceTier {
    pub fn matches(&self, raw_ratio: f64, interp_ratio: f64) -> bool {
        raw_ratio >= self.min_raw_ratio && interp_ratio <= self.max_interp_ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyKind {
    KOfN,
    OnceInWindow,
}

/// Effective k-of-n policy, `1 <= k <= n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsistencyPolicy {
    #[serde(rename = "type")]
    pub kind: ConsistencyKind,
    pub k: u32,
    pub n: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidencePolicy {
    pub raw_ratio_feature: Option<String>,
    pub interp_ratio_feature: Option<String>,
    pub forecast_uncertainty_feature: Option<String>,
    pub base_confidence: f64,
}

impl ConfidencePolicy {
    /// True when neither ratio feature is configured.
    pub fn ratios_unconfigured(&self) -> bool {
        self.raw_ratio_feature.is_none() && self.interp_ratio_feature.is_none()
    }
}

/// Comparison operator of a condition leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl CompareOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "==" => Some(Self::Eq),
            _ => None,
        }
    }

    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Eq => left == right,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `feature <op> literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub feature: String,
    pub op: CompareOp,
    pub value: f64,
}

/// `feature <op> feature_ref`, both read at the same month.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureComparison {
    pub feature: String,
    pub op: CompareOp,
    pub feature_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeCombinator {
    /// At least `m` referenced signals active in the same month.
    MOfN { m: usize },
    /// Every referenced signal active in the same month.
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCondition {
    pub signals: Vec<String>,
    pub combinator: CompositeCombinator,
}

/// Boolean expression tree of a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Leaf(Comparison),
    FeatureLeaf(FeatureComparison),
    All(Vec<ConditionNode>),
    Any(Vec<ConditionNode>),
    /// Only valid as the root of a signal's tree.
    Composite(CompositeCondition),
}

impl ConditionNode {
    pub fn as_composite(&self) -> Option<&CompositeCondition> {
        match self {
            Self::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// The left-hand feature of every leaf, depth-first in declared order.
    pub fn leaf_features(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk_leaves(&mut |feature, _| out.push(feature));
        out
    }

    /// Every feature reference in the tree, including `feature_ref` operands.
    pub fn referenced_features(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk_leaves(&mut |feature, feature_ref| {
            out.push(feature);
            if let Some(r) = feature_ref {
                out.push(r);
            }
        });
        out
    }

    fn walk_leaves<'a>(&'a self, visit: &mut impl FnMut(&'a str, Option<&'a str>)) {
        match self {
            Self::Leaf(c) => visit(c.feature.as_str(), None),
            Self::FeatureLeaf(c) => visit(c.feature.as_str(), Some(c.feature_ref.as_str())),
            Self::All(children) | Self::Any(children) => {
                for child in children {
                    child.walk_leaves(visit);
                }
            }
            Self::Composite(_) => {}
        }
    }

    /// Operator that decides trend alignment: the first child of a top-level
    /// group when it is a leaf, or the root itself when it is a leaf.
    pub fn alignment_op(&self) -> Option<CompareOp> {
        let leaf_op = |node: &ConditionNode| match node {
            Self::Leaf(c) => Some(c.op),
            Self::FeatureLeaf(c) => Some(c.op),
            _ => None,
        };
        match self {
            Self::All(children) | Self::Any(children) => children.first().and_then(leaf_op),
            other => leaf_op(other),
        }
    }
}

/// A validated signal definition with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDefinition {
    pub id: String,
    pub name: String,
    pub dimension: String,
    pub severity: String,
    pub weight: f64,
    pub enabled: bool,
    pub window: String,
    pub window_months: u32,
    pub allow_partial_window: bool,
    pub consistency: ConsistencyPolicy,
    pub requires: Requirements,
    pub conditions: ConditionNode,
    pub confidence: ConfidencePolicy,
    pub min_coverage: MinCoverage,
    pub explain: Explain,
    pub require_quarter_alignment: bool,
    pub require_year_alignment: bool,
}

impl SignalDefinition {
    pub fn composite(&self) -> Option<&CompositeCondition> {
        self.conditions.as_composite()
    }

    pub fn is_composite(&self) -> bool {
        self.composite().is_some()
    }

    /// Signal ids this signal must be evaluated after: prerequisite
    /// antecedents plus, for composites, the referenced signals.
    pub fn antecedents(&self) -> BTreeSet<&str> {
        let mut ids: BTreeSet<&str> = self
            .requires
            .triggered_signals_any
            .iter()
            .chain(&self.requires.triggered_signals_all)
            .map(String::as_str)
            .collect();
        if let Some(composite) = self.composite() {
            ids.extend(composite.signals.iter().map(String::as_str));
        }
        ids
    }
}

/// Validated `signals.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalsConfig {
    pub windows: BTreeMap<String, u32>,
    pub severity_scores: BTreeMap<String, f64>,
    pub default_weight: f64,
    pub confidence_tiers: Vec<ConfidenceTier>,
    pub signals: Vec<SignalDefinition>,
}

impl SignalsConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let doc: SignalsDocument = load_document(path)?;
        Self::from_document(doc)
    }

    /// Parse and validate from a YAML string (for testing).
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let doc: SignalsDocument = parse_document(yaml)?;
        Self::from_document(doc)
    }

    pub fn from_document(doc: SignalsDocument) -> Result<Self, ConfigError> {
        let mut windows = BTreeMap::new();
        for (name, spec) in &doc.windows {
            let months = spec.months.unwrap_or(i64::from(DEFAULT_WINDOW_MONTHS));
            let months = u32::try_from(months)
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| {
                    ConfigError::validation(
                        format!("windows.{name}.months"),
                        format!("must be a positive month count, got {months}"),
                    )
                })?;
            windows.insert(name.clone(), months);
        }

        let severity_scores: BTreeMap<String, f64> = doc
            .scoring
            .severity_levels
            .iter()
            .map(|(tier, level)| (tier.clone(), level.score.unwrap_or(0.0)))
            .collect();

        let default_weight = doc.scoring.default_weight.unwrap_or(1.0);
        if !default_weight.is_finite() || default_weight < 0.0 {
            return Err(ConfigError::validation(
                "scoring.default_weight",
                "must not be negative",
            ));
        }

        let mut config = Self {
            windows,
            severity_scores,
            default_weight,
            confidence_tiers: doc.schema.confidence_policy.confidence_tiers,
            signals: Vec::with_capacity(doc.signals.len()),
        };

        let mut seen = BTreeSet::new();
        for (idx, spec) in doc.signals.into_iter().enumerate() {
            let enabled = spec.enabled.unwrap_or(true);
            let id = spec.id.trim().to_string();
            let def = match config.build_signal(idx, spec) {
                Ok(Some(def)) => def,
                Ok(None) => continue,
                Err(err) if !enabled => {
                    tracing::debug!(signal = %id, %err, "disabled signal dropped without validation");
                    continue;
                }
                Err(err) => return Err(err),
            };
            if !seen.insert(def.id.clone()) {
                return Err(ConfigError::validation(
                    format!("signals.{}", def.id),
                    "duplicate signal id",
                ));
            }
            config.signals.push(def);
        }

        tracing::debug!(
            signals = config.signals.len(),
            windows = config.windows.len(),
            tiers = config.confidence_tiers.len(),
            "validated signal definitions"
        );
        Ok(config)
    }

    /// Month count of a named window. Unknown names default to 3.
    pub fn window_months(&self, name: &str) -> u32 {
        self.windows.get(name).copied().unwrap_or(DEFAULT_WINDOW_MONTHS)
    }

    /// Score of a severity tier. Unknown tiers score 0.
    pub fn severity_score(&self, tier: &str) -> f64 {
        self.severity_scores.get(tier).copied().unwrap_or(0.0)
    }

    pub fn get(&self, id: &str) -> Option<&SignalDefinition> {
        self.signals.iter().find(|s| s.id == id)
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SignalDefinition> {
        self.signals.iter().filter(|s| s.enabled)
    }

    /// `Ok(None)` for a signal without conditions: it can never fire and is
    /// left out of the run.
    fn build_signal(&self, idx: usize, spec: SignalSpec) -> Result<Option<SignalDefinition>, ConfigError> {
        let id = spec.id.trim().to_string();
        if id.is_empty() {
            return Err(ConfigError::validation(format!("signals[{idx}].id"), "is required"));
        }
        let field = |suffix: &str| format!("signals.{id}.{suffix}");

        let severity = spec.severity.unwrap_or_else(|| DEFAULT_SEVERITY.to_string());
        if !self.severity_scores.is_empty() && !self.severity_scores.contains_key(&severity) {
            tracing::warn!(signal = %id, severity = %severity, "unknown severity tier scores 0");
        }

        let weight = match spec.weight {
            Some(w) if !w.is_finite() || w < 0.0 => {
                return Err(ConfigError::validation(field("weight"), "must not be negative"));
            }
            Some(w) if w > 0.0 => w,
            _ => self.default_weight,
        };

        let conditions = match &spec.conditions {
            Some(value) if !value.is_null() => parse_condition(value, &field("conditions"), true)?,
            _ => {
                tracing::warn!(signal = %id, "signal has no conditions and is skipped");
                return Ok(None);
            }
        };
        let composite = conditions.as_composite().is_some();

        let window = spec.window.unwrap_or_else(|| DEFAULT_WINDOW.to_string());
        let window_months = self.window_months(&window);
        let consistency = build_consistency(&spec.consistency, window_months, composite, &field)?;

        let base_default = if composite { 0.5 } else { 1.0 };
        let base_confidence = spec.confidence.base_confidence.unwrap_or(base_default);
        if !(0.0..=1.0).contains(&base_confidence) {
            return Err(ConfigError::validation(
                field("confidence.base_confidence"),
                "must be between 0.0 and 1.0",
            ));
        }

        for (name, threshold) in [
            ("series", spec.min_coverage.series),
            ("derived", spec.min_coverage.derived),
        ] {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::validation(
                    field(&format!("min_coverage.{name}")),
                    "must be between 0.0 and 1.0",
                ));
            }
        }

        Ok(Some(SignalDefinition {
            name: spec.name.unwrap_or_else(|| id.clone()),
            dimension: spec.dimension.unwrap_or_else(|| DEFAULT_DIMENSION.to_string()),
            severity,
            weight,
            enabled: spec.enabled.unwrap_or(true),
            window,
            window_months,
            allow_partial_window: spec.allow_partial_window,
            consistency,
            requires: spec.requires,
            conditions,
            confidence: ConfidencePolicy {
                raw_ratio_feature: spec.confidence.raw_ratio_feature,
                interp_ratio_feature: spec.confidence.interp_ratio_feature,
                forecast_uncertainty_feature: spec.confidence.forecast_uncertainty_feature,
                base_confidence,
            },
            min_coverage: spec.min_coverage,
            explain: spec.explain,
            require_quarter_alignment: spec.require_quarter_alignment,
            require_year_alignment: spec.require_year_alignment,
            id,
        }))
    }
}

fn build_consistency(
    spec: &ConsistencySpec,
    window_months: u32,
    composite: bool,
    field: &impl Fn(&str) -> String,
) -> Result<ConsistencyPolicy, ConfigError> {
    let kind = match spec.kind.as_deref() {
        None | Some("k_of_n") => ConsistencyKind::KOfN,
        Some("once_in_window") => ConsistencyKind::OnceInWindow,
        Some(other) => {
            return Err(ConfigError::validation(
                field("consistency.type"),
                format!("unknown consistency type '{other}'"),
            ));
        }
    };
    if kind == ConsistencyKind::OnceInWindow {
        return Ok(ConsistencyPolicy { kind, k: 1, n: 1 });
    }

    let default_k = if composite { 1 } else { 2 };
    let k = spec.k.unwrap_or(default_k);
    let n = spec.n.unwrap_or(i64::from(window_months));
    if k < 1 || n < 1 || k > n {
        return Err(ConfigError::validation(
            field("consistency"),
            format!("requires 1 <= k <= n, got k={k} n={n}"),
        ));
    }
    let to_u32 = |v: i64| {
        u32::try_from(v)
            .map_err(|_| ConfigError::invalid(field("consistency"), format!("{v} is out of range")))
    };
    Ok(ConsistencyPolicy {
        kind,
        k: to_u32(k)?,
        n: to_u32(n)?,
    })
}

/// Parse one condition node. A sequence means "all of".
fn parse_condition(value: &Value, field: &str, at_root: bool) -> Result<ConditionNode, ConfigError> {
    match value {
        Value::Sequence(items) => parse_group(items, field).map(ConditionNode::All),
        Value::Mapping(_) => {
            if let Some(composite) = value.get("composite") {
                if !at_root {
                    return Err(ConfigError::validation(
                        field,
                        "composite conditions are only allowed at the root",
                    ));
                }
                return parse_composite(composite, &format!("{field}.composite"));
            }
            if let Some(all) = value.get("all") {
                if value.get("any").is_some() {
                    tracing::warn!(field, "condition has both `all` and `any`; `any` is ignored");
                }
                return group_items(all, field, "all").map(ConditionNode::All);
            }
            if let Some(any) = value.get("any") {
                return group_items(any, field, "any").map(ConditionNode::Any);
            }
            if value.get("feature").is_some() {
                return parse_leaf(value, field);
            }
            Err(ConfigError::validation(
                field,
                "expected one of `all`, `any`, `feature`, `composite`",
            ))
        }
        _ => Err(ConfigError::validation(field, "expected a mapping or a list")),
    }
}

fn group_items(value: &Value, field: &str, key: &str) -> Result<Vec<ConditionNode>, ConfigError> {
    let field = format!("{field}.{key}");
    match value.as_sequence() {
        Some(items) => parse_group(items, &field),
        None => Err(ConfigError::validation(field, "expected a list")),
    }
}

fn parse_group(items: &[Value], field: &str) -> Result<Vec<ConditionNode>, ConfigError> {
    if items.is_empty() {
        return Err(ConfigError::validation(field, "condition group is empty"));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_condition(item, &format!("{field}[{i}]"), false))
        .collect()
}

fn parse_leaf(value: &Value, field: &str) -> Result<ConditionNode, ConfigError> {
    let feature = value
        .get("feature")
        .and_then(Value::as_str)
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ConfigError::validation(format!("{field}.feature"), "expected a feature name"))?
        .to_string();

    let op_text = value
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| ConfigError::validation(format!("{field}.op"), "is required"))?;
    let op = CompareOp::parse(op_text).ok_or_else(|| {
        ConfigError::validation(
            format!("{field}.op"),
            format!("unknown comparison operator '{op_text}'"),
        )
    })?;

    if let Some(feature_ref) = value.get("feature_ref") {
        let feature_ref = feature_ref
            .as_str()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::validation(format!("{field}.feature_ref"), "expected a feature name")
            })?
            .to_string();
        return Ok(ConditionNode::FeatureLeaf(FeatureComparison {
            feature,
            op,
            feature_ref,
        }));
    }

    let literal = match value.get("value") {
        None | Some(Value::Null) => 0.0,
        Some(v) => number(v).ok_or_else(|| {
            ConfigError::invalid(format!("{field}.value"), "expected a number")
        })?,
    };
    Ok(ConditionNode::Leaf(Comparison {
        feature,
        op,
        value: literal,
    }))
}

fn parse_composite(value: &Value, field: &str) -> Result<ConditionNode, ConfigError> {
    let signals: Vec<String> = value
        .get("signals")
        .and_then(Value::as_sequence)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    if signals.is_empty() {
        return Err(ConfigError::validation(
            format!("{field}.signals"),
            "composite must reference at least one signal",
        ));
    }

    let combinator = match value.get("type").and_then(Value::as_str) {
        Some("all_signals") => CompositeCombinator::All,
        None | Some("m_of_n_signals") => {
            let m = match value.get("m") {
                None | Some(Value::Null) => 1.0,
                Some(v) => number(v).ok_or_else(|| {
                    ConfigError::invalid(format!("{field}.m"), "expected an integer")
                })?,
            };
            if m.fract() != 0.0 || m < 1.0 || m > signals.len() as f64 {
                return Err(ConfigError::validation(
                    format!("{field}.m"),
                    format!("must be between 1 and {}", signals.len()),
                ));
            }
            CompositeCombinator::MOfN { m: m as usize }
        }
        Some(other) => {
            return Err(ConfigError::validation(
                format!("{field}.type"),
                format!("unknown composite type '{other}'"),
            ));
        }
    };

    Ok(ConditionNode::Composite(CompositeCondition {
        signals,
        combinator,
    }))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Deserialize a tier map while keeping the declared order.
fn ordered_tiers<'de, D>(deserializer: D) -> Result<Vec<ConfidenceTier>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Thresholds {
        min_raw_ratio: Option<f64>,
        max_interp_ratio: Option<f64>,
    }

    struct TiersVisitor;

    impl<'de> Visitor<'de> for TiersVisitor {
        type Value = Vec<ConfidenceTier>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of tier name to thresholds")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut tiers = Vec::new();
            while let Some((name, t)) = map.next_entry::<String, Option<Thresholds>>()? {
                let t = t.unwrap_or_default();
                tiers.push(ConfidenceTier {
                    name,
                    min_raw_ratio: t.min_raw_ratio.unwrap_or(0.0),
                    max_interp_ratio: t.max_interp_ratio.unwrap_or(1.0),
                });
            }
            Ok(tiers)
        }
    }

    deserializer.deserialize_any(TiersVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
windows:
  win3: { months: 3 }
  win6: { months: 6 }
scoring:
  default_weight: 1.0
  severity_levels:
    low: { score: 20 }
    high: { score: 60 }
schema:
  confidence_policy:
    confidence_tiers:
      high: { min_raw_ratio: 0.8, max_interp_ratio: 0.2 }
      medium: { min_raw_ratio: 0.5, max_interp_ratio: 0.5 }
"#;

    fn with_signals(signals: &str) -> Result<SignalsConfig, ConfigError> {
        SignalsConfig::from_yaml(&format!("{BASE}\nsignals:\n{signals}"))
    }

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationFailed { field, .. } | ConfigError::InvalidValue { field, .. } => {
                field
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn defaults_resolve_for_a_minimal_signal() {
        let cfg = with_signals(
            r#"
  - id: slow_response
    conditions:
      all:
        - { feature: issue_response_time.p95_yoy, op: ">", value: 0.2 }
"#,
        )
        .unwrap();
        let s = &cfg.signals[0];
        assert_eq!(s.name, "slow_response");
        assert_eq!(s.dimension, "unknown");
        assert_eq!(s.severity, "info");
        assert_eq!(s.weight, 1.0);
        assert!(s.enabled);
        assert_eq!(s.window_months, 3);
        assert_eq!(s.consistency, ConsistencyPolicy { kind: ConsistencyKind::KOfN, k: 2, n: 3 });
        assert_eq!(s.confidence.base_confidence, 1.0);
        assert!(s.confidence.ratios_unconfigured());
    }

    #[test]
    fn tiers_keep_declared_order() {
        let cfg = with_signals("  []").unwrap();
        let names: Vec<&str> = cfg.confidence_tiers.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["high", "medium"]);
    }

    #[test]
    fn list_conditions_mean_all() {
        let cfg = with_signals(
            r#"
  - id: s
    conditions:
      - { feature: stars, op: "<", value: 10 }
      - { feature: forks, op: ">=", feature_ref: stars }
"#,
        )
        .unwrap();
        match &cfg.signals[0].conditions {
            ConditionNode::All(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[1], ConditionNode::FeatureLeaf(_)));
            }
            other => panic!("expected All, got {other:?}"),
        }
    }

    #[test]
    fn leaf_value_defaults_to_zero() {
        let cfg = with_signals(
            r#"
  - id: s
    conditions: { feature: activity_slope, op: "<" }
"#,
        )
        .unwrap();
        assert_eq!(
            cfg.signals[0].conditions,
            ConditionNode::Leaf(Comparison {
                feature: "activity_slope".into(),
                op: CompareOp::Lt,
                value: 0.0,
            })
        );
    }

    #[test]
    fn composite_defaults() {
        let cfg = with_signals(
            r#"
  - id: a
    conditions: { feature: x, op: ">", value: 1 }
  - id: b
    conditions: { feature: y, op: ">", value: 1 }
  - id: combo
    severity: high
    conditions:
      composite: { type: m_of_n_signals, m: 2, signals: [a, b] }
"#,
        )
        .unwrap();
        let combo = cfg.get("combo").unwrap();
        assert!(combo.is_composite());
        assert_eq!(combo.consistency.k, 1);
        assert_eq!(combo.consistency.n, 3);
        assert_eq!(combo.confidence.base_confidence, 0.5);
        assert_eq!(combo.antecedents().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn once_in_window_is_one_of_one() {
        let cfg = with_signals(
            r#"
  - id: s
    window: win6
    consistency: { type: once_in_window }
    conditions: { feature: x, op: "==", value: 1 }
"#,
        )
        .unwrap();
        let c = cfg.signals[0].consistency;
        assert_eq!((c.k, c.n), (1, 1));
    }

    #[test]
    fn zero_weight_uses_default_weight() {
        let cfg = with_signals(
            r#"
  - id: s
    weight: 0
    conditions: { feature: x, op: ">", value: 1 }
"#,
        )
        .unwrap();
        assert_eq!(cfg.signals[0].weight, 1.0);
    }

    #[test]
    fn alignment_op_reads_first_top_level_leaf() {
        let cfg = with_signals(
            r#"
  - id: s
    conditions:
      any:
        - { feature: x, op: "<=", value: 1 }
        - { feature: y, op: ">", value: 1 }
"#,
        )
        .unwrap();
        assert_eq!(cfg.signals[0].conditions.alignment_op(), Some(CompareOp::Le));
    }

    #[test]
    fn rejects_invalid_definitions() {
        let cases = [
            ("  - { id: s, conditions: { feature: x, op: '=>', value: 1 } }", "signals.s.conditions.op"),
            ("  - { id: s, conditions: { feature: x, value: 1 } }", "signals.s.conditions.op"),
            ("  - { id: s, conditions: { all: [] } }", "signals.s.conditions.all"),
            ("  - { id: s, conditions: { feature: x, op: '>' }, consistency: { k: 4, n: 3 } }", "signals.s.consistency"),
            ("  - { id: s, conditions: { feature: x, op: '>' }, consistency: { k: 0 } }", "signals.s.consistency"),
            ("  - { id: s, conditions: { feature: x, op: '>' }, weight: -1 }", "signals.s.weight"),
            ("  - { id: s, conditions: { composite: { signals: [] } } }", "signals.s.conditions.composite.signals"),
            ("  - { id: s, conditions: { composite: { m: 3, signals: [a, b] } } }", "signals.s.conditions.composite.m"),
            ("  - { id: s, conditions: { all: [ { composite: { signals: [a] } } ] } }", "signals.s.conditions.all[0]"),
            ("  - { conditions: { feature: x, op: '>' } }", "signals[0].id"),
        ];
        for (yaml, expected) in cases {
            let err = with_signals(yaml).unwrap_err();
            assert_eq!(field_of(err), expected, "{yaml}");
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = with_signals(
            r#"
  - { id: s, conditions: { feature: x, op: ">" } }
  - { id: s, conditions: { feature: y, op: ">" } }
"#,
        )
        .unwrap_err();
        assert_eq!(field_of(err), "signals.s");
    }

    #[test]
    fn unknown_severity_tier_scores_zero() {
        let cfg = with_signals("  - { id: s, conditions: { feature: x, op: '>' }, severity: extreme }")
            .unwrap();
        let s = cfg.get("s").unwrap();
        assert_eq!(s.severity, "extreme");
        assert_eq!(cfg.severity_score(&s.severity), 0.0);
    }

    #[test]
    fn signal_without_conditions_is_skipped() {
        let cfg = with_signals(
            r#"
  - { id: empty }
  - { id: nulled, conditions: ~ }
  - { id: kept, conditions: { feature: x, op: ">" } }
"#,
        )
        .unwrap();
        let ids: Vec<_> = cfg.signals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["kept"]);
    }

    #[test]
    fn disabled_signals_skip_validation() {
        let cfg = with_signals(
            r#"
  - { id: broken, enabled: false, conditions: { feature: x, op: '=>' } }
  - { id: heavy, enabled: false, conditions: { feature: x, op: '>' }, weight: -1 }
  - { id: off, enabled: false, conditions: { feature: x, op: '>' } }
"#,
        )
        .unwrap();
        let ids: Vec<_> = cfg.signals.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["off"]);
        assert_eq!(cfg.enabled().count(), 0);

        let err = with_signals("  - { id: broken, enabled: true, conditions: { feature: x, op: '=>' } }")
            .unwrap_err();
        assert_eq!(field_of(err), "signals.broken.conditions.op");
    }

    #[test]
    fn rejects_non_positive_window() {
        let err = SignalsConfig::from_yaml("windows: { win0: { months: 0 } }").unwrap_err();
        assert_eq!(field_of(err), "windows.win0.months");
    }
}
