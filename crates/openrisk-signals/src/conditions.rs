//! Condition Evaluator.
//!
//! Evaluates a signal's [`ConditionNode`] at one (repo, month) by structural
//! recursion. Any absent operand makes its leaf false, so sparse histories
//! degrade detection locally instead of failing the run.

use openrisk_core::config::ConditionNode;
use openrisk_core::{Month, RepoId};

use crate::features::{FeatureRef, FeatureStore};

/// Replaces one metric by another in every resolved reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSubstitution<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

/// Everything an evaluation reads, passed explicitly into every call.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub store: &'a FeatureStore,
    pub repo: RepoId,
    pub substitution: Option<MetricSubstitution<'a>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(store: &'a FeatureStore, repo: RepoId) -> Self {
        Self {
            store,
            repo,
            substitution: None,
        }
    }

    pub fn with_substitution(mut self, substitution: MetricSubstitution<'a>) -> Self {
        self.substitution = Some(substitution);
        self
    }

    /// Resolve a reference, applying the metric substitution if any.
    pub fn resolve(&self, reference: &str) -> Option<FeatureRef> {
        let resolved = self.store.catalog().resolve(reference)?;
        Some(self.substitute(resolved))
    }

    pub fn substitute(&self, feature: FeatureRef) -> FeatureRef {
        match self.substitution {
            Some(sub) if feature.metric == sub.from => feature.with_metric(sub.to),
            _ => feature,
        }
    }

    pub fn value(&self, reference: &str, month: Month) -> Option<f64> {
        let feature = self.resolve(reference)?;
        self.store.get(self.repo, &feature, month)
    }
}

/// Evaluate `node` at `month`.
///
/// Composite nodes evaluate to false here; their activation comes from the
/// fired-months registry, not from features.
pub fn evaluate(node: &ConditionNode, ctx: &EvalContext<'_>, month: Month) -> bool {
    match node {
        ConditionNode::Leaf(c) => ctx
            .value(&c.feature, month)
            .is_some_and(|left| c.op.apply(left, c.value)),
        ConditionNode::FeatureLeaf(c) => {
            let Some(left) = ctx.value(&c.feature, month) else {
                return false;
            };
            ctx.value(&c.feature_ref, month)
                .is_some_and(|right| c.op.apply(left, right))
        }
        ConditionNode::All(children) => children.iter().all(|child| evaluate(child, ctx, month)),
        ConditionNode::Any(children) => children.iter().any(|child| evaluate(child, ctx, month)),
        ConditionNode::Composite(_) => false,
    }
}
