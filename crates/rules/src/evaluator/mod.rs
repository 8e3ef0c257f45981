//! Eligibility evaluation: leaf conditions, rule trees and their traces.
//!
//! - [`ConditionEvaluator`] tests one `field <operator> value` condition.
//! - [`RuleTreeEvaluator`] walks AND/OR/NOT/group trees with short-circuit
//!   semantics and records a [`TraceNode`] for every node it evaluated.
//!
//! Evaluation is synchronous and pure: atoms come from an [`AtomLookup`]
//! (normally a per-decision snapshot) and nothing is written anywhere.
//!
//! [`AtomLookup`]: crate::registry::AtomLookup

mod condition;
pub mod path;
mod tree;

use serde::{Deserialize, Serialize};

pub use condition::{ConditionEvaluator, ConditionOutcome};
pub use tree::{RuleTreeEvaluator, TreeOutcome};

/// What a trace node represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Root,
    Atom,
    Condition,
    Operator,
    Group,
}

/// Explanation attached to a node that evaluated to `false` without a
/// plain comparison failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TraceReason {
    InactiveAtom,
    EmptyOperator,
    EmptyComposition,
    MissingField,
    TypeMismatch,
    MalformedValue,
}

impl TraceReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceReason::InactiveAtom => "inactive-atom",
            TraceReason::EmptyOperator => "empty-operator",
            TraceReason::EmptyComposition => "empty-composition",
            TraceReason::MissingField => "missing-field",
            TraceReason::TypeMismatch => "type-mismatch",
            TraceReason::MalformedValue => "malformed-value",
        }
    }
}

/// One evaluated node. Children skipped by short-circuiting are absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraceNode {
    pub kind: TraceKind,
    /// Atom id, operator name, group name, or `field operator value`.
    pub label: String,
    pub result: bool,
    pub confidence: f64,
    /// Set on NOT nodes: `result` is the negation of the inner outcome.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negated: bool,
    /// Scoring weight, condition leaves only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<TraceReason>,
    pub elapsed_us: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TraceNode>,
}

impl TraceNode {
    /// Visit every node in depth-first pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TraceNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Atom nodes in evaluation order.
    pub fn atoms(&self) -> Vec<&TraceNode> {
        let mut out = Vec::new();
        self.walk(&mut |n| {
            if n.kind == TraceKind::Atom {
                out.push(n);
            }
        });
        out
    }

    /// Evaluated condition leaves in evaluation order.
    pub fn conditions(&self) -> Vec<&TraceNode> {
        let mut out = Vec::new();
        self.walk(&mut |n| {
            if n.kind == TraceKind::Condition {
                out.push(n);
            }
        });
        out
    }

    /// Weighted mean confidence of the evaluated condition leaves.
    ///
    /// Unset weights count as `1`. Returns `0.0` when no leaf ran.
    pub fn weighted_score(&self) -> f64 {
        let (sum, weights) = self
            .conditions()
            .iter()
            .fold((0.0, 0.0), |(sum, weights), leaf| {
                let w = leaf.weight.unwrap_or(1.0);
                (sum + w * leaf.confidence, weights + w)
            });
        if weights > 0.0 {
            sum / weights
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests;
