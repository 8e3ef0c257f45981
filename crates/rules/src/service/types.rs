//! Request and response shapes for eligibility decisions (camelCase on the wire).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluator::TraceNode;

/// Caller request: who to decide for and which rule to apply.
///
/// The rule is resolved from `compositionId`, then `momentId`, then
/// `campaignId`. Without any of those, `eligibilityAtoms` are ANDed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub customer_id: String,
    /// Subject record; `customerId` is added to it before evaluation.
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eligibility_atoms: Vec<String>,
}

impl DecisionRequest {
    pub fn for_composition(customer_id: impl Into<String>, composition_id: impl Into<String>, context: serde_json::Value) -> Self {
        Self {
            customer_id: customer_id.into(),
            context,
            composition_id: Some(composition_id.into()),
            ..Self::default()
        }
    }

    /// Composition id this request names, by precedence.
    pub fn target_composition(&self) -> Option<&str> {
        self.composition_id
            .as_deref()
            .or(self.moment_id.as_deref())
            .or(self.campaign_id.as_deref())
    }
}

/// Immutable per-subject evaluation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moment_id: Option<String>,
    /// Composition content, present only when eligible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    pub reasoning: Reasoning,
    pub metadata: DecisionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reasoning {
    /// One entry per evaluated atom, in evaluation order.
    pub atom_results: Vec<AtomResult>,
    /// Weighted mean confidence of evaluated condition leaves.
    pub final_score: f64,
    /// Milliseconds spent in the tree walk.
    pub execution_time: f64,
    pub trace: TraceNode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AtomResult {
    pub atom_id: String,
    pub result: bool,
    pub confidence: f64,
    /// Milliseconds.
    pub execution_time: f64,
}

impl AtomResult {
    pub(crate) fn from_trace(node: &TraceNode) -> Self {
        Self {
            atom_id: node.label.clone(),
            result: node.result,
            confidence: node.confidence,
            execution_time: micros_to_ms(node.elapsed_us),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMetadata {
    pub decision_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Version of the composition that produced the decision.
    pub version: String,
    pub composition_id: String,
    pub customer_id: String,
}

/// Result of testing one atom against a sample subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomTestResult {
    pub result: bool,
    pub confidence: f64,
    pub execution_time: f64,
    pub trace: TraceNode,
}

pub(crate) fn micros_to_ms(us: u64) -> f64 {
    us as f64 / 1000.0
}
