//! Recursive rule-tree evaluation with short-circuiting and tracing.

use std::time::Instant;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::registry::AtomLookup;
use crate::schema::{Condition, LogicalOperator, RuleComposition, RuleNode};

use super::{ConditionEvaluator, TraceKind, TraceNode, TraceReason};

/// Result of walking a tree: the decision plus everything that was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeOutcome {
    pub result: bool,
    pub confidence: f64,
    pub trace: TraceNode,
}

impl From<TraceNode> for TreeOutcome {
    fn from(trace: TraceNode) -> Self {
        Self {
            result: trace.result,
            confidence: trace.confidence,
            trace,
        }
    }
}

/// Walks [`RuleNode`] trees.
///
/// AND and groups stop at the first false child, OR stops at the first true
/// child; skipped children never appear in the trace. Unknown atoms abort
/// the walk with `AtomNotFound`; every other oddity evaluates to `false`.
pub struct RuleTreeEvaluator;

impl RuleTreeEvaluator {
    pub fn evaluate<A: AtomLookup + ?Sized>(node: &RuleNode, subject: &Value, atoms: &A) -> Result<TreeOutcome> {
        eval_node(node, subject, atoms).map(TreeOutcome::from)
    }

    /// Evaluate every root of a composition under an implicit AND.
    ///
    /// A composition without nodes is `false` with reason `empty-composition`.
    pub fn evaluate_composition<A: AtomLookup + ?Sized>(
        composition: &RuleComposition,
        subject: &Value,
        atoms: &A,
    ) -> Result<TreeOutcome> {
        let start = Instant::now();
        let (combined, reason) = if composition.nodes.is_empty() {
            (Combined::fault(), Some(TraceReason::EmptyComposition))
        } else {
            all_of(&composition.nodes, subject, atoms)?
        };
        let trace = TraceNode {
            kind: TraceKind::Root,
            label: composition.id().to_string(),
            result: combined.result,
            confidence: combined.confidence,
            negated: false,
            weight: None,
            reason,
            elapsed_us: elapsed_us(start),
            children: combined.children,
        };
        Ok(trace.into())
    }
}

struct Combined {
    result: bool,
    confidence: f64,
    children: Vec<TraceNode>,
}

impl Combined {
    fn fault() -> Self {
        Self { result: false, confidence: 0.0, children: Vec::new() }
    }
}

fn eval_node<A: AtomLookup + ?Sized>(node: &RuleNode, subject: &Value, atoms: &A) -> Result<TraceNode> {
    match node {
        RuleNode::Atom { atom_id, conditions, .. } => eval_atom(atom_id, conditions, subject, atoms),
        RuleNode::Operator { operator, children, .. } => {
            eval_combinator(TraceKind::Operator, node.label(), *operator, children, subject, atoms)
        }
        RuleNode::Group { operator, children, .. } => eval_combinator(
            TraceKind::Group,
            node.label(),
            operator.unwrap_or(LogicalOperator::And),
            children,
            subject,
            atoms,
        ),
    }
}

fn eval_combinator<A: AtomLookup + ?Sized>(
    kind: TraceKind,
    label: String,
    operator: LogicalOperator,
    children: &[RuleNode],
    subject: &Value,
    atoms: &A,
) -> Result<TraceNode> {
    let start = Instant::now();
    let (combined, reason) = match operator {
        LogicalOperator::And => all_of(children, subject, atoms)?,
        LogicalOperator::Or => any_of(children, subject, atoms)?,
        LogicalOperator::Not => {
            let (inner, reason) = all_of(children, subject, atoms)?;
            if reason.is_some() {
                (inner, reason)
            } else {
                let negated = Combined { result: !inner.result, ..inner };
                return Ok(TraceNode {
                    kind,
                    label,
                    result: negated.result,
                    confidence: negated.confidence,
                    negated: true,
                    weight: None,
                    reason: None,
                    elapsed_us: elapsed_us(start),
                    children: negated.children,
                });
            }
        }
    };
    Ok(TraceNode {
        kind,
        label,
        result: combined.result,
        confidence: combined.confidence,
        negated: false,
        weight: None,
        reason,
        elapsed_us: elapsed_us(start),
        children: combined.children,
    })
}

/// AND: stop at the first false child. Confidence is the minimum seen.
fn all_of<A: AtomLookup + ?Sized>(
    children: &[RuleNode],
    subject: &Value,
    atoms: &A,
) -> Result<(Combined, Option<TraceReason>)> {
    if children.is_empty() {
        return Ok((Combined::fault(), Some(TraceReason::EmptyOperator)));
    }
    let mut out = Combined { result: true, confidence: 1.0, children: Vec::with_capacity(children.len()) };
    for child in children {
        let trace = eval_node(child, subject, atoms)?;
        let passed = trace.result;
        out.confidence = out.confidence.min(trace.confidence);
        out.children.push(trace);
        if !passed {
            out.result = false;
            break;
        }
    }
    Ok((out, None))
}

/// OR: stop at the first true child. Confidence is the maximum seen.
fn any_of<A: AtomLookup + ?Sized>(
    children: &[RuleNode],
    subject: &Value,
    atoms: &A,
) -> Result<(Combined, Option<TraceReason>)> {
    if children.is_empty() {
        return Ok((Combined::fault(), Some(TraceReason::EmptyOperator)));
    }
    let mut out = Combined { result: false, confidence: 0.0, children: Vec::with_capacity(children.len()) };
    for child in children {
        let trace = eval_node(child, subject, atoms)?;
        let passed = trace.result;
        out.confidence = out.confidence.max(trace.confidence);
        out.children.push(trace);
        if passed {
            out.result = true;
            break;
        }
    }
    Ok((out, None))
}

fn eval_atom<A: AtomLookup + ?Sized>(
    atom_id: &str,
    overrides: &[Condition],
    subject: &Value,
    atoms: &A,
) -> Result<TraceNode> {
    let start = Instant::now();
    let atom = atoms.get(atom_id)?;

    let mut node = TraceNode {
        kind: TraceKind::Atom,
        label: atom_id.to_string(),
        result: false,
        confidence: 0.0,
        negated: false,
        weight: None,
        reason: None,
        elapsed_us: 0,
        children: Vec::new(),
    };

    if !atom.is_active() {
        node.reason = Some(TraceReason::InactiveAtom);
        node.elapsed_us = elapsed_us(start);
        debug!(atom_id, "atom inactive, evaluating to false");
        return Ok(node);
    }

    let intrinsic = atom.parameters.intrinsic_conditions();
    let mut result = true;
    let mut confidence: f64 = 1.0;
    for condition in intrinsic.iter().chain(overrides) {
        let leaf_start = Instant::now();
        let outcome = ConditionEvaluator::evaluate(condition, subject);
        confidence = confidence.min(outcome.confidence);
        node.children.push(TraceNode {
            kind: TraceKind::Condition,
            label: format!("{} {} {}", condition.field, condition.operator, condition.value),
            result: outcome.result,
            confidence: outcome.confidence,
            negated: false,
            weight: Some(condition.effective_weight()),
            reason: outcome.reason,
            elapsed_us: elapsed_us(leaf_start),
            children: Vec::new(),
        });
        if !outcome.result {
            result = false;
            break;
        }
    }

    if node.children.is_empty() {
        node.reason = Some(TraceReason::EmptyOperator);
    } else {
        node.result = result;
        node.confidence = confidence;
    }
    node.elapsed_us = elapsed_us(start);
    debug!(atom_id, result = node.result, confidence = node.confidence, "evaluated atom");
    Ok(node)
}

fn elapsed_us(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}
