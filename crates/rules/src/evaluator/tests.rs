//! Tree evaluation tests: short-circuiting, negation, faults and scoring.

use serde_json::{json, Value};

use super::*;
use crate::error::EligibilityError;
use crate::registry::AtomRegistry;
use crate::schema::*;

fn age_atom(id: &str, min: f64, max: f64) -> EligibilityAtom {
    EligibilityAtom::new(
        id,
        AtomCategory::Demographic,
        AtomParameters::AgeRange { field: None, min_age: min, max_age: max },
    )
}

fn device_atom(id: &str, devices: &[&str]) -> EligibilityAtom {
    EligibilityAtom::new(
        id,
        AtomCategory::Contextual,
        AtomParameters::DeviceType {
            field: None,
            devices: devices.iter().map(|d| d.to_string()).collect(),
        },
    )
}

/// Registry with `pass` atoms that hold for the subject below and `fail` atoms that don't.
fn registry() -> AtomRegistry {
    let registry = AtomRegistry::new();
    registry.register(age_atom("age-25-35", 25.0, 35.0)).unwrap();
    registry.register(age_atom("pass-a", 20.0, 40.0)).unwrap();
    registry.register(age_atom("pass-b", 30.0, 30.0)).unwrap();
    registry.register(age_atom("pass-c", 0.0, 100.0)).unwrap();
    registry.register(age_atom("fail-a", 50.0, 60.0)).unwrap();
    registry.register(age_atom("fail-b", 60.0, 70.0)).unwrap();
    registry.register(device_atom("mobile", &["ios", "android"])).unwrap();
    let mut inactive = age_atom("inactive", 0.0, 100.0);
    inactive.metadata.enabled = false;
    registry.register(inactive).unwrap();
    registry
}

fn subject() -> Value {
    json!({ "age": 30, "device": "ios" })
}

fn eval(node: &RuleNode) -> TreeOutcome {
    RuleTreeEvaluator::evaluate(node, &subject(), &registry()).unwrap()
}

fn labels(trace: &TraceNode) -> Vec<&str> {
    trace.children.iter().map(|c| c.label.as_str()).collect()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn age_atom_in_range_is_eligible_with_full_confidence() {
    let out = eval(&RuleNode::atom("age-25-35"));
    assert!(out.result);
    assert_eq!(out.confidence, 1.0);
    assert_eq!(out.trace.kind, TraceKind::Atom);
    assert_eq!(out.trace.children[0].label, "age between [25.0,35.0]");
}

#[test]
fn age_atom_out_of_range_is_not_eligible() {
    let out = RuleTreeEvaluator::evaluate(&RuleNode::atom("age-25-35"), &json!({ "age": 40 }), &registry())
        .unwrap();
    assert!(!out.result);
    assert_eq!(out.confidence, 0.0);
}

#[test]
fn and_trace_stops_after_first_false() {
    let node = RuleNode::and(vec![
        RuleNode::atom("pass-a"),
        RuleNode::atom("fail-a"),
        RuleNode::atom("pass-b"),
    ]);
    let out = eval(&node);
    assert!(!out.result);
    assert_eq!(labels(&out.trace), vec!["pass-a", "fail-a"]);
}

#[test]
fn or_trace_stops_after_first_true() {
    let node = RuleNode::or(vec![
        RuleNode::atom("fail-a"),
        RuleNode::atom("pass-a"),
        RuleNode::atom("pass-b"),
    ]);
    let out = eval(&node);
    assert!(out.result);
    assert_eq!(labels(&out.trace), vec!["fail-a", "pass-a"]);
}

#[test]
fn or_with_all_false_evaluates_everything() {
    let node = RuleNode::or(vec![RuleNode::atom("fail-a"), RuleNode::atom("fail-b")]);
    let out = eval(&node);
    assert!(!out.result);
    assert_eq!(labels(&out.trace), vec!["fail-a", "fail-b"]);
    assert_eq!(out.confidence, 0.0);
}

#[test]
fn short_circuit_skips_unknown_atoms() {
    // The missing atom is never looked up because AND already failed.
    let node = RuleNode::and(vec![RuleNode::atom("fail-a"), RuleNode::atom("does-not-exist")]);
    assert!(!eval(&node).result);
}

// ── Negation ────────────────────────────────────────────────────────

#[test]
fn not_negates_and_keeps_inner_trace() {
    let out = eval(&RuleNode::not(RuleNode::atom("pass-a")));
    assert!(!out.result);
    assert!(out.trace.negated);
    assert_eq!(out.trace.children.len(), 1);
    assert!(out.trace.children[0].result);
    assert_eq!(out.confidence, out.trace.children[0].confidence);
}

#[test]
fn double_negation_matches_plain_evaluation() {
    let trees = [
        RuleNode::atom("pass-a"),
        RuleNode::atom("fail-a"),
        RuleNode::atom("inactive"),
        RuleNode::or(vec![RuleNode::atom("fail-a"), RuleNode::atom("mobile")]),
        RuleNode::and(vec![RuleNode::atom("pass-a"), RuleNode::atom("fail-b")]),
        RuleNode::group("g", vec![]),
    ];
    for tree in trees {
        let plain = eval(&tree);
        let double = eval(&RuleNode::not(RuleNode::not(tree.clone())));
        assert_eq!(plain.result, double.result, "{:?}", tree);
        let inner = &double.trace.children[0].children[0];
        assert_eq!(inner.result, plain.trace.result);
        assert_eq!(inner.children.len(), plain.trace.children.len());
    }
}

#[test]
fn not_with_several_children_negates_their_conjunction() {
    let node = RuleNode::Operator {
        id: None,
        operator: LogicalOperator::Not,
        children: vec![RuleNode::atom("pass-a"), RuleNode::atom("fail-a")],
    };
    let out = eval(&node);
    assert!(out.result);
    assert!(out.trace.negated);
}

// ── Faults absorbed into false ──────────────────────────────────────

#[test]
fn inactive_atom_is_false_regardless_of_subject() {
    let out = eval(&RuleNode::atom("inactive"));
    assert!(!out.result);
    assert_eq!(out.trace.reason, Some(TraceReason::InactiveAtom));
    assert!(out.trace.children.is_empty());
}

#[test]
fn empty_operators_are_false_with_reason() {
    for node in [
        RuleNode::and(vec![]),
        RuleNode::or(vec![]),
        RuleNode::group("nothing", vec![]),
        RuleNode::Operator { id: None, operator: LogicalOperator::Not, children: vec![] },
    ] {
        let out = eval(&node);
        assert!(!out.result, "{:?}", node);
        assert!(!out.trace.negated);
        assert_eq!(out.trace.reason, Some(TraceReason::EmptyOperator));
    }
}

#[test]
fn missing_subject_field_is_false_not_an_error() {
    let out = RuleTreeEvaluator::evaluate(&RuleNode::atom("mobile"), &json!({ "age": 30 }), &registry())
        .unwrap();
    assert!(!out.result);
    assert_eq!(out.trace.children[0].reason, Some(TraceReason::MissingField));
}

#[test]
fn unknown_atom_propagates() {
    let err = RuleTreeEvaluator::evaluate(&RuleNode::atom("ghost"), &subject(), &registry()).unwrap_err();
    assert!(matches!(err, EligibilityError::AtomNotFound(ref id) if id == "ghost"));
}

// ── Groups and overrides ────────────────────────────────────────────

#[test]
fn group_defaults_to_and() {
    let out = eval(&RuleNode::group("Core", vec![RuleNode::atom("pass-a"), RuleNode::atom("fail-a")]));
    assert!(!out.result);
    assert_eq!(out.trace.kind, TraceKind::Group);
    assert_eq!(out.trace.label, "Core");
}

#[test]
fn group_honours_explicit_operator() {
    let node = RuleNode::Group {
        id: None,
        name: "Either".into(),
        operator: Some(LogicalOperator::Or),
        children: vec![RuleNode::atom("fail-a"), RuleNode::atom("pass-a"), RuleNode::atom("pass-b")],
    };
    let out = eval(&node);
    assert!(out.result);
    assert_eq!(labels(&out.trace), vec!["fail-a", "pass-a"]);
}

#[test]
fn override_conditions_are_anded_after_intrinsic_logic() {
    let node = RuleNode::Atom {
        id: None,
        atom_id: "mobile".into(),
        conditions: vec![
            Condition::new("age", ConditionOperator::GreaterThan, json!(40)),
            Condition::new("age", ConditionOperator::LessThan, json!(10)),
        ],
    };
    let out = eval(&node);
    assert!(!out.result);
    let leaves: Vec<&str> = out.trace.children.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(leaves, vec!["device in_range [\"ios\",\"android\"]", "age greater_than 40"]);
}

// ── Compositions and scoring ────────────────────────────────────────

#[test]
fn empty_composition_is_false() {
    let comp = RuleComposition::new("empty", vec![]);
    let out = RuleTreeEvaluator::evaluate_composition(&comp, &subject(), &registry()).unwrap();
    assert!(!out.result);
    assert_eq!(out.trace.kind, TraceKind::Root);
    assert_eq!(out.trace.reason, Some(TraceReason::EmptyComposition));
    assert_eq!(out.trace.weighted_score(), 0.0);
}

#[test]
fn composition_roots_are_anded() {
    let comp = RuleComposition::new("two-roots", vec![RuleNode::atom("pass-a"), RuleNode::atom("mobile")]);
    let out = RuleTreeEvaluator::evaluate_composition(&comp, &subject(), &registry()).unwrap();
    assert!(out.result);
    assert_eq!(labels(&out.trace), vec!["pass-a", "mobile"]);

    let comp = RuleComposition::new("two-roots", vec![RuleNode::atom("fail-a"), RuleNode::atom("mobile")]);
    let out = RuleTreeEvaluator::evaluate_composition(&comp, &subject(), &registry()).unwrap();
    assert!(!out.result);
    assert_eq!(labels(&out.trace), vec!["fail-a"]);
}

#[test]
fn confidence_combines_min_for_and_max_for_or() {
    // age 30 in [20, 40] -> 1.0, in [0, 100] -> 0.8
    let and = eval(&RuleNode::and(vec![RuleNode::atom("pass-a"), RuleNode::atom("pass-c")]));
    assert!((and.confidence - 0.8).abs() < 1e-9);

    let or = eval(&RuleNode::or(vec![RuleNode::atom("fail-a"), RuleNode::atom("pass-c")]));
    assert!((or.confidence - 0.8).abs() < 1e-9);
}

#[test]
fn weighted_score_uses_only_evaluated_leaves() {
    let node = RuleNode::Atom {
        id: None,
        atom_id: "pass-c".into(),
        conditions: vec![Condition::new("device", ConditionOperator::Equals, json!("ios")).with_weight(3.0)],
    };
    let out = eval(&node);
    // (1 * 0.8 + 3 * 1.0) / 4
    assert!((out.trace.weighted_score() - 0.95).abs() < 1e-9);

    let skipped = eval(&RuleNode::and(vec![RuleNode::atom("fail-a"), node]));
    assert_eq!(skipped.trace.conditions().len(), 1);
    assert_eq!(skipped.trace.weighted_score(), 0.0);
}

#[test]
fn trace_serializes_reasons_kebab_case() {
    let out = eval(&RuleNode::atom("inactive"));
    let json = serde_json::to_value(&out.trace).unwrap();
    assert_eq!(json["kind"], "atom");
    assert_eq!(json["reason"], "inactive-atom");
    assert!(json.get("negated").is_none());
    assert!(json.get("elapsedUs").is_some());
}
