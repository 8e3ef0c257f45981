//! Tests for schema types.

use super::*;
use serde_json::json;

const AGE_ATOM_YAML: &str = r#"
apiVersion: v1
kind: EligibilityAtom
metadata:
  id: age-25-35
  name: Age 25-35
  description: Young professionals
  tags: [demographic, core]
  enabled: true
category: demographic
version: 1.2.0
parameters:
  type: age_range
  min_age: 25
  max_age: 35
"#;

const CUSTOM_ATOM_YAML: &str = r#"
apiVersion: v1
kind: EligibilityAtom
metadata:
  id: vip-shopper
  name: VIP Shopper
category: behavioral
parameters:
  type: custom
  conditions:
    - field: profile.tier
      operator: equals
      value: gold
    - field: lifetime_value
      operator: greater_than
      value: 1000
      weight: 2.0
"#;

const COMPOSITION_YAML: &str = r#"
apiVersion: v1
kind: RuleComposition
metadata:
  id: summer-promo
  name: Summer Promo Audience
version: 2.0.0
nodes:
  - type: operator
    id: root
    operator: and
    children:
      - type: atom
        id: n-age
        atom_id: age-25-35
      - type: group
        id: g-reach
        name: Reachability
        operator: or
        children:
          - type: atom
            atom_id: mobile-user
          - type: atom
            atom_id: newsletter
            conditions:
              - field: email.verified
                operator: equals
                value: true
      - type: operator
        operator: not
        children:
          - type: atom
            atom_id: churn-risk-high
connections:
  - id: c1
    source: root
    target: n-age
    type: default
estimated_performance:
  accuracy: 0.82
  speed: 0.95
  complexity: 0.3
content:
  headline: Summer deals
  discount: 15
"#;

#[test]
fn parse_age_atom() {
    let atom: EligibilityAtom = serde_yaml::from_str(AGE_ATOM_YAML).unwrap();
    assert_eq!(atom.id(), "age-25-35");
    assert_eq!(atom.category, AtomCategory::Demographic);
    assert_eq!(atom.version, "1.2.0");
    assert!(atom.is_active());
    assert_eq!(atom.atom_type(), AtomType::AgeRange);

    let conditions = atom.parameters.intrinsic_conditions();
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].field, "age");
    assert_eq!(conditions[0].operator, ConditionOperator::Between);
    assert_eq!(range_bounds(&conditions[0].value), Some((25.0, 35.0)));
}

#[test]
fn atom_defaults_version_and_enabled() {
    let atom: EligibilityAtom = serde_yaml::from_str(CUSTOM_ATOM_YAML).unwrap();
    assert_eq!(atom.version, "1.0.0");
    assert!(atom.metadata.enabled);

    let conditions = atom.parameters.intrinsic_conditions();
    assert_eq!(conditions.len(), 2);
    assert_eq!(conditions[1].effective_weight(), 2.0);
    assert_eq!(conditions[0].effective_weight(), 1.0);
}

#[test]
fn field_override_replaces_default_path() {
    let yaml = r#"
type: geography
field: address.country
regions: [PH, SG]
"#;
    let params: AtomParameters = serde_yaml::from_str(yaml).unwrap();
    let conditions = params.intrinsic_conditions();
    assert_eq!(conditions[0].field, "address.country");
    assert_eq!(conditions[0].operator, ConditionOperator::InRange);
    assert_eq!(conditions[0].value, json!(["PH", "SG"]));
}

#[test]
fn consent_defaults_to_required() {
    let params: AtomParameters = serde_yaml::from_str("type: consent").unwrap();
    let conditions = params.intrinsic_conditions();
    assert_eq!(conditions[0].field, "consent.marketing");
    assert_eq!(conditions[0].value, json!(true));
}

#[test]
fn unknown_atom_type_is_rejected() {
    let err = serde_yaml::from_str::<AtomParameters>("type: star_sign\nsign: leo").unwrap_err();
    assert!(err.to_string().contains("star_sign"));
}

#[test]
fn parameters_shape_is_checked_per_type() {
    // age_range requires both bounds
    assert!(serde_yaml::from_str::<AtomParameters>("type: age_range\nmin_age: 18").is_err());
}

#[test]
fn atom_type_round_trips_through_str() {
    for ty in AtomType::ALL {
        assert_eq!(ty.as_str().parse::<AtomType>().unwrap(), *ty);
    }
    assert!("nope".parse::<AtomType>().is_err());
}

#[test]
fn parse_composition_tree() {
    let comp: RuleComposition = serde_yaml::from_str(COMPOSITION_YAML).unwrap();
    assert_eq!(comp.id(), "summer-promo");
    assert_eq!(comp.version, "2.0.0");
    assert_eq!(comp.nodes.len(), 1);

    let root = &comp.nodes[0];
    assert_eq!(root.node_id(), Some("root"));
    assert_eq!(root.children().len(), 3);
    assert_eq!(root.depth(), 3);

    match &root.children()[1] {
        RuleNode::Group { name, operator, children, .. } => {
            assert_eq!(name, "Reachability");
            assert_eq!(*operator, Some(LogicalOperator::Or));
            assert_eq!(children.len(), 2);
        }
        other => panic!("expected group, got {:?}", other),
    }

    let ids: Vec<String> = comp.referenced_atom_ids().into_iter().collect();
    assert_eq!(ids, vec!["age-25-35", "churn-risk-high", "mobile-user", "newsletter"]);
    assert!(comp.references_atom("newsletter"));
    assert!(!comp.references_atom("age"));
    assert_eq!(comp.node_ids(), vec!["root", "n-age", "g-reach"]);
    assert_eq!(comp.connections[0].connection_type, "default");
    assert_eq!(comp.estimated_performance.as_ref().unwrap().accuracy, 0.82);
    assert_eq!(comp.content.as_ref().unwrap()["discount"], json!(15));
}

#[test]
fn composition_yaml_round_trip_preserves_tree() {
    let original: RuleComposition = serde_yaml::from_str(COMPOSITION_YAML).unwrap();
    let yaml = serde_yaml::to_string(&original).unwrap();
    let reparsed: RuleComposition = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(original, reparsed);

    let json = serde_json::to_value(&original).unwrap();
    let from_json: RuleComposition = serde_json::from_value(json).unwrap();
    assert_eq!(original, from_json);
}

#[test]
fn empty_composition_parses() {
    let yaml = r#"
kind: RuleComposition
metadata:
  id: nothing
  name: Nothing
"#;
    let comp: RuleComposition = serde_yaml::from_str(yaml).unwrap();
    assert!(comp.nodes.is_empty());
    assert_eq!(comp.api_version, "v1");
}

#[test]
fn unknown_node_field_is_rejected() {
    let yaml = r#"
type: operator
operator: xor
children: []
"#;
    assert!(serde_yaml::from_str::<RuleNode>(yaml).is_err());
}

#[test]
fn envelope_two_pass_dispatch() {
    let doc = parse_document(AGE_ATOM_YAML).unwrap();
    assert_eq!(doc.kind(), RuleKind::EligibilityAtom);
    assert_eq!(doc.id(), "age-25-35");
    assert!(doc.as_atom().is_some());
    assert!(doc.as_composition().is_none());

    let doc = parse_document(COMPOSITION_YAML).unwrap();
    assert_eq!(doc.kind(), RuleKind::RuleComposition);
    assert_eq!(doc.metadata().name, "Summer Promo Audience");
}

#[test]
fn envelope_rejects_unknown_kind() {
    let yaml = r#"
apiVersion: v1
kind: Campaign
metadata:
  id: x
  name: X
"#;
    let err = parse_document(yaml).unwrap_err();
    assert!(err.contains("unknown document kind"), "{}", err);
}

#[test]
fn document_json_carries_kind() {
    let doc = parse_document(AGE_ATOM_YAML).unwrap();
    let json = doc.to_json().unwrap();
    assert_eq!(json["kind"], "EligibilityAtom");
    assert_eq!(json["parameters"]["type"], "age_range");
}

#[test]
fn range_bounds_accepts_both_shapes() {
    assert_eq!(range_bounds(&json!([1, 5])), Some((1.0, 5.0)));
    assert_eq!(range_bounds(&json!({"min": 1, "max": 5})), Some((1.0, 5.0)));
    assert_eq!(range_bounds(&json!([1, 2, 3])), None);
    assert_eq!(range_bounds(&json!({"min": 1})), None);
    assert_eq!(range_bounds(&json!(["a", 2])), None);
}
