//! Integration tests over the example documents in `data/rules/examples/`:
//! every file loads, and the shipped compositions decide as documented.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use kairos_rules::evaluator::TraceReason;
use kairos_rules::loader::{LoadStatus, RuleLoader};
use kairos_rules::schema::{parse_document, RuleComposition, RuleDocument};
use kairos_rules::store::CompositionStore;
use kairos_rules::{AtomRegistry, CompositionCatalog, Decision, EligibilityError, EligibilityService, ServiceOptions};

/// Resolve the examples directory relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn examples_dir() -> PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/rules/examples")
}

fn load_examples() -> RuleLoader {
    let loader = RuleLoader::new(
        examples_dir(),
        Arc::new(AtomRegistry::new()),
        Arc::new(CompositionCatalog::new()),
    );
    let results = loader.load_all().expect("scan examples");
    let failed: Vec<_> = results.iter().filter(|r| r.is_failed()).collect();
    assert!(failed.is_empty(), "example documents failed to load: {:?}", failed);
    loader
}

fn service(loader: &RuleLoader) -> EligibilityService {
    let store: Arc<dyn CompositionStore> = loader.catalog().clone();
    EligibilityService::new(loader.registry().clone(), store, ServiceOptions::default())
}

async fn decide(subject: Value, composition_id: &str) -> Decision {
    let loader = load_examples();
    service(&loader)
        .decide_for(&subject, composition_id)
        .await
        .unwrap_or_else(|e| panic!("decision for {} failed: {}", composition_id, e))
}

fn atom_ids(decision: &Decision) -> Vec<&str> {
    decision
        .reasoning
        .atom_results
        .iter()
        .map(|r| r.atom_id.as_str())
        .collect()
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn every_example_loads() {
    let loader = load_examples();
    assert_eq!(loader.registry().len(), 8);
    assert_eq!(loader.catalog().len(), 5);

    let results = loader.load_all().unwrap();
    let kinds: Vec<_> = results
        .iter()
        .filter_map(|r| match &r.status {
            LoadStatus::Loaded { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds.len(), 13);
}

#[test]
fn example_compositions_round_trip_through_yaml() {
    let loader = load_examples();
    for comp in loader.catalog().list() {
        let yaml = serde_yaml::to_string(comp.as_ref()).unwrap();
        let reparsed: RuleComposition = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(*comp, reparsed, "{}", comp.id());

        let doc = parse_document(&yaml).unwrap();
        assert!(matches!(doc, RuleDocument::Composition(_)));
    }
}

#[test]
fn purchase_frequency_uses_field_override() {
    let loader = load_examples();
    let atom = loader
        .registry()
        .list()
        .into_iter()
        .find(|a| a.id() == "high-purchase-frequency")
        .unwrap();
    let conditions = atom.parameters.intrinsic_conditions();
    assert_eq!(conditions[0].field, "stats.purchases_per_month");
    assert_eq!(atom.version, "1.1.0");
}

// ── Decisions ───────────────────────────────────────────────────────

#[tokio::test]
async fn age_30_is_eligible_with_full_confidence() {
    let decision = decide(json!({ "age": 30 }), "age-check").await;
    assert!(decision.eligible);
    assert_eq!(decision.reasoning.final_score, 1.0);
    assert_eq!(decision.reasoning.atom_results[0].confidence, 1.0);
    assert_eq!(decision.metadata.composition_id, "age-check");
    assert_eq!(decision.metadata.version, "1.0.0");
}

#[tokio::test]
async fn age_40_is_not_eligible() {
    let decision = decide(json!({ "age": 40 }), "age-check").await;
    assert!(!decision.eligible);
    assert!(decision.content.is_none());
}

#[tokio::test]
async fn and_stops_at_first_failing_atom() {
    let subject = json!({
        "age": 30,
        "device": "desktop",
        "stats": { "purchases_per_month": 9 },
        "consent": { "marketing": true }
    });
    let decision = decide(subject, "young-mobile-shoppers").await;
    assert!(!decision.eligible);
    assert_eq!(atom_ids(&decision), vec!["age-25-35", "mobile-user"]);
}

#[tokio::test]
async fn full_match_returns_content() {
    let subject = json!({
        "age": 28,
        "device": "android",
        "stats": { "purchases_per_month": 9 },
        "consent": { "marketing": true }
    });
    let decision = decide(subject, "young-mobile-shoppers").await;
    assert!(decision.eligible);
    assert_eq!(decision.content.as_ref().unwrap()["discount"], json!(15));
    assert_eq!(atom_ids(&decision).len(), 4);
    assert!(decision.reasoning.final_score > 0.0 && decision.reasoning.final_score <= 1.0);
}

#[tokio::test]
async fn or_stops_at_first_passing_atom() {
    let subject = json!({ "age": 30, "device": "ios", "address": { "city": "Makati" } });
    let decision = decide(subject, "broad-reach").await;
    assert!(decision.eligible);
    assert_eq!(atom_ids(&decision), vec!["age-over-50", "mobile-user"]);
}

#[tokio::test]
async fn not_excludes_churn_risks() {
    let base = json!({
        "consent": { "marketing": true },
        "address": { "city": "Makati" },
        "loyalty": { "points": 250 },
        "churn_risk": 0.2
    });
    let decision = decide(base.clone(), "retention-winback").await;
    assert!(decision.eligible);
    assert_eq!(decision.content.as_ref().unwrap()["voucher"], json!("WINBACK10"));

    let mut risky = base;
    risky["churn_risk"] = json!(0.9);
    let decision = decide(risky, "retention-winback").await;
    assert!(!decision.eligible);
    let not = &decision.reasoning.trace.children[1];
    assert!(not.negated);
    assert!(not.children[0].result);
}

#[tokio::test]
async fn inactive_atom_denies() {
    let decision = decide(json!({ "segment": "gold" }), "legacy-gold").await;
    assert!(!decision.eligible);
    let atom = &decision.reasoning.trace.children[0];
    assert_eq!(atom.reason, Some(TraceReason::InactiveAtom));
}

#[tokio::test]
async fn unknown_composition_is_not_found() {
    let loader = load_examples();
    let err = service(&loader)
        .decide_for(&json!({ "age": 30 }), "does-not-exist")
        .await
        .unwrap_err();
    assert!(matches!(err, EligibilityError::CompositionNotFound(ref id) if id == "does-not-exist"));
}
