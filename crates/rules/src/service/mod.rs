//! Eligibility service: the public decision entry point.
//!
//! Resolves a composition from the store (bounded by a timeout), snapshots
//! the atoms it references, walks the tree and assembles an immutable
//! [`Decision`]. Decisions are not persisted here.

mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EligibilityError, Result};
use crate::evaluator::{RuleTreeEvaluator, TreeOutcome};
use crate::registry::{AtomLookup, AtomRegistry};
use crate::schema::{RuleComposition, RuleNode};
use crate::store::CompositionStore;
use crate::validation;

pub use types::*;

/// Id reported for decisions made from a bare `eligibilityAtoms` list.
pub const AD_HOC_COMPOSITION_ID: &str = "ad-hoc";

/// Limits applied by [`EligibilityService`].
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub store_timeout: Duration,
    pub max_batch_size: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_millis(2000),
            max_batch_size: 100,
        }
    }
}

pub struct EligibilityService {
    registry: Arc<AtomRegistry>,
    store: Arc<dyn CompositionStore>,
    options: ServiceOptions,
}

impl EligibilityService {
    pub fn new(registry: Arc<AtomRegistry>, store: Arc<dyn CompositionStore>, options: ServiceOptions) -> Self {
        Self { registry, store, options }
    }

    pub fn registry(&self) -> &Arc<AtomRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Decide for one request.
    pub async fn decide(&self, request: &DecisionRequest) -> Result<Decision> {
        let subject = subject_for(request)?;

        let composition = match request.target_composition() {
            Some(id) => self.fetch(id).await?,
            None if !request.eligibility_atoms.is_empty() => Arc::new(ad_hoc(&request.eligibility_atoms)),
            None => {
                return Err(EligibilityError::Validation(
                    "request must name a compositionId, momentId, campaignId or eligibilityAtoms".to_string(),
                ))
            }
        };

        self.evaluate(&composition, &subject, &request.customer_id, request.moment_id.clone())
    }

    /// Decide for a raw subject against a stored composition.
    pub async fn decide_for(&self, subject: &Value, composition_id: &str) -> Result<Decision> {
        let composition = self.fetch(composition_id).await?;
        let customer_id = subject
            .get("customerId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.evaluate(&composition, subject, &customer_id, None)
    }

    /// Decide every request independently; one failure never affects the others.
    ///
    /// Results are in input order. A batch larger than `max_batch_size` is
    /// rejected as a whole.
    pub async fn decide_batch(&self, requests: &[DecisionRequest]) -> Result<Vec<Result<Decision>>> {
        if requests.len() > self.options.max_batch_size {
            return Err(EligibilityError::Validation(format!(
                "batch of {} exceeds the limit of {}",
                requests.len(),
                self.options.max_batch_size
            )));
        }
        let results = futures::future::join_all(requests.iter().map(|r| self.decide(r))).await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(size = requests.len(), failed, "batch decided");
        Ok(results)
    }

    /// Evaluate a single atom against a sample subject.
    pub fn test_atom(&self, atom_id: &str, subject: &Value) -> Result<AtomTestResult> {
        let snapshot = self.registry.snapshot([atom_id]);
        // Resolve first so an unknown id is reported even for empty snapshots.
        snapshot.get(atom_id)?;
        let start = Instant::now();
        let outcome = RuleTreeEvaluator::evaluate(&RuleNode::atom(atom_id), subject, &snapshot)?;
        Ok(AtomTestResult {
            result: outcome.result,
            confidence: outcome.confidence,
            execution_time: elapsed_ms(start),
            trace: outcome.trace,
        })
    }

    /// Load a composition, bounded by the store timeout, and check its structure.
    async fn fetch(&self, id: &str) -> Result<Arc<RuleComposition>> {
        let timeout = self.options.store_timeout;
        let composition = match tokio::time::timeout(timeout, self.store.get(id)).await {
            Err(_) => {
                let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(composition_id = %id, timeout_ms = ms, "composition store timed out");
                return Err(EligibilityError::StoreTimeout(ms));
            }
            Ok(Err(e)) => {
                warn!(composition_id = %id, error = %e, "composition store failed");
                return Err(EligibilityError::Store(e.to_string()));
            }
            Ok(Ok(None)) => return Err(EligibilityError::CompositionNotFound(id.to_string())),
            Ok(Ok(Some(c))) => c,
        };

        let check = validation::validate_composition(&composition, None);
        if !check.valid {
            return Err(EligibilityError::CompositionInvalid {
                id: id.to_string(),
                errors: check.errors,
            });
        }
        Ok(composition)
    }

    fn evaluate(
        &self,
        composition: &RuleComposition,
        subject: &Value,
        customer_id: &str,
        moment_id: Option<String>,
    ) -> Result<Decision> {
        let start = Instant::now();
        let snapshot = self.registry.snapshot_of(&composition.referenced_atom_ids());
        let TreeOutcome { result, trace, .. } =
            RuleTreeEvaluator::evaluate_composition(composition, subject, &snapshot)?;

        let atom_results = trace.atoms().into_iter().map(AtomResult::from_trace).collect();
        let final_score = trace.weighted_score();
        let decision = Decision {
            eligible: result,
            moment_id,
            content: if result { composition.content.clone() } else { None },
            reasoning: Reasoning {
                atom_results,
                final_score,
                execution_time: elapsed_ms(start),
                trace,
            },
            metadata: DecisionMetadata {
                decision_id: Uuid::new_v4(),
                timestamp: Utc::now(),
                version: composition.version.clone(),
                composition_id: composition.id().to_string(),
                customer_id: customer_id.to_string(),
            },
        };

        info!(
            composition_id = %composition.id(),
            customer_id = %customer_id,
            eligible = result,
            final_score,
            "decision made"
        );
        Ok(decision)
    }
}

/// The request context with `customerId` added.
fn subject_for(request: &DecisionRequest) -> Result<Value> {
    let mut context = match &request.context {
        Value::Null => serde_json::Map::new(),
        Value::Object(map) => map.clone(),
        _ => {
            return Err(EligibilityError::Validation(
                "context must be a JSON object".to_string(),
            ))
        }
    };
    context
        .entry("customerId")
        .or_insert_with(|| Value::String(request.customer_id.clone()));
    Ok(Value::Object(context))
}

fn ad_hoc(atom_ids: &[String]) -> RuleComposition {
    RuleComposition::new(
        AD_HOC_COMPOSITION_ID,
        atom_ids.iter().map(|id| RuleNode::atom(id.as_str())).collect(),
    )
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
