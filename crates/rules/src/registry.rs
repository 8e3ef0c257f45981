//! In-memory atom registry with snapshot reads for evaluation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::{EligibilityError, Result};
use crate::schema::{AtomParameters, EligibilityAtom};
use crate::validation::{self, ValidationResult};

/// Read access to atom definitions during a tree walk.
pub trait AtomLookup {
    /// Resolve an atom by id. Unknown ids are [`EligibilityError::AtomNotFound`],
    /// never an inactive atom.
    fn get(&self, id: &str) -> Result<Arc<EligibilityAtom>>;
}

/// Concurrently readable atom store.
///
/// Atoms are held as `Arc`s and replaced wholesale on update, so a reader
/// that cloned an `Arc` keeps a consistent view of that atom.
#[derive(Debug, Default)]
pub struct AtomRegistry {
    atoms: RwLock<HashMap<String, Arc<EligibilityAtom>>>,
}

impl AtomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an atom after validating its parameters.
    pub fn register(&self, atom: EligibilityAtom) -> Result<()> {
        let result = validation::validate_atom(&atom);
        if !result.valid {
            return Err(EligibilityError::Validation(format!(
                "atom '{}': {}",
                atom.id(),
                result.summary()
            )));
        }
        let id = atom.id().to_string();
        let replaced = self
            .atoms
            .write()
            .expect("atoms lock poisoned")
            .insert(id.clone(), Arc::new(atom))
            .is_some();
        info!(atom_id = %id, replaced, "registered atom");
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Option<Arc<EligibilityAtom>> {
        let removed = self.atoms.write().expect("atoms lock poisoned").remove(id);
        if removed.is_some() {
            debug!(atom_id = %id, "removed atom");
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.atoms.read().expect("atoms lock poisoned").contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.atoms.read().expect("atoms lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All atoms, sorted by id.
    pub fn list(&self) -> Vec<Arc<EligibilityAtom>> {
        let mut atoms: Vec<_> = self
            .atoms
            .read()
            .expect("atoms lock poisoned")
            .values()
            .cloned()
            .collect();
        atoms.sort_by(|a, b| a.id().cmp(b.id()));
        atoms
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.atoms.read().expect("atoms lock poisoned").keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Check typed parameters for an atom type without registering anything.
    pub fn validate_parameters(params: &AtomParameters) -> Result<()> {
        let mut result = ValidationResult::new();
        validation::atom_checks::validate_parameters(params, "parameters", &mut result);
        into_validation_error(result)
    }

    /// Check an untyped parameter bag against the named atom type.
    pub fn validate_raw_parameters(atom_type: &str, parameters: &serde_json::Value) -> Result<()> {
        into_validation_error(validation::validate_raw_parameters(atom_type, parameters))
    }

    /// Copy the `Arc`s of the requested atoms so evaluation never holds the lock.
    ///
    /// Ids the registry does not know are left out; the snapshot reports them
    /// as [`EligibilityError::AtomNotFound`] when looked up.
    pub fn snapshot<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> AtomSnapshot {
        let atoms = self.atoms.read().expect("atoms lock poisoned");
        let atoms = ids
            .into_iter()
            .filter_map(|id| atoms.get(id).map(|a| (id.to_string(), Arc::clone(a))))
            .collect();
        AtomSnapshot { atoms }
    }

    /// Snapshot covering every atom a set of ids names.
    pub fn snapshot_of(&self, ids: &BTreeSet<String>) -> AtomSnapshot {
        self.snapshot(ids.iter().map(String::as_str))
    }
}

impl AtomLookup for AtomRegistry {
    fn get(&self, id: &str) -> Result<Arc<EligibilityAtom>> {
        self.atoms
            .read()
            .expect("atoms lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| EligibilityError::AtomNotFound(id.to_string()))
    }
}

/// Immutable per-decision view of the atoms a composition references.
#[derive(Debug, Clone, Default)]
pub struct AtomSnapshot {
    atoms: HashMap<String, Arc<EligibilityAtom>>,
}

impl AtomSnapshot {
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

impl AtomLookup for AtomSnapshot {
    fn get(&self, id: &str) -> Result<Arc<EligibilityAtom>> {
        self.atoms
            .get(id)
            .cloned()
            .ok_or_else(|| EligibilityError::AtomNotFound(id.to_string()))
    }
}

fn into_validation_error(result: ValidationResult) -> Result<()> {
    if result.valid {
        Ok(())
    } else {
        Err(EligibilityError::Validation(result.summary()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AtomCategory;

    fn age(id: &str, min: f64, max: f64) -> EligibilityAtom {
        EligibilityAtom::new(
            id,
            AtomCategory::Demographic,
            AtomParameters::AgeRange { field: None, min_age: min, max_age: max },
        )
    }

    #[test]
    fn register_and_get() {
        let registry = AtomRegistry::new();
        registry.register(age("age-25-35", 25.0, 35.0)).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("age-25-35").unwrap().id(), "age-25-35");
    }

    #[test]
    fn unknown_id_is_not_found() {
        let registry = AtomRegistry::new();
        match registry.get("ghost") {
            Err(EligibilityError::AtomNotFound(id)) => assert_eq!(id, "ghost"),
            other => panic!("expected AtomNotFound, got {:?}", other),
        }
    }

    #[test]
    fn inactive_atom_is_still_resolvable() {
        let registry = AtomRegistry::new();
        let mut atom = age("age-25-35", 25.0, 35.0);
        atom.metadata.enabled = false;
        registry.register(atom).unwrap();
        assert!(!registry.get("age-25-35").unwrap().is_active());
    }

    #[test]
    fn register_rejects_bad_parameters() {
        let registry = AtomRegistry::new();
        let err = registry.register(age("bad", 50.0, 10.0)).unwrap_err();
        assert!(matches!(err, EligibilityError::Validation(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn validate_parameters_checks_both_forms() {
        let params = AtomParameters::ChurnRisk { field: None, max_risk: 0.3 };
        assert!(AtomRegistry::validate_parameters(&params).is_ok());
        let params = AtomParameters::ChurnRisk { field: None, max_risk: 3.0 };
        assert!(AtomRegistry::validate_parameters(&params).is_err());

        let raw = serde_json::json!({"regions": ["PH"]});
        assert!(AtomRegistry::validate_raw_parameters("geography", &raw).is_ok());
        assert!(AtomRegistry::validate_raw_parameters("geography", &serde_json::json!({})).is_err());
    }

    #[test]
    fn snapshot_is_isolated_from_later_updates() {
        let registry = AtomRegistry::new();
        registry.register(age("age-25-35", 25.0, 35.0)).unwrap();
        let snapshot = registry.snapshot(["age-25-35", "missing"]);
        assert_eq!(snapshot.len(), 1);

        registry.register(age("age-25-35", 40.0, 50.0)).unwrap();
        registry.remove("age-25-35");

        let seen = snapshot.get("age-25-35").unwrap();
        assert_eq!(
            seen.parameters,
            AtomParameters::AgeRange { field: None, min_age: 25.0, max_age: 35.0 }
        );
        assert!(matches!(snapshot.get("missing"), Err(EligibilityError::AtomNotFound(_))));
    }

    #[test]
    fn list_is_sorted() {
        let registry = AtomRegistry::new();
        registry.register(age("b-atom", 1.0, 2.0)).unwrap();
        registry.register(age("a-atom", 1.0, 2.0)).unwrap();
        assert_eq!(registry.ids(), vec!["a-atom", "b-atom"]);
        assert_eq!(registry.list()[0].id(), "a-atom");
    }
}
