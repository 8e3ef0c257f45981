//! Composition store abstraction and the in-memory catalog behind it.
//!
//! The eligibility service only depends on [`CompositionStore`], so a
//! remote store can be injected in place of [`CompositionCatalog`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::schema::RuleComposition;

/// Errors a composition backend can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("composition store unavailable: {0}")]
    Unavailable(String),

    #[error("composition store query failed: {0}")]
    QueryFailed(String),
}

/// Source of rule compositions by id.
///
/// `get` may suspend on I/O; callers bound it with a timeout.
#[async_trait::async_trait]
pub trait CompositionStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Arc<RuleComposition>>, StoreError>;
}

/// In-memory compositions keyed by id, fed by the loader and the HTTP API.
#[derive(Debug, Default)]
pub struct CompositionCatalog {
    compositions: RwLock<HashMap<String, Arc<RuleComposition>>>,
}

impl CompositionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, composition: RuleComposition) {
        let id = composition.id().to_string();
        self.compositions
            .write()
            .expect("compositions lock poisoned")
            .insert(id.clone(), Arc::new(composition));
        info!(composition_id = %id, "stored composition");
    }

    pub fn remove(&self, id: &str) -> Option<Arc<RuleComposition>> {
        self.compositions.write().expect("compositions lock poisoned").remove(id)
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<RuleComposition>> {
        self.compositions.read().expect("compositions lock poisoned").get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.compositions.read().expect("compositions lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All compositions, sorted by id.
    pub fn list(&self) -> Vec<Arc<RuleComposition>> {
        let mut all: Vec<_> = self
            .compositions
            .read()
            .expect("compositions lock poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// Ids of compositions whose tree references `atom_id`, sorted.
    pub fn referencing(&self, atom_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .compositions
            .read()
            .expect("compositions lock poisoned")
            .values()
            .filter(|c| c.references_atom(atom_id))
            .map(|c| c.id().to_string())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait::async_trait]
impl CompositionStore for CompositionCatalog {
    async fn get(&self, id: &str) -> Result<Option<Arc<RuleComposition>>, StoreError> {
        Ok(self.lookup(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RuleNode;

    #[tokio::test]
    async fn catalog_serves_inserted_compositions() {
        let catalog = CompositionCatalog::new();
        catalog.insert(RuleComposition::new("promo", vec![RuleNode::atom("age-25-35")]));

        let found = catalog.get("promo").await.unwrap().unwrap();
        assert_eq!(found.id(), "promo");
        assert!(catalog.get("ghost").await.unwrap().is_none());
    }

    #[test]
    fn referencing_finds_nested_atoms() {
        let catalog = CompositionCatalog::new();
        catalog.insert(RuleComposition::new(
            "b-promo",
            vec![RuleNode::or(vec![RuleNode::not(RuleNode::atom("churn"))])],
        ));
        catalog.insert(RuleComposition::new("a-promo", vec![RuleNode::atom("churn")]));
        catalog.insert(RuleComposition::new("other", vec![RuleNode::atom("age")]));

        assert_eq!(catalog.referencing("churn"), vec!["a-promo", "b-promo"]);
        assert!(catalog.referencing("nothing").is_empty());
    }

    #[test]
    fn remove_drops_entry() {
        let catalog = CompositionCatalog::new();
        catalog.insert(RuleComposition::new("promo", vec![]));
        assert!(catalog.remove("promo").is_some());
        assert!(catalog.is_empty());
    }
}
