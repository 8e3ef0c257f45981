//! Server startup: shared state initialization.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use kairos_rules::history::DecisionHistory;
use kairos_rules::loader::{LoadStatus, RuleLoader};
use kairos_rules::store::CompositionStore;
use kairos_rules::{AtomRegistry, CompositionCatalog, EligibilityService, ServiceOptions};

use crate::state::AppState;

/// Load the rules directory and build `AppState`.
///
/// Per-file load failures are logged and skipped; the server starts with
/// whatever loaded cleanly.
pub fn build_app_state(config: &kairos_core::Config) -> anyhow::Result<Arc<AppState>> {
    let registry = Arc::new(AtomRegistry::new());
    let catalog = Arc::new(CompositionCatalog::new());

    let rules_dir = config.engine.rules_dir.clone();
    let mut loader = RuleLoader::new(rules_dir.clone(), registry.clone(), catalog.clone());
    match loader.load_all() {
        Ok(results) => {
            let loaded = results
                .iter()
                .filter(|r| matches!(r.status, LoadStatus::Loaded { .. }))
                .count();
            let failed = results.iter().filter(|r| r.is_failed()).count();
            info!(
                loaded,
                failed,
                atoms = registry.len(),
                compositions = catalog.len(),
                "Loaded rules from {}",
                rules_dir.display()
            );
        }
        Err(e) => {
            warn!("Failed to load rules: {} — API will start empty", e);
        }
    }

    if config.engine.watch {
        if let Err(e) = loader.watch() {
            warn!("Failed to start rules watcher: {} — hot-reload disabled", e);
        }
    }

    let store: Arc<dyn CompositionStore> = catalog;
    let options = ServiceOptions {
        store_timeout: Duration::from_millis(config.engine.store_timeout_ms),
        max_batch_size: config.engine.max_batch_size,
    };
    let service = EligibilityService::new(registry, store, options);
    let history = DecisionHistory::with_max_entries(config.engine.history_max_entries);

    Ok(Arc::new(AppState {
        config: config.clone(),
        loader: Arc::new(loader),
        service: Arc::new(service),
        history: Arc::new(history),
    }))
}
