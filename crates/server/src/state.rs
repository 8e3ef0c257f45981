use std::sync::Arc;

use kairos_core::Config;
use kairos_rules::history::DecisionHistory;
use kairos_rules::loader::RuleLoader;
use kairos_rules::EligibilityService;

/// Shared handles for every request handler.
pub struct AppState {
    pub config: Config,
    /// Owns the rules directory; all atom and composition writes go through it.
    pub loader: Arc<RuleLoader>,
    pub service: Arc<EligibilityService>,
    pub history: Arc<DecisionHistory>,
}

impl AppState {
    /// Atom ids currently registered, for reference checks on save.
    pub fn known_atoms(&self) -> Vec<String> {
        self.loader.registry().ids()
    }
}
