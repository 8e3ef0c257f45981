//! Kairos eligibility rule engine.
//!
//! This crate provides:
//! - YAML-based atom and composition definitions with serde deserialization
//! - Filesystem loader with hot-reload via `notify` watcher
//! - Condition and AND/OR/NOT rule-tree evaluation with traces
//! - The eligibility decision service and in-memory decision history

pub mod error;
pub mod evaluator;
pub mod history;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod service;
pub mod store;
pub mod validation;

pub use error::{EligibilityError, Result};
pub use registry::{AtomLookup, AtomRegistry};
pub use service::{Decision, DecisionRequest, EligibilityService, ServiceOptions};
pub use store::{CompositionCatalog, CompositionStore};
