//! Domain-focused API endpoint modules.
//!
//! Each sub-module owns a single responsibility area.
//! Shared body parsing lives here in mod.rs.

mod atoms;
mod compositions;
mod decisions;
pub mod doc;
pub mod error;
mod health;

use serde::de::DeserializeOwned;

use self::error::ApiError;

// ── Body parsing ─────────────────────────────────────────────────

/// Parse a YAML or JSON document body (JSON is valid YAML).
pub(crate) fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_yaml::from_str(body).map_err(|e| ApiError::bad_request(format!("Invalid document: {}", e)))
}

// ── Re-exports ───────────────────────────────────────────────────
// Preserves flat `api::foo` import paths used by router.rs route registration.

pub use atoms::{atoms_create, atoms_delete, atoms_get, atoms_list, atoms_test, atoms_toggle, atoms_update};
pub use compositions::{
    compositions_create, compositions_delete, compositions_get,
    compositions_list, compositions_update, compositions_validate,
};
pub use decisions::{decide, decide_batch, decision_history};
pub use health::health;
