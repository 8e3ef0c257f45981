//! Header metadata shared by every persisted document kind.

use serde::{Deserialize, Serialize};

/// Shared metadata for atoms and compositions.
///
/// For an atom, `enabled` is its `isActive` flag: a disabled atom stays
/// resolvable by id but always evaluates to `false`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CommonMetadata {
    /// Minimal metadata with the given id used as display name too.
    pub fn named(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            tags: None,
            enabled: true,
        }
    }
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_api_version() -> String {
    "v1".to_string()
}

pub(crate) fn default_version() -> String {
    "1.0.0".to_string()
}
