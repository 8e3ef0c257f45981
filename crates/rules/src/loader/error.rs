//! Error types and load result structures for the document loader.

use std::path::PathBuf;

use crate::schema::RuleKind;

/// Errors that can occur while loading, writing or deleting documents.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Document validation error (bad parameters, malformed tree, unknown kind).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: RuleKind, id: String },

    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: RuleKind, id: String },

    /// Deleting the atom would leave these compositions dangling.
    #[error("atom '{atom_id}' is referenced by: {}", compositions.join(", "))]
    Referenced {
        atom_id: String,
        compositions: Vec<String>,
    },

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for loader operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading a single file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    Loaded { kind: RuleKind, id: String },
    /// File was skipped (dotfile, non-YAML, etc.).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}

impl LoadResult {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, LoadStatus::Failed { .. })
    }
}
