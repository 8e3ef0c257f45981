//! Structural validation for atoms and compositions with "Did you mean …?"
//! suggestions.
//!
//! Returns a [`ValidationResult`] with errors (block save and evaluation)
//! and warnings (advisory).

pub(crate) mod atom_checks;
mod composition_checks;
mod condition_checks;

pub mod fuzzy;

use crate::schema::*;
use serde::{Deserialize, Serialize};

pub use atom_checks::validate_raw_parameters;

/// Nesting depth above which a composition draws a warning.
pub const MAX_RECOMMENDED_DEPTH: usize = 32;

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// JSON-path-like location, e.g. `"nodes[0].children[1].value"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationIssue::new(path, message));
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// One-line rendering of the errors, for logs and error messages.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| match &e.suggestion {
                Some(s) => format!("{}: {} ({})", e.path, e.message, s),
                None => format!("{}: {}", e.path, e.message),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a parsed [`EligibilityAtom`].
pub fn validate_atom(atom: &EligibilityAtom) -> ValidationResult {
    let mut result = ValidationResult::new();
    atom_checks::validate_header(atom, &mut result);
    atom_checks::validate_parameters(&atom.parameters, "parameters", &mut result);
    result
}

/// Validate a parsed [`RuleComposition`].
///
/// When `known_atoms` is supplied, atom references are checked against it
/// and near misses get a suggestion.
pub fn validate_composition(comp: &RuleComposition, known_atoms: Option<&[&str]>) -> ValidationResult {
    let mut result = ValidationResult::new();
    composition_checks::validate_header(comp, &mut result);
    composition_checks::validate_nodes(comp, known_atoms, &mut result);
    composition_checks::validate_connections(comp, &mut result);
    result
}

/// Validate any [`RuleDocument`] variant, dispatching to the appropriate validator.
pub fn validate_document(doc: &RuleDocument, known_atoms: Option<&[&str]>) -> ValidationResult {
    match doc {
        RuleDocument::Atom(atom) => validate_atom(atom),
        RuleDocument::Composition(comp) => validate_composition(comp, known_atoms),
    }
}

/// Parse raw YAML of any kind and validate. Parse failures are reported as errors.
pub fn validate_yaml(yaml: &str) -> ValidationResult {
    match parse_document(yaml) {
        Ok(doc) => validate_document(&doc, None),
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error("", format!("YAML parse error: {e}"));
            result
        }
    }
}
