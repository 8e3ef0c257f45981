//! Error taxonomy for eligibility decisions.

use crate::validation::ValidationIssue;

/// Failures that abort a single decision.
///
/// Sparse subject data and inactive atoms are not errors: they evaluate to
/// `false` with an explanatory trace entry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EligibilityError {
    /// A composition references an atom id the registry does not hold.
    #[error("atom not found: {0}")]
    AtomNotFound(String),

    #[error("composition not found: {0}")]
    CompositionNotFound(String),

    /// The composition failed structural validation before evaluation.
    #[error("composition '{id}' is invalid: {}", summarize(errors))]
    CompositionInvalid {
        id: String,
        errors: Vec<ValidationIssue>,
    },

    /// Malformed request, atom parameters or rule shape.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("composition store timed out after {0}ms")]
    StoreTimeout(u64),

    #[error("composition store error: {0}")]
    Store(String),
}

impl EligibilityError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            EligibilityError::AtomNotFound(_) => "ATOM_NOT_FOUND",
            EligibilityError::CompositionNotFound(_) => "COMPOSITION_NOT_FOUND",
            EligibilityError::CompositionInvalid { .. } => "COMPOSITION_INVALID",
            EligibilityError::Validation(_) => "VALIDATION_ERROR",
            EligibilityError::StoreTimeout(_) => "STORE_TIMEOUT",
            EligibilityError::Store(_) => "STORE_ERROR",
        }
    }
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, EligibilityError>;
