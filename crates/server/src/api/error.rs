//! JSON error body shared by every endpoint: `{ message, code, timestamp }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use kairos_rules::loader::RuleError;
use kairos_rules::validation::ValidationResult;
use kairos_rules::EligibilityError;

/// Error payload returned to clients.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ApiErrorBody {
    pub message: String,
    pub code: String,
    /// RFC 3339.
    pub timestamp: String,
    /// Structured detail, e.g. the `ValidationResult` of a rejected save.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                message: message.into(),
                code: code.to_string(),
                timestamp: Utc::now().to_rfc3339(),
                details: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} '{}' not found", what, id))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// 400 carrying the full validation report.
    pub fn invalid(result: &ValidationResult) -> Self {
        let mut err = Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", result.summary());
        err.body.details = serde_json::to_value(result).ok();
        err
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// HTTP status for each engine error kind.
pub fn status_for(err: &EligibilityError) -> StatusCode {
    match err {
        EligibilityError::CompositionNotFound(_) => StatusCode::NOT_FOUND,
        EligibilityError::AtomNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EligibilityError::CompositionInvalid { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EligibilityError::Validation(_) => StatusCode::BAD_REQUEST,
        EligibilityError::StoreTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        EligibilityError::Store(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<EligibilityError> for ApiError {
    fn from(err: EligibilityError) -> Self {
        let mut api = Self::new(status_for(&err), err.code(), err.to_string());
        if let EligibilityError::CompositionInvalid { errors, .. } = &err {
            api.body.details = serde_json::to_value(errors).ok();
        }
        api
    }
}

impl From<RuleError> for ApiError {
    fn from(err: RuleError) -> Self {
        match &err {
            RuleError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            RuleError::Parse(e) => Self::bad_request(format!("Invalid YAML: {}", e)),
            RuleError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
            RuleError::AlreadyExists { .. } => Self::conflict(err.to_string()),
            RuleError::Referenced { compositions, .. } => {
                let mut api = Self::new(StatusCode::CONFLICT, "ATOM_REFERENCED", err.to_string());
                api.body.details = Some(serde_json::json!({ "compositions": compositions }));
                api
            }
            RuleError::Io(_) | RuleError::Notify(_) => {
                warn!(error = %err, "rules storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", err.to_string())
            }
        }
    }
}
