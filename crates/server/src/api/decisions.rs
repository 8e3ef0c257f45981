//! Decision endpoints: single, batch, and history.
//!
//! Every decision returned to a caller is recorded in the in-memory history.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use kairos_rules::history::{DecisionRecord, HistoryQuery};
use kairos_rules::{Decision, DecisionRequest};

use crate::state::AppState;

use super::error::{ApiError, ApiErrorBody};

/// Body of `POST /decisions/batch`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BatchRequest {
    #[schema(value_type = Vec<Object>)]
    pub requests: Vec<DecisionRequest>,
}

/// One batch slot: the decision, or why that item failed.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Decision(Decision),
    Error { error: ApiErrorBody },
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

/// Decide eligibility for one customer.
#[utoipa::path(
    post,
    path = "/decisions",
    tag = "Decisions",
    request_body(content = Object, description = "DecisionRequest: customerId, context, compositionId | momentId | campaignId | eligibilityAtoms"),
    responses(
        (status = 200, description = "Decision with reasoning trace", body = Object),
        (status = 400, description = "Malformed request", body = ApiErrorBody),
        (status = 404, description = "Composition not found", body = ApiErrorBody),
        (status = 422, description = "Unknown atom or invalid composition", body = ApiErrorBody),
        (status = 504, description = "Composition store timed out", body = ApiErrorBody)
    )
)]
pub async fn decide(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<Decision>, ApiError> {
    let request = json_body(body)?;
    let decision = state.service.decide(&request).await?;
    state.history.record(&decision);
    Ok(Json(decision))
}

/// Decide for many requests; each item succeeds or fails on its own.
#[utoipa::path(
    post,
    path = "/decisions/batch",
    tag = "Decisions",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "One item per request, in order", body = Object),
        (status = 400, description = "Malformed body or batch too large", body = ApiErrorBody)
    )
)]
pub async fn decide_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<Vec<BatchItem>>, ApiError> {
    let batch = json_body(body)?;
    let results = state.service.decide_batch(&batch.requests).await?;

    let items = results
        .into_iter()
        .map(|result| match result {
            Ok(decision) => {
                state.history.record(&decision);
                BatchItem::Decision(decision)
            }
            Err(e) => BatchItem::Error {
                error: ApiError::from(e).body,
            },
        })
        .collect::<Vec<_>>();
    debug!(items = items.len(), "batch response assembled");
    Ok(Json(items))
}

/// Recent decisions, newest first.
#[utoipa::path(
    get,
    path = "/decisions/history",
    tag = "Decisions",
    params(
        ("composition_id" = Option<String>, Query, description = "Only this composition"),
        ("eligible" = Option<bool>, Query, description = "Only eligible / ineligible decisions"),
        ("since" = Option<String>, Query, description = "RFC 3339 lower bound on timestamp"),
        ("limit" = Option<u32>, Query, description = "Maximum records (default 100)")
    ),
    responses(
        (status = 200, description = "Decision records", body = Object),
        (status = 400, description = "`since` is not an RFC 3339 timestamp", body = ApiErrorBody)
    )
)]
pub async fn decision_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<DecisionRecord>>, ApiError> {
    let records = state.history.query(&params).map_err(|e| {
        ApiError::bad_request(format!(
            "Invalid since '{}': {}",
            params.since.as_deref().unwrap_or_default(),
            e
        ))
    })?;
    Ok(Json(records))
}
