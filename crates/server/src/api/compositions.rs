//! Rule composition endpoints: CRUD and validate-without-saving.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::info;

use kairos_rules::schema::{parse_document, RuleComposition, RuleDocument, RuleKind};
use kairos_rules::validation::{self, ValidationResult};

use crate::state::AppState;

use super::error::{ApiError, ApiErrorBody};
use super::parse_body;

/// Lightweight summary returned by GET /compositions.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CompositionSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub version: String,
    pub enabled: bool,
    pub root_count: usize,
    pub atom_ids: Vec<String>,
    /// Recomputed against the current atom library on every request.
    pub is_valid: bool,
}

fn check(state: &AppState, comp: &RuleComposition) -> ValidationResult {
    let known = state.known_atoms();
    let known: Vec<&str> = known.iter().map(String::as_str).collect();
    validation::validate_composition(comp, Some(known.as_slice()))
}

fn lookup(state: &AppState, id: &str) -> Result<Arc<RuleComposition>, ApiError> {
    state
        .loader
        .catalog()
        .lookup(id)
        .ok_or_else(|| ApiError::not_found("Composition", id))
}

#[utoipa::path(
    get,
    path = "/compositions",
    tag = "Compositions",
    responses(
        (status = 200, description = "Composition summaries", body = Vec<CompositionSummary>)
    )
)]
pub async fn compositions_list(State(state): State<Arc<AppState>>) -> Json<Vec<CompositionSummary>> {
    let summaries = state
        .loader
        .catalog()
        .list()
        .iter()
        .map(|comp| CompositionSummary {
            id: comp.id().to_string(),
            name: comp.metadata.name.clone(),
            description: comp.metadata.description.clone(),
            tags: comp.metadata.tags.clone(),
            version: comp.version.clone(),
            enabled: comp.metadata.enabled,
            root_count: comp.nodes.len(),
            atom_ids: comp.referenced_atom_ids().into_iter().collect(),
            is_valid: check(&state, comp).valid,
        })
        .collect();
    Json(summaries)
}

/// Create a composition from a YAML or JSON body.
///
/// Every referenced atom must already exist.
#[utoipa::path(
    post,
    path = "/compositions",
    tag = "Compositions",
    request_body(content = String, content_type = "application/yaml", description = "RuleComposition document (YAML or JSON)"),
    responses(
        (status = 201, description = "Composition created", body = Object),
        (status = 400, description = "Invalid document", body = ApiErrorBody),
        (status = 409, description = "Composition already exists", body = ApiErrorBody)
    )
)]
pub async fn compositions_create(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, Json<RuleComposition>), ApiError> {
    let comp: RuleComposition = parse_body(&body)?;
    let result = check(&state, &comp);
    if !result.valid {
        return Err(ApiError::invalid(&result));
    }

    state.loader.create_document(&RuleDocument::Composition(comp.clone()))?;
    info!(composition_id = %comp.id(), "composition created");
    Ok((StatusCode::CREATED, Json(comp)))
}

#[utoipa::path(
    get,
    path = "/compositions/{id}",
    tag = "Compositions",
    params(("id" = String, Path, description = "Composition ID")),
    responses(
        (status = 200, description = "Composition", body = Object),
        (status = 404, description = "Composition not found", body = ApiErrorBody)
    )
)]
pub async fn compositions_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RuleComposition>, ApiError> {
    let comp = lookup(&state, &id)?;
    Ok(Json((*comp).clone()))
}

/// Replace a composition. The path id wins over `metadata.id` in the body.
#[utoipa::path(
    put,
    path = "/compositions/{id}",
    tag = "Compositions",
    params(("id" = String, Path, description = "Composition ID")),
    request_body(content = String, content_type = "application/yaml", description = "RuleComposition document (YAML or JSON)"),
    responses(
        (status = 200, description = "Composition updated", body = Object),
        (status = 400, description = "Invalid document", body = ApiErrorBody),
        (status = 404, description = "Composition not found", body = ApiErrorBody)
    )
)]
pub async fn compositions_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<RuleComposition>, ApiError> {
    let mut comp: RuleComposition = parse_body(&body)?;
    comp.metadata.id = id.clone();
    lookup(&state, &id)?;

    let result = check(&state, &comp);
    if !result.valid {
        return Err(ApiError::invalid(&result));
    }

    state.loader.write_document(&RuleDocument::Composition(comp.clone()))?;
    info!(composition_id = %id, version = %comp.version, "composition updated");
    Ok(Json(comp))
}

#[utoipa::path(
    delete,
    path = "/compositions/{id}",
    tag = "Compositions",
    params(("id" = String, Path, description = "Composition ID")),
    responses(
        (status = 204, description = "Composition deleted"),
        (status = 404, description = "Composition not found", body = ApiErrorBody)
    )
)]
pub async fn compositions_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.loader.delete_document(RuleKind::RuleComposition, &id)?;
    state.history.clear(&id);
    Ok(StatusCode::NO_CONTENT)
}

/// Validate any document without saving it.
///
/// Always answers 200; the body says whether the document is valid.
#[utoipa::path(
    post,
    path = "/compositions/validate",
    tag = "Compositions",
    request_body(content = String, content_type = "application/yaml", description = "Atom or composition document (YAML or JSON)"),
    responses(
        (status = 200, description = "Validation report", body = Object)
    )
)]
pub async fn compositions_validate(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Json<ValidationResult> {
    let result = match parse_document(&body) {
        Ok(doc) => {
            let known = state.known_atoms();
            let known: Vec<&str> = known.iter().map(String::as_str).collect();
            validation::validate_document(&doc, Some(known.as_slice()))
        }
        Err(_) => validation::validate_yaml(&body),
    };
    Json(result)
}
