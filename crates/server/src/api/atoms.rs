//! Atom library endpoints: CRUD, enable toggle, and single-atom test runs.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use kairos_rules::schema::{AtomCategory, EligibilityAtom, RuleDocument, RuleKind};
use kairos_rules::service::AtomTestResult;
use kairos_rules::validation;
use kairos_rules::AtomLookup;

use crate::state::AppState;

use super::error::{ApiError, ApiErrorBody};
use super::parse_body;

/// Query parameters for GET /atoms.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct AtomListParams {
    /// demographic, behavioral, geographic, temporal, predictive or contextual.
    pub category: Option<String>,
    /// Only active (`true`) or only inactive (`false`) atoms.
    pub active: Option<bool>,
}

fn lookup(state: &AppState, id: &str) -> Result<Arc<EligibilityAtom>, ApiError> {
    state
        .loader
        .registry()
        .get(id)
        .map_err(|_| ApiError::not_found("Atom", id))
}

fn validated(atom: &EligibilityAtom) -> Result<(), ApiError> {
    let result = validation::validate_atom(atom);
    if result.valid {
        Ok(())
    } else {
        Err(ApiError::invalid(&result))
    }
}

/// List atoms, sorted by id.
#[utoipa::path(
    get,
    path = "/atoms",
    tag = "Atoms",
    params(AtomListParams),
    responses(
        (status = 200, description = "Atoms", body = Object),
        (status = 400, description = "Unknown category", body = ApiErrorBody)
    )
)]
pub async fn atoms_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AtomListParams>,
) -> Result<Json<Vec<EligibilityAtom>>, ApiError> {
    let category: Option<AtomCategory> = params
        .category
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(ApiError::bad_request)?;

    let atoms = state
        .loader
        .registry()
        .list()
        .into_iter()
        .filter(|a| category.map_or(true, |c| a.category == c))
        .filter(|a| params.active.map_or(true, |active| a.is_active() == active))
        .map(|a| (*a).clone())
        .collect();
    Ok(Json(atoms))
}

/// Create an atom from a YAML or JSON body.
#[utoipa::path(
    post,
    path = "/atoms",
    tag = "Atoms",
    request_body(content = String, content_type = "application/yaml", description = "EligibilityAtom document (YAML or JSON)"),
    responses(
        (status = 201, description = "Atom created", body = Object),
        (status = 400, description = "Invalid document", body = ApiErrorBody),
        (status = 409, description = "Atom already exists", body = ApiErrorBody)
    )
)]
pub async fn atoms_create(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<(StatusCode, Json<EligibilityAtom>), ApiError> {
    let atom: EligibilityAtom = parse_body(&body)?;
    validated(&atom)?;

    state.loader.create_document(&RuleDocument::Atom(atom.clone()))?;
    info!(atom_id = %atom.id(), "atom created");
    Ok((StatusCode::CREATED, Json(atom)))
}

#[utoipa::path(
    get,
    path = "/atoms/{id}",
    tag = "Atoms",
    params(("id" = String, Path, description = "Atom ID")),
    responses(
        (status = 200, description = "Atom", body = Object),
        (status = 404, description = "Atom not found", body = ApiErrorBody)
    )
)]
pub async fn atoms_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EligibilityAtom>, ApiError> {
    let atom = lookup(&state, &id)?;
    Ok(Json((*atom).clone()))
}

/// Replace an atom. The path id wins over `metadata.id` in the body.
#[utoipa::path(
    put,
    path = "/atoms/{id}",
    tag = "Atoms",
    params(("id" = String, Path, description = "Atom ID")),
    request_body(content = String, content_type = "application/yaml", description = "EligibilityAtom document (YAML or JSON)"),
    responses(
        (status = 200, description = "Atom updated", body = Object),
        (status = 400, description = "Invalid document", body = ApiErrorBody),
        (status = 404, description = "Atom not found", body = ApiErrorBody)
    )
)]
pub async fn atoms_update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<EligibilityAtom>, ApiError> {
    let mut atom: EligibilityAtom = parse_body(&body)?;
    atom.metadata.id = id.clone();
    lookup(&state, &id)?;
    validated(&atom)?;

    state.loader.write_document(&RuleDocument::Atom(atom.clone()))?;
    info!(atom_id = %id, version = %atom.version, "atom updated");
    Ok(Json(atom))
}

/// Delete an atom. Refused with 409 while a composition references it.
#[utoipa::path(
    delete,
    path = "/atoms/{id}",
    tag = "Atoms",
    params(("id" = String, Path, description = "Atom ID")),
    responses(
        (status = 204, description = "Atom deleted"),
        (status = 404, description = "Atom not found", body = ApiErrorBody),
        (status = 409, description = "Atom is referenced by compositions", body = ApiErrorBody)
    )
)]
pub async fn atoms_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.loader.delete_document(RuleKind::EligibilityAtom, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Flip an atom's `enabled` flag.
#[utoipa::path(
    post,
    path = "/atoms/{id}/toggle",
    tag = "Atoms",
    params(("id" = String, Path, description = "Atom ID")),
    responses(
        (status = 200, description = "Atom toggled", body = Object),
        (status = 404, description = "Atom not found", body = ApiErrorBody)
    )
)]
pub async fn atoms_toggle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EligibilityAtom>, ApiError> {
    let current = lookup(&state, &id)?;
    let doc = state.loader.set_atom_enabled(&id, !current.is_active())?;
    let atom = doc
        .as_atom()
        .cloned()
        .ok_or_else(|| ApiError::not_found("Atom", &id))?;
    info!(atom_id = %id, enabled = atom.is_active(), "atom toggled");
    Ok(Json(atom))
}

/// Evaluate one atom against a sample subject.
#[utoipa::path(
    post,
    path = "/atoms/{id}/test",
    tag = "Atoms",
    params(("id" = String, Path, description = "Atom ID")),
    request_body(content = Object, description = "Subject record"),
    responses(
        (status = 200, description = "Result, confidence and trace", body = Object),
        (status = 404, description = "Atom not found", body = ApiErrorBody)
    )
)]
pub async fn atoms_test(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(subject): Json<serde_json::Value>,
) -> Result<Json<AtomTestResult>, ApiError> {
    lookup(&state, &id)?;
    let result = state.service.test_atom(&id, &subject)?;
    Ok(Json(result))
}
