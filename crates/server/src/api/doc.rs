//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "kairos API",
        version = "0.1.0",
        description = "Eligibility decisions over YAML-defined atoms and rule compositions.",
    ),
    tags(
        (name = "Health", description = "Server liveness and loaded rule counts"),
        (name = "Decisions", description = "Single and batch eligibility decisions, decision history"),
        (name = "Atoms", description = "Atom library CRUD, enable toggle, and test runs"),
        (name = "Compositions", description = "Rule composition CRUD and validation"),
    ),
    paths(
        // Health
        crate::api::health::health,
        // Decisions
        crate::api::decisions::decide,
        crate::api::decisions::decide_batch,
        crate::api::decisions::decision_history,
        // Atoms
        crate::api::atoms::atoms_list,
        crate::api::atoms::atoms_create,
        crate::api::atoms::atoms_get,
        crate::api::atoms::atoms_update,
        crate::api::atoms::atoms_delete,
        crate::api::atoms::atoms_toggle,
        crate::api::atoms::atoms_test,
        // Compositions
        crate::api::compositions::compositions_list,
        crate::api::compositions::compositions_create,
        crate::api::compositions::compositions_get,
        crate::api::compositions::compositions_update,
        crate::api::compositions::compositions_delete,
        crate::api::compositions::compositions_validate,
    ),
    components(schemas(
        crate::api::error::ApiErrorBody,
        crate::api::health::HealthResponse,
        crate::api::decisions::BatchRequest,
        crate::api::compositions::CompositionSummary,
    ))
)]
pub struct ApiDoc;
