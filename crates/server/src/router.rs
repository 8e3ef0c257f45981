//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/health", get(api::health))
        // Decisions
        .route("/decisions", post(api::decide))
        .route("/decisions/batch", post(api::decide_batch))
        .route("/decisions/history", get(api::decision_history))
        // Atom library
        .route("/atoms", get(api::atoms_list).post(api::atoms_create))
        .route(
            "/atoms/{id}",
            get(api::atoms_get)
                .put(api::atoms_update)
                .delete(api::atoms_delete),
        )
        .route("/atoms/{id}/toggle", post(api::atoms_toggle))
        .route("/atoms/{id}/test", post(api::atoms_test))
        // Compositions
        .route("/compositions/validate", post(api::compositions_validate))
        .route(
            "/compositions",
            get(api::compositions_list).post(api::compositions_create),
        )
        .route(
            "/compositions/{id}",
            get(api::compositions_get)
                .put(api::compositions_update)
                .delete(api::compositions_delete),
        )
        .layer(cors)
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!("Invalid CORS_ORIGIN '{}': {} — falling back to permissive", origin, e);
            CorsLayer::permissive()
        }
    }
}
