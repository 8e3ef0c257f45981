//! HTTP surface for the kairos eligibility engine.
//!
//! - `/decisions` single, batch and history
//! - `/atoms` and `/compositions` CRUD backed by the YAML rules directory
//! - `/health` and OpenAPI docs at `/docs`

pub mod api;
pub mod router;
pub mod startup;
pub mod state;

pub use router::build_router;
pub use startup::build_app_state;
pub use state::AppState;
