//! Route definitions for the `/jobs` resource.
//!
//! `/public` is the only unauthenticated endpoint.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST   /                -> create_job
/// GET    /                -> list_jobs
/// GET    /public          -> list_public_jobs
/// GET    /{id}            -> get_job
/// PATCH  /{id}/public     -> set_public
/// PATCH  /{id}/favorite   -> set_favorite
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(jobs::create_job).get(jobs::list_jobs))
        .route("/public", get(jobs::list_public_jobs))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/public", patch(jobs::set_public))
        .route("/{id}/favorite", patch(jobs::set_favorite))
}
