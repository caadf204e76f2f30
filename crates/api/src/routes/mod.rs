pub mod assets;
pub mod health;
pub mod jobs;
pub mod revelacao;
pub mod studio;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /revelacao                       POST  key-holding generation proxy
///
/// /studio/models                   GET   selectable model catalog
/// /studio/styles                   GET   the six try-on styles
/// /studio/wizard                   GET   resume session, DELETE discard
/// /studio/wizard/garment           PUT   step-1 selection
/// /studio/wizard/model             PUT   step-2 selection
/// /studio/wizard/style             PUT   step-3 style + instructions
/// /studio/wizard/navigate/{step}   POST  step navigation
/// /studio/generate                 POST  execute the pipeline
///
/// /jobs                            POST  create a queued job
/// /jobs                            GET   caller's jobs
/// /jobs/public                     GET   storefront gallery (no auth)
/// /jobs/{id}                       GET   single job
/// /jobs/{id}/public                PATCH storefront visibility
/// /jobs/{id}/favorite              PATCH favorite flag
///
/// /assets                          GET, POST
/// /assets/{id}                     GET, PATCH, DELETE
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/revelacao", revelacao::router())
        .nest("/studio", studio::router())
        .nest("/jobs", jobs::router())
        .nest("/assets", assets::router())
}
