//! Route definitions for the studio (catalog, wizard, generate).
//!
//! All endpoints require authentication.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::handlers::studio;
use crate::state::AppState;

/// Routes mounted at `/studio`.
///
/// ```text
/// GET    /models                   -> list_models
/// GET    /styles                   -> list_styles
/// GET    /wizard                   -> get_wizard
/// DELETE /wizard                   -> clear_wizard
/// PUT    /wizard/garment           -> select_garment
/// PUT    /wizard/model             -> select_model
/// PUT    /wizard/style             -> set_style
/// POST   /wizard/navigate/{step}   -> navigate
/// POST   /generate                 -> generate
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/models", get(studio::list_models))
        .route("/styles", get(studio::list_styles))
        .route("/wizard", get(studio::get_wizard).delete(studio::clear_wizard))
        .route("/wizard/garment", put(studio::select_garment))
        .route("/wizard/model", put(studio::select_model))
        .route("/wizard/style", put(studio::set_style))
        .route("/wizard/navigate/{step}", post(studio::navigate))
        .route("/generate", post(studio::generate))
}
