//! Route definitions for the generation proxy.

use axum::routing::post;
use axum::Router;

use crate::handlers::revelacao;
use crate::state::AppState;

/// Routes mounted at `/revelacao`.
///
/// ```text
/// POST   /    -> generate
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(revelacao::generate))
}
