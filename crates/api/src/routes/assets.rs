//! Route definitions for the `/assets` resource.
//!
//! All endpoints require authentication.

use axum::routing::get;
use axum::Router;

use crate::handlers::assets;
use crate::state::AppState;

/// Routes mounted at `/assets`.
///
/// ```text
/// GET    /        -> list_assets
/// POST   /        -> upload_asset
/// GET    /{id}    -> get_asset
/// PATCH  /{id}    -> update_asset
/// DELETE /{id}    -> delete_asset
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(assets::list_assets).post(assets::upload_asset))
        .route(
            "/{id}",
            get(assets::get_asset)
                .patch(assets::update_asset)
                .delete(assets::delete_asset),
        )
}
