//! Handlers for the `/assets` resource.
//!
//! Uploads arrive as base64 payloads, are stored untouched in the artifact
//! store (downscaling happens at generation time, not upload time), and are
//! tracked by a metadata row. Deletion takes an explicit strategy for
//! dependent jobs.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine as _;
use serde::Deserialize;
use uuid::Uuid;

use espelho_core::error::CoreError;
use espelho_core::generation::parse_data_url;
use espelho_core::storage::FolderKind;
use espelho_core::types::DbId;
use espelho_db::models::asset::{
    Asset, AssetKind, AssetListQuery, CreateAsset, DeletionStrategy, UpdateAssetMetadata,
};
use espelho_db::repositories::AssetRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAssetBody {
    pub kind: AssetKind,
    /// Image content, as raw base64 or a full data URL.
    pub image_base64: String,
    #[serde(default)]
    pub name: String,
    /// Mime type; a data URL's own mime wins when both are present.
    pub mime_type: Option<String>,
    pub price_cents: Option<i64>,
}

/// POST /api/v1/assets
///
/// Upload an image and register it. Returns 201 with the created asset.
pub async fn upload_asset(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<UploadAssetBody>,
) -> AppResult<impl IntoResponse> {
    let (mime, b64) = match parse_data_url(body.image_base64.trim()) {
        Some((mime, data)) => (mime.to_string(), data),
        None => (
            body.mime_type
                .clone()
                .unwrap_or_else(|| "image/jpeg".into()),
            body.image_base64.trim(),
        ),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|_| {
            AppError::Core(CoreError::Validation(
                "Imagem inválida: o conteúdo não é base64 válido.".into(),
            ))
        })?;
    if bytes.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Imagem vazia.".into(),
        )));
    }

    let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(&mime));
    let file_path = state
        .artifacts
        .put(auth.user_id, folder_for(body.kind), &file_name, &bytes)
        .await?;

    let asset = AssetRepo::create(
        &state.pool,
        auth.user_id,
        &CreateAsset {
            kind: body.kind,
            file_path,
            mime_type: mime,
            name: body.name,
            price_cents: body.price_cents,
        },
    )
    .await?;

    tracing::info!(
        asset_id = asset.id,
        kind = %asset.kind,
        user_id = auth.user_id,
        "asset uploaded",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

/// GET /api/v1/assets
///
/// List the caller's assets. Supports `kind`, `limit`, and `offset`.
pub async fn list_assets(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AssetListQuery>,
) -> AppResult<impl IntoResponse> {
    let assets = AssetRepo::list_by_owner(&state.pool, auth.user_id, &params).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// GET /api/v1/assets/{id}
///
/// Get a single asset. Published products are visible to everyone.
pub async fn get_asset(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(asset_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let asset = find_asset(&state, asset_id).await?;
    if asset.owner_id != auth.user_id && !asset.published {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot view another user's asset".into(),
        )));
    }
    Ok(Json(DataResponse { data: asset }))
}

// ---------------------------------------------------------------------------
// Update / delete
// ---------------------------------------------------------------------------

/// PATCH /api/v1/assets/{id}
///
/// Patch asset metadata. The stored binary never changes.
pub async fn update_asset(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(asset_id): Path<DbId>,
    Json(patch): Json<UpdateAssetMetadata>,
) -> AppResult<impl IntoResponse> {
    authorize_owner(&state, asset_id, &auth, "update").await?;

    let asset = AssetRepo::update_metadata(&state.pool, asset_id, &patch)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Asset",
            id: asset_id,
        }))?;
    Ok(Json(DataResponse { data: asset }))
}

#[derive(Debug, Deserialize)]
pub struct DeleteAssetQuery {
    /// `keep-history` (default) or `delete-all`.
    pub strategy: Option<DeletionStrategy>,
}

/// DELETE /api/v1/assets/{id}?strategy=keep-history|delete-all
///
/// Delete an asset. `keep-history` (the default) unlinks dependent jobs;
/// `delete-all` removes them. The stored binary is removed best-effort after
/// the database commit.
pub async fn delete_asset(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(asset_id): Path<DbId>,
    Query(query): Query<DeleteAssetQuery>,
) -> AppResult<impl IntoResponse> {
    let asset = authorize_owner(&state, asset_id, &auth, "delete").await?;
    let strategy = query.strategy.unwrap_or(DeletionStrategy::KeepHistory);

    let existed = AssetRepo::delete(&state.pool, asset_id, strategy).await?;
    if !existed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Asset",
            id: asset_id,
        }));
    }

    if let Err(e) = state.artifacts.delete(&asset.file_path).await {
        tracing::warn!(asset_id, error = %e, "asset binary cleanup failed");
    }

    tracing::info!(asset_id, ?strategy, user_id = auth.user_id, "asset deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_asset(state: &AppState, asset_id: DbId) -> AppResult<Asset> {
    AssetRepo::find_by_id(&state.pool, asset_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Asset",
            id: asset_id,
        }))
}

async fn authorize_owner(
    state: &AppState,
    asset_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<Asset> {
    let asset = find_asset(state, asset_id).await?;
    if asset.owner_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's asset"
        ))));
    }
    Ok(asset)
}

fn folder_for(kind: AssetKind) -> FolderKind {
    match kind {
        AssetKind::Product => FolderKind::Products,
        AssetKind::Model => FolderKind::Models,
        AssetKind::Result => FolderKind::Results,
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folders_follow_asset_kind() {
        assert_eq!(folder_for(AssetKind::Product), FolderKind::Products);
        assert_eq!(folder_for(AssetKind::Model), FolderKind::Models);
        assert_eq!(folder_for(AssetKind::Result), FolderKind::Results);
    }

    #[test]
    fn extension_defaults_to_jpg() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("application/pdf"), "jpg");
    }
}
