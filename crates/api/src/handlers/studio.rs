//! Handlers for the studio: model catalog, wizard sessions, and the
//! server-driven generation flow.
//!
//! Wizard drafts are keyed by the authenticated user, so an interrupted
//! session resumes on any device.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use espelho_core::error::CoreError;
use espelho_core::generation::FailureKind;
use espelho_core::style::{Style, ALL_STYLES};
use espelho_core::types::DbId;
use espelho_core::wizard::WizardStep;
use espelho_db::models::asset::Asset;
use espelho_db::models::job::TryOnJob;
use espelho_db::repositories::AssetRepo;
use espelho_studio::models::{config_for, resolve_model, AI_MODELS};
use espelho_studio::orchestrator::GenerateInput;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Style applied when neither the request nor the draft selected one.
const DEFAULT_STYLE: Style = Style::Editorial;

fn session_key(auth: &AuthUser) -> String {
    auth.user_id.to_string()
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub provider: &'static str,
    pub can_generate_images: bool,
    pub recommended: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleEntry {
    pub id: &'static str,
    pub label: &'static str,
}

/// GET /api/v1/studio/models -- the selectable model catalog.
pub async fn list_models() -> impl IntoResponse {
    let models: Vec<ModelEntry> = AI_MODELS
        .iter()
        .enumerate()
        .map(|(i, m)| ModelEntry {
            id: m.id,
            label: m.label,
            provider: m.kind.as_str(),
            can_generate_images: m.can_generate_images,
            recommended: i == 0,
        })
        .collect();
    Json(DataResponse { data: models })
}

/// GET /api/v1/studio/styles -- the six wire-stable styles.
pub async fn list_styles() -> impl IntoResponse {
    let styles: Vec<StyleEntry> = ALL_STYLES
        .iter()
        .map(|s| StyleEntry {
            id: s.as_str(),
            label: s.label(),
        })
        .collect();
    Json(DataResponse { data: styles })
}

// ---------------------------------------------------------------------------
// Wizard
// ---------------------------------------------------------------------------

/// GET /api/v1/studio/wizard
///
/// Resume the caller's wizard session on the furthest valid step.
pub async fn get_wizard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let draft = state.wizard.resume(&session_key(&auth)).await?;
    Ok(Json(DataResponse { data: draft }))
}

#[derive(Debug, Deserialize)]
pub struct SelectAssetBody {
    pub asset_id: DbId,
}

/// PUT /api/v1/studio/wizard/garment -- record the step-1 selection.
pub async fn select_garment(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<SelectAssetBody>,
) -> AppResult<impl IntoResponse> {
    // Selection must reference a real, visible garment.
    load_garment(&state, &auth, body.asset_id).await?;
    let draft = state
        .wizard
        .select_garment(&session_key(&auth), body.asset_id)
        .await?;
    Ok(Json(DataResponse { data: draft }))
}

/// PUT /api/v1/studio/wizard/model -- record the step-2 selection.
pub async fn select_model(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<SelectAssetBody>,
) -> AppResult<impl IntoResponse> {
    load_owned_asset(&state, &auth, body.asset_id).await?;
    let draft = state
        .wizard
        .select_model(&session_key(&auth), body.asset_id)
        .await?;
    Ok(Json(DataResponse { data: draft }))
}

#[derive(Debug, Deserialize)]
pub struct StyleBody {
    pub style: Option<Style>,
    #[serde(default)]
    pub instructions: String,
}

/// PUT /api/v1/studio/wizard/style -- record step-3 style and instructions.
pub async fn set_style(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<StyleBody>,
) -> AppResult<impl IntoResponse> {
    let draft = state
        .wizard
        .set_style_and_instructions(&session_key(&auth), body.style, body.instructions)
        .await?;
    Ok(Json(DataResponse { data: draft }))
}

/// POST /api/v1/studio/wizard/navigate/{step}
///
/// Move the session to a step (1-4), enforcing the entry rules.
pub async fn navigate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(step): Path<u8>,
) -> AppResult<impl IntoResponse> {
    let target = WizardStep::from_number(step)?;
    let draft = state.wizard.navigate(&session_key(&auth), target).await?;
    Ok(Json(DataResponse { data: draft }))
}

/// DELETE /api/v1/studio/wizard -- discard the session's draft.
pub async fn clear_wizard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.wizard.clear(&session_key(&auth)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    /// Model override; falls back to the recommended default.
    pub model_id: Option<String>,
    /// Style override; falls back to the draft's saved style.
    pub style: Option<Style>,
    pub instructions: Option<String>,
    pub prompt_version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailurePayload {
    pub code: &'static str,
    pub message: String,
    pub retriable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub job: TryOnJob,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailurePayload>,
}

/// POST /api/v1/studio/generate
///
/// Execute step 4 of the wizard: run the full pipeline against the session's
/// selections. The draft is cleared only when an image was produced, so a
/// failed attempt can be retried without re-selecting anything.
pub async fn generate(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> AppResult<impl IntoResponse> {
    let session = session_key(&auth);
    let draft = state.wizard.load_or_new(&session).await?;

    let (Some(garment_id), Some(model_id)) = (draft.garment_asset_id, draft.model_asset_id)
    else {
        return Err(AppError::Core(CoreError::Validation(
            "Selecione a peça de roupa e a foto da modelo antes de gerar.".into(),
        )));
    };

    let garment = load_garment(&state, &auth, garment_id).await?;
    let model_asset = load_owned_asset(&state, &auth, model_id).await?;

    let garment_bytes = state.artifacts.get(&garment.file_path).await?;
    let model_bytes = state.artifacts.get(&model_asset.file_path).await?;

    // Override > saved preference > recommended default. An explicit
    // override becomes the new preference once it resolves to a real model.
    let prefs = state.wizard.preferences(&session).await?;
    let model = resolve_model(body.model_id.as_deref(), prefs.model_id.as_deref());
    if body.model_id.is_some() {
        state.wizard.remember_model(&session, model.id).await?;
    }
    let config = config_for(model);
    // The draft's style already reflects the saved preference when the user
    // never picked one this session.
    let style = body.style.or(draft.style).unwrap_or(DEFAULT_STYLE);
    let instructions = body
        .instructions
        .clone()
        .unwrap_or_else(|| draft.instructions.clone());

    // Storefront garments keep their seller attribution on the job.
    let product_owner_id = (garment.owner_id != auth.user_id).then_some(garment.owner_id);

    let outcome = state
        .orchestrator
        .generate(
            auth.user_id,
            GenerateInput {
                garment_asset_id: garment_id,
                model_asset_id: model_id,
                product_owner_id,
                garment_bytes,
                model_bytes,
                style,
                instructions,
                config,
                prompt_version: body.prompt_version.clone(),
            },
        )
        .await?;

    if outcome.result.is_ok() {
        state.wizard.clear(&session).await?;
    }

    let response = match outcome.result {
        Ok(image) => GenerateResponse {
            success: true,
            job: outcome.job,
            image: Some(image.data_url),
            failure: None,
        },
        Err(failure) => GenerateResponse {
            success: false,
            // The job carries the composed user-facing copy; the payload
            // adds the stable code and retry hint.
            image: None,
            failure: Some(FailurePayload {
                code: failure.kind.as_str(),
                message: outcome
                    .job
                    .error_message
                    .clone()
                    .unwrap_or(failure.message),
                retriable: failure.retriable && failure.kind != FailureKind::CapabilityMismatch,
            }),
            job: outcome.job,
        },
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load an asset the caller owns.
async fn load_owned_asset(
    state: &AppState,
    auth: &AuthUser,
    asset_id: DbId,
) -> AppResult<Asset> {
    let asset = AssetRepo::find_by_id(&state.pool, asset_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Asset",
            id: asset_id,
        }))?;
    if asset.owner_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot use another user's asset".into(),
        )));
    }
    Ok(asset)
}

/// Load a garment: the caller's own asset, or any published storefront
/// product.
async fn load_garment(state: &AppState, auth: &AuthUser, asset_id: DbId) -> AppResult<Asset> {
    let asset = AssetRepo::find_by_id(&state.pool, asset_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Asset",
            id: asset_id,
        }))?;
    if asset.owner_id != auth.user_id && !asset.published {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot use another user's unpublished asset".into(),
        )));
    }
    Ok(asset)
}
