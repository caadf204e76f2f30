//! The generation proxy endpoint ("revelação" -- the reveal).
//!
//! Provider API keys live only in this process; clients submit their images
//! and receive either the generated look or a normalized failure. The proxy
//! validates inputs before spending any provider quota, and can settle a
//! pre-created job when the client passes its id.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use espelho_core::error::CoreError;
use espelho_core::generation::{parse_data_url, FailureKind, ImagePayload};
use espelho_core::image_ops::prepare_for_generation;
use espelho_core::prompt::{build_prompt, LATEST_PROMPT_VERSION};
use espelho_core::style::Style;
use espelho_core::types::DbId;
use espelho_db::models::job::TryOnJob;
use espelho_db::repositories::JobRepo;
use espelho_providers::adapter::ProviderConfig;
use espelho_studio::models::{config_for, default_model};
use espelho_studio::orchestrator::build_generation_request;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Proxy request body. Field names match the browser client's wire format.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevelacaoRequest {
    /// Garment photo, as raw base64 or a full data URL.
    pub product_base64: Option<String>,
    /// Person photo, as raw base64 or a full data URL.
    pub model_base64: Option<String>,
    /// Fully rendered prompt. When absent, one is built from `style` and
    /// `instructions`.
    pub prompt: Option<String>,
    pub style: Option<Style>,
    #[serde(default)]
    pub instructions: String,
    /// Prompt version pin used when the prompt is built server-side.
    pub prompt_version: Option<String>,
    /// A pre-created job to settle with this generation's outcome.
    pub job_id: Option<DbId>,
    /// Provider/model selection. Defaults to the recommended model.
    pub config: Option<ProviderConfig>,
}

/// Proxy response body. A top-level envelope (`{success, jobId, image}` on
/// success) that clients match on directly.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevelacaoResponse {
    pub success: bool,
    /// Echo of the settled job's id, when `jobId` was passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<DbId>,
    /// Generated image as a data URL, when generation succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Informational message for non-error outcomes (vision-only analysis).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// The settled job, when `jobId` was passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<TryOnJob>,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// POST /api/v1/revelacao
///
/// Run one generation through the server-held provider keys. Vision-only
/// models return 200 with `success: false` and the analysis text; real
/// failures surface as error responses with normalized codes.
pub async fn generate(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RevelacaoRequest>,
) -> AppResult<impl IntoResponse> {
    // Reject before any provider call or job mutation.
    let (product_b64, model_b64) = match (&input.product_base64, &input.model_base64) {
        (Some(p), Some(m)) if !p.trim().is_empty() && !m.trim().is_empty() => (p, m),
        _ => {
            return Err(AppError::BadRequest(
                "Imagens ausentes: envie a foto do produto e a foto da modelo.".into(),
            ));
        }
    };

    let product = prepare_image(product_b64)?;
    let model = prepare_image(model_b64)?;

    let config = input
        .config
        .unwrap_or_else(|| config_for(default_model()));

    let prompt = match (&input.prompt, input.style) {
        (Some(prompt), _) => prompt.clone(),
        (None, Some(style)) => build_prompt(
            style,
            input.prompt_version.as_deref().unwrap_or(LATEST_PROMPT_VERSION),
            &input.instructions,
        ),
        (None, None) => {
            return Err(AppError::BadRequest(
                "Informe um prompt ou um estilo de ensaio.".into(),
            ));
        }
    };

    // A client-managed job must exist and belong to the caller before we
    // agree to settle it.
    if let Some(job_id) = input.job_id {
        let job = JobRepo::find_by_id(&state.pool, job_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id,
            }))?;
        if job.owner_id != auth.user_id {
            return Err(AppError::Core(CoreError::Forbidden(
                "Cannot settle another user's job".into(),
            )));
        }
        // Claim the job for this attempt. A false return means the job is
        // no longer queued; settlement below still applies its guarded
        // semantics, so the attempt proceeds.
        if !JobRepo::mark_processing(&state.pool, job_id).await? {
            tracing::debug!(job_id, "job not queued; settling anyway");
        }
    }

    let request = build_generation_request(&config, model, product, prompt);

    let started = std::time::Instant::now();
    let result = state.orchestrator.dispatch(&config, &request).await?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    tracing::info!(
        user_id = auth.user_id,
        provider = config.kind().as_str(),
        model = %request.model,
        elapsed_ms,
        success = result.is_ok(),
        "proxy generation finished",
    );

    let job = match input.job_id {
        Some(job_id) => Some(
            state
                .orchestrator
                .settle(auth.user_id, job_id, &result)
                .await?,
        ),
        None => None,
    };

    match result {
        Ok(image) => Ok(Json(RevelacaoResponse {
            success: true,
            job_id: input.job_id,
            image: Some(image.data_url),
            message: None,
            code: None,
            job,
        })),
        // Vision-only models are a selectable configuration, not an error:
        // surface the analysis text as an informational outcome.
        Err(failure) if failure.kind == FailureKind::CapabilityMismatch => {
            Ok(Json(RevelacaoResponse {
                success: false,
                job_id: input.job_id,
                image: None,
                message: Some(failure.message),
                code: Some(failure.kind.as_str()),
                job,
            }))
        }
        Err(failure) => Err(AppError::Generation(failure)),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decode a base64 payload (raw or data URL) and downscale it for generation.
fn prepare_image(input: &str) -> AppResult<ImagePayload> {
    let b64 = match parse_data_url(input.trim()) {
        Some((_, data)) => data,
        None => input.trim(),
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|_| {
            AppError::Core(CoreError::Validation(
                "Imagem inválida: o conteúdo não é base64 válido.".into(),
            ))
        })?;
    Ok(prepare_for_generation(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_image_rejects_garbage_base64() {
        assert!(prepare_image("not base64 at all!!!").is_err());
    }

    #[test]
    fn success_envelope_is_top_level_with_job_id() {
        let response = RevelacaoResponse {
            success: true,
            job_id: Some(42),
            image: Some("data:image/jpeg;base64,aW1n".into()),
            message: None,
            code: None,
            job: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["jobId"], 42);
        assert_eq!(json["image"], "data:image/jpeg;base64,aW1n");
        // No wrapper object and no null placeholder fields.
        assert!(json.get("data").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn request_parses_camel_case_wire_format() {
        let input: RevelacaoRequest = serde_json::from_value(serde_json::json!({
            "productBase64": "aW1n",
            "modelBase64": "aW1n",
            "style": "editorial",
            "jobId": 42,
            "config": { "provider": "gemini", "model": "gemini-2.5-flash-image" }
        }))
        .unwrap();
        assert_eq!(input.job_id, Some(42));
        assert_eq!(input.style, Some(Style::Editorial));
        assert!(input.config.is_some());
    }
}
