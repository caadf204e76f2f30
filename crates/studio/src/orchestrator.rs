//! The generation orchestrator: drives one try-on job from validated inputs
//! to a settled terminal state.
//!
//! Step order is fixed: validate and downscale both images, resolve the
//! provider, render the pinned prompt, create the job, dispatch, then settle.
//! There is no automatic retry; a failed generation is surfaced with
//! user-facing copy and the user decides whether to run again (which creates
//! a new job).

use std::sync::Arc;

use base64::Engine as _;

use espelho_core::error::CoreError;
use espelho_core::generation::{
    parse_data_url, FailureKind, GenerationFailure, GenerationRequest, GenerationResult,
    ImagePayload, DEFAULT_TOP_K, DEFAULT_TOP_P,
};
use espelho_core::image_ops::prepare_for_generation;
use espelho_core::prompt::{build_prompt, LATEST_PROMPT_VERSION};
use espelho_core::storage::FolderKind;
use espelho_core::style::Style;
use espelho_core::types::DbId;
use espelho_db::models::job::{CreateJob, TryOnJob};
use espelho_providers::adapter::{Provider, ProviderConfig, ProviderKind};

use crate::artifacts::ArtifactStore;
use crate::jobs::JobStore;

/// Version tag recorded on every job this pipeline creates.
pub const PIPELINE_VERSION: &str = "tryon-1";

// ---------------------------------------------------------------------------
// Provider registry
// ---------------------------------------------------------------------------

/// Configured provider adapters, keyed by kind. A provider is absent when
/// its API key was not configured at startup.
#[derive(Default)]
pub struct ProviderRegistry {
    gemini: Option<Arc<dyn Provider>>,
    groq: Option<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn Provider>) {
        match kind {
            ProviderKind::Gemini => self.gemini = Some(provider),
            ProviderKind::Groq => self.groq = Some(provider),
        }
    }

    /// Get the adapter for a provider, or an internal error naming the
    /// missing key's environment variable.
    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn Provider>, CoreError> {
        let slot = match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Groq => &self.groq,
        };
        slot.clone().ok_or_else(|| {
            CoreError::Internal(format!(
                "Provider '{}' is not configured: set {}",
                kind.as_str(),
                kind.api_key_env_var()
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// Inputs / outcome
// ---------------------------------------------------------------------------

/// Everything the orchestrator needs to run one generation.
pub struct GenerateInput {
    pub garment_asset_id: DbId,
    pub model_asset_id: DbId,
    /// Seller attribution when the garment came from a storefront.
    pub product_owner_id: Option<DbId>,
    /// Raw garment image bytes as uploaded or fetched from storage.
    pub garment_bytes: Vec<u8>,
    /// Raw person-photo bytes.
    pub model_bytes: Vec<u8>,
    pub style: Style,
    pub instructions: String,
    pub config: ProviderConfig,
    /// Prompt version pin; `None` means latest.
    pub prompt_version: Option<String>,
}

/// The settled job plus the normalized generation result. `result` is `Err`
/// for every non-image outcome, including the informational vision-only
/// capability mismatch.
pub struct GenerateOutcome {
    pub job: TryOnJob,
    pub result: GenerationResult,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    jobs: Arc<dyn JobStore>,
    providers: ProviderRegistry,
    artifacts: Arc<dyn ArtifactStore>,
}

impl Orchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        providers: ProviderRegistry,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            jobs,
            providers,
            artifacts,
        }
    }

    /// Run the full pipeline for one generation.
    ///
    /// Input validation failures return before any job row exists; once the
    /// job is created every outcome settles it (completed or failed).
    pub async fn generate(
        &self,
        owner_id: DbId,
        input: GenerateInput,
    ) -> Result<GenerateOutcome, CoreError> {
        // Validate and downscale before touching the database or the network.
        let garment = prepare_for_generation(&input.garment_bytes)?;
        let model_photo = prepare_for_generation(&input.model_bytes)?;

        input.config.validate()?;
        let provider = self.providers.get(input.config.kind())?;

        let prompt_version = input
            .prompt_version
            .as_deref()
            .unwrap_or(LATEST_PROMPT_VERSION)
            .to_string();
        let prompt = build_prompt(input.style, &prompt_version, &input.instructions);

        let job = self
            .jobs
            .create(
                owner_id,
                &CreateJob {
                    garment_asset_id: input.garment_asset_id,
                    model_asset_id: input.model_asset_id,
                    product_owner_id: input.product_owner_id,
                    style: input.style,
                    instructions: input.instructions.clone(),
                    ai_model: Some(input.config.model().to_string()),
                    prompt_version: Some(prompt_version),
                    pipeline_version: Some(PIPELINE_VERSION.to_string()),
                },
            )
            .await?;

        if !self.jobs.mark_processing(job.id).await? {
            return Err(CoreError::Conflict(format!(
                "Job {} was already dispatched",
                job.id
            )));
        }

        let request = build_generation_request(&input.config, model_photo, garment, prompt);

        tracing::info!(
            job_id = job.id,
            provider = input.config.kind().as_str(),
            model = %request.model,
            "dispatching generation",
        );
        let started = std::time::Instant::now();
        let result = provider.generate(&request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let job = self.settle(owner_id, job.id, &result).await?;

        match &result {
            Ok(_) => tracing::info!(job_id = job.id, elapsed_ms, "generation completed"),
            Err(f) => tracing::warn!(
                job_id = job.id,
                elapsed_ms,
                kind = f.kind.as_str(),
                retriable = f.retriable,
                "generation failed",
            ),
        }

        Ok(GenerateOutcome { job, result })
    }

    /// Resolve the provider for `config` and run one raw generation call.
    /// Used by the key-holding proxy endpoint, which settles client-managed
    /// jobs itself.
    pub async fn dispatch(
        &self,
        config: &ProviderConfig,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, CoreError> {
        config.validate()?;
        let provider = self.providers.get(config.kind())?;
        Ok(provider.generate(request).await)
    }

    /// Settle a job from a generation result and return the updated row.
    ///
    /// Success stores the image as a durable artifact and completes the job;
    /// any failure records user-facing copy. Both paths are safe to repeat.
    pub async fn settle(
        &self,
        owner_id: DbId,
        job_id: DbId,
        result: &GenerationResult,
    ) -> Result<TryOnJob, CoreError> {
        match result {
            Ok(image) => {
                let (mime, data_b64) = parse_data_url(&image.data_url).ok_or_else(|| {
                    CoreError::Internal("Provider returned a malformed data URL".into())
                })?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data_b64)
                    .map_err(|e| {
                        CoreError::Internal(format!("Provider returned invalid base64: {e}"))
                    })?;
                let reference = self
                    .artifacts
                    .put(
                        owner_id,
                        FolderKind::Results,
                        &result_file_name(job_id, mime),
                        &bytes,
                    )
                    .await?;
                self.jobs.complete(job_id, &reference).await?;
            }
            Err(failure) => {
                let message = compose_failure_message(failure);
                self.jobs.fail(job_id, Some(&message)).await?;
            }
        }

        self.jobs
            .find_by_id(job_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "job",
                id: job_id,
            })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Assemble the provider request from the config's sampling parameters.
pub fn build_generation_request(
    config: &ProviderConfig,
    model_image: ImagePayload,
    product_image: ImagePayload,
    prompt: String,
) -> GenerationRequest {
    let (temperature, top_k, top_p) = match config {
        ProviderConfig::Gemini(c) => (c.temperature, c.top_k, c.top_p),
        ProviderConfig::Groq(c) => (c.temperature, DEFAULT_TOP_K, DEFAULT_TOP_P),
    };
    GenerationRequest {
        model_image,
        product_image,
        prompt,
        model: config.model().to_string(),
        temperature,
        top_k,
        top_p,
    }
}

/// Result artifact file name for a job.
fn result_file_name(job_id: DbId, mime: &str) -> String {
    let ext = match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    };
    format!("job-{job_id}.{ext}")
}

/// Turn a normalized failure into the copy recorded on the job and shown to
/// the user. Only this function produces free-text failure copy.
pub fn compose_failure_message(failure: &GenerationFailure) -> String {
    match failure.kind {
        FailureKind::QuotaExceeded => format!(
            "Cota de geração excedida.\n\n{}\n\nNenhuma imagem foi gerada nesta tentativa.",
            failure.message
        ),
        FailureKind::NetworkError => {
            "Não foi possível conectar ao serviço de geração. \
             Verifique sua conexão e tente novamente."
                .to_string()
        }
        FailureKind::ProviderError if failure.retriable => {
            "O serviço de geração está temporariamente indisponível. \
             Tente novamente em instantes."
                .to_string()
        }
        // Block reasons, empty responses, capability mismatches, and
        // non-retriable provider errors already carry their final copy.
        _ => failure.message.clone(),
    }
}
