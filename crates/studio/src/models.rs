//! Catalog of selectable AI models and the selection precedence rules.

use espelho_providers::adapter::{GeminiConfig, GroqConfig, ProviderConfig, ProviderKind};

/// A selectable model in the studio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiModel {
    /// Provider-specific model identifier, sent on the wire as-is.
    pub id: &'static str,
    pub kind: ProviderKind,
    /// Human-readable label shown in the model picker.
    pub label: &'static str,
    /// Whether the model can produce images. Vision-only models can still be
    /// selected; the pipeline surfaces their analysis instead of a result.
    pub can_generate_images: bool,
}

/// Every model the studio offers. The first entry is the recommended default.
pub const AI_MODELS: &[AiModel] = &[
    AiModel {
        id: "gemini-2.5-flash-image",
        kind: ProviderKind::Gemini,
        label: "Gemini 2.5 Flash Image",
        can_generate_images: true,
    },
    AiModel {
        id: "gemini-2.0-flash-exp",
        kind: ProviderKind::Gemini,
        label: "Gemini 2.0 Flash (experimental)",
        can_generate_images: true,
    },
    AiModel {
        id: "meta-llama/llama-4-scout-17b-16e-instruct",
        kind: ProviderKind::Groq,
        label: "Llama 4 Scout (análise)",
        can_generate_images: false,
    },
];

/// The recommended default model.
pub fn default_model() -> &'static AiModel {
    &AI_MODELS[0]
}

/// Look up a catalog entry by its wire identifier.
pub fn find_model(id: &str) -> Option<&'static AiModel> {
    AI_MODELS.iter().find(|m| m.id == id)
}

/// Resolve which model to use for a generation.
///
/// Precedence: an explicit per-request override, then the user's saved
/// preference, then the recommended default. Identifiers no longer in the
/// catalog (a removed experimental model in a stale preference) fall through
/// to the next source rather than erroring.
pub fn resolve_model(requested: Option<&str>, saved: Option<&str>) -> &'static AiModel {
    for source in [requested, saved] {
        if let Some(id) = source {
            match find_model(id) {
                Some(model) => return model,
                None => {
                    tracing::warn!(model = id, "unknown model identifier, falling through");
                }
            }
        }
    }
    default_model()
}

/// Default provider config for a catalog model.
pub fn config_for(model: &AiModel) -> ProviderConfig {
    match model.kind {
        ProviderKind::Gemini => ProviderConfig::Gemini(GeminiConfig {
            model: model.id.to_string(),
            temperature: espelho_core::generation::DEFAULT_TEMPERATURE,
            top_k: espelho_core::generation::DEFAULT_TOP_K,
            top_p: espelho_core::generation::DEFAULT_TOP_P,
        }),
        ProviderKind::Groq => ProviderConfig::Groq(GroqConfig {
            model: model.id.to_string(),
            temperature: espelho_core::generation::DEFAULT_TEMPERATURE,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_generates_images() {
        assert!(default_model().can_generate_images);
        assert_eq!(default_model().kind, ProviderKind::Gemini);
    }

    #[test]
    fn override_beats_saved_preference() {
        let model = resolve_model(
            Some("meta-llama/llama-4-scout-17b-16e-instruct"),
            Some("gemini-2.5-flash-image"),
        );
        assert_eq!(model.kind, ProviderKind::Groq);
    }

    #[test]
    fn saved_preference_beats_default() {
        let model = resolve_model(None, Some("gemini-2.0-flash-exp"));
        assert_eq!(model.id, "gemini-2.0-flash-exp");
    }

    #[test]
    fn unknown_identifiers_fall_through() {
        let model = resolve_model(Some("dall-e-3"), Some("also-unknown"));
        assert_eq!(model.id, default_model().id);

        let model = resolve_model(Some("retired-model"), Some("gemini-2.0-flash-exp"));
        assert_eq!(model.id, "gemini-2.0-flash-exp");
    }

    #[test]
    fn config_for_carries_the_model_id() {
        let model = find_model("gemini-2.5-flash-image").unwrap();
        let config = config_for(model);
        assert_eq!(config.model(), "gemini-2.5-flash-image");
        assert!(config.validate().is_ok());
    }
}
