//! The provider seam: one trait, one validated config union.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use espelho_core::error::CoreError;
use espelho_core::generation::{
    GenerationRequest, GenerationResult, DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P,
};

// ---------------------------------------------------------------------------
// Provider kinds
// ---------------------------------------------------------------------------

/// Known AI providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Gemini multimodal generation (image-capable).
    Gemini,
    /// Groq vision chat (analysis only, cannot generate images).
    Groq,
}

impl ProviderKind {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "gemini" => Ok(Self::Gemini),
            "groq" => Ok(Self::Groq),
            _ => Err(CoreError::Validation(format!(
                "Invalid provider '{s}'. Must be one of: gemini, groq"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
        }
    }

    /// Environment variable holding this provider's server-side API key.
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }
}

// ---------------------------------------------------------------------------
// Config (tagged union, validated at the proxy boundary)
// ---------------------------------------------------------------------------

/// Per-provider generation configuration.
///
/// A discriminated union rather than a loose map: an unknown provider tag or
/// a mistyped field fails deserialization at the proxy boundary instead of
/// being silently ignored downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini(GeminiConfig),
    Groq(GroqConfig),
}

/// Sampling configuration for the Gemini path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_k", rename = "topK")]
    pub top_k: u32,
    #[serde(default = "default_top_p", rename = "topP")]
    pub top_p: f64,
}

/// Configuration for the Groq vision path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Gemini(_) => ProviderKind::Gemini,
            Self::Groq(_) => ProviderKind::Groq,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Gemini(c) => &c.model,
            Self::Groq(c) => &c.model,
        }
    }

    /// Reject obviously unusable configs before any network call.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.model().trim().is_empty() {
            return Err(CoreError::Validation(
                "Provider config requires a non-empty model identifier".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One provider, one contract: a normalized request in, a normalized result
/// or categorized failure out. Implementations never panic on provider
/// misbehavior and never let a raw wire error escape.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_union_parses_gemini_tag() {
        let config: ProviderConfig = serde_json::from_value(json!({
            "provider": "gemini",
            "model": "gemini-2.5-flash-image",
            "temperature": 0.2,
            "topK": 16,
            "topP": 0.9
        }))
        .unwrap();
        assert_eq!(config.kind(), ProviderKind::Gemini);
        assert_eq!(config.model(), "gemini-2.5-flash-image");
    }

    #[test]
    fn config_union_defaults_sampling_params() {
        let config: ProviderConfig = serde_json::from_value(json!({
            "provider": "gemini",
            "model": "gemini-2.5-flash-image"
        }))
        .unwrap();
        match config {
            ProviderConfig::Gemini(c) => {
                assert_eq!(c.top_k, DEFAULT_TOP_K);
                assert_eq!(c.top_p, DEFAULT_TOP_P);
                assert_eq!(c.temperature, DEFAULT_TEMPERATURE);
            }
            _ => panic!("expected gemini config"),
        }
    }

    #[test]
    fn config_union_rejects_unknown_provider() {
        let result: Result<ProviderConfig, _> = serde_json::from_value(json!({
            "provider": "dalle",
            "model": "dall-e-3"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn empty_model_fails_validation() {
        let config = ProviderConfig::Groq(GroqConfig {
            model: "  ".into(),
            temperature: 0.4,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_env_vars() {
        assert_eq!(ProviderKind::Gemini.api_key_env_var(), "GEMINI_API_KEY");
        assert_eq!(ProviderKind::Groq.api_key_env_var(), "GROQ_API_KEY");
    }
}
