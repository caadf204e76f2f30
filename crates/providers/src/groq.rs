//! Adapter for Groq's OpenAI-compatible vision chat API.
//!
//! Groq's vision models can look at the two photos and describe them, but
//! they cannot produce an image. A successful call therefore always
//! normalizes to [`FailureKind::CapabilityMismatch`], carrying whatever
//! analysis text the model returned so the orchestrator can surface it as
//! an informational outcome rather than an error.

use async_trait::async_trait;
use serde_json::{json, Value};

use espelho_core::generation::{
    classify_http_failure, to_data_url, FailureKind, GenerationFailure, GenerationRequest,
    GenerationResult,
};

use crate::adapter::Provider;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Guidance appended to every capability-mismatch message.
const MISMATCH_NOTE: &str =
    "O modelo selecionado analisa imagens mas não gera imagens. \
     Selecione um modelo com capacidade de geração para obter o resultado.";

/// HTTP client for the Groq chat completions endpoint.
pub struct GroqClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl GroqClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url: GROQ_API_URL.to_string(),
        }
    }

    pub fn with_client(client: reqwest::Client, api_key: String, api_url: String) -> Self {
        Self {
            client,
            api_key,
            api_url,
        }
    }
}

/// Build the chat completions body: one user message holding the prompt text
/// and both photos as `image_url` data-URL parts.
pub fn build_request_body(request: &GenerationRequest) -> Value {
    json!({
        "model": request.model,
        "temperature": request.temperature,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": request.prompt },
                {
                    "type": "image_url",
                    "image_url": {
                        "url": to_data_url(
                            &request.product_image.mime_type,
                            &request.product_image.data_b64,
                        )
                    }
                },
                {
                    "type": "image_url",
                    "image_url": {
                        "url": to_data_url(
                            &request.model_image.mime_type,
                            &request.model_image.data_b64,
                        )
                    }
                }
            ]
        }]
    })
}

/// Normalize a 2xx chat completion. There is never an image to return, so
/// this is always a capability mismatch carrying the model's analysis.
pub fn parse_response(body: &Value) -> GenerationResult {
    let analysis = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let message = match analysis {
        Some(text) => format!("{MISMATCH_NOTE}\n\nAnálise do modelo:\n{text}"),
        None => MISMATCH_NOTE.to_string(),
    };

    Err(GenerationFailure::new(
        FailureKind::CapabilityMismatch,
        message,
        false,
    ))
}

fn error_message(body_text: &str) -> String {
    serde_json::from_str::<Value>(body_text)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body_text.to_string())
}

#[async_trait]
impl Provider for GroqClient {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let body = build_request_body(request);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                GenerationFailure::new(
                    FailureKind::NetworkError,
                    format!("Falha de rede ao contatar o provedor: {e}"),
                    true,
                )
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            GenerationFailure::new(
                FailureKind::NetworkError,
                format!("Falha ao ler a resposta do provedor: {e}"),
                true,
            )
        })?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                model = %request.model,
                "Groq call failed",
            );
            return Err(classify_http_failure(
                status.as_u16(),
                &error_message(&text),
                None,
            ));
        }

        let parsed: Value = serde_json::from_str(&text).map_err(|e| {
            GenerationFailure::new(
                FailureKind::ProviderError,
                format!("Resposta inesperada do provedor: {e}"),
                false,
            )
        })?;

        parse_response(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use espelho_core::generation::ImagePayload;

    fn request() -> GenerationRequest {
        GenerationRequest {
            model_image: ImagePayload {
                data_b64: "bW9kZWw=".into(),
                mime_type: "image/jpeg".into(),
            },
            product_image: ImagePayload {
                data_b64: "cHJvZHV0bw==".into(),
                mime_type: "image/png".into(),
            },
            prompt: "describe the fit".into(),
            model: "llama-4-scout".into(),
            temperature: 0.4,
            top_k: 32,
            top_p: 0.95,
        }
    }

    #[test]
    fn body_carries_text_and_both_images_as_data_urls() {
        let body = build_request_body(&request());
        assert_eq!(body["model"], "llama-4-scout");
        let content = body
            .pointer("/messages/0/content")
            .unwrap()
            .as_array()
            .unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["text"], "describe the fit");
        assert_eq!(
            content[1].pointer("/image_url/url").unwrap(),
            "data:image/png;base64,cHJvZHV0bw=="
        );
        assert_eq!(
            content[2].pointer("/image_url/url").unwrap(),
            "data:image/jpeg;base64,bW9kZWw="
        );
    }

    #[test]
    fn successful_chat_is_capability_mismatch_with_analysis() {
        let body = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "A silk dress on a runway." }
            }]
        });
        let failure = parse_response(&body).unwrap_err();
        assert_eq!(failure.kind, FailureKind::CapabilityMismatch);
        assert!(!failure.retriable);
        assert!(failure.message.contains("A silk dress on a runway."));
        assert!(failure.message.contains("não gera imagens"));
    }

    #[test]
    fn empty_chat_is_still_capability_mismatch() {
        let failure = parse_response(&json!({ "choices": [] })).unwrap_err();
        assert_eq!(failure.kind, FailureKind::CapabilityMismatch);
        assert!(failure.message.contains("não gera imagens"));
    }

    #[test]
    fn error_message_reads_openai_error_shape() {
        let text = r#"{"error":{"message":"model not found","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(text), "model not found");
        assert_eq!(error_message("plain failure"), "plain failure");
    }
}
