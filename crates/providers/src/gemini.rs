//! Adapter for the Gemini multimodal generation API.
//!
//! Builds a `generateContent` request carrying both images inline plus the
//! rendered prompt, with permissive safety thresholds (fashion imagery trips
//! conservative filters constantly, so each harm category blocks only
//! high-severity content). Response parsing is pure and fully normalized
//! into the `GenerationResult` taxonomy.

use async_trait::async_trait;
use serde_json::{json, Value};

use espelho_core::generation::{
    classify_http_failure, to_data_url, FailureKind, GeneratedImage, GenerationFailure,
    GenerationRequest, GenerationResult,
};

use crate::adapter::Provider;

/// Base URL of the Gemini generative language API.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// The four harm categories, each relaxed to block only high-severity content.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const SAFETY_THRESHOLD: &str = "BLOCK_ONLY_HIGH";

/// HTTP client for the Gemini generation endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client with the server-held API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`] and a custom
    /// base URL (connection pooling, local test servers).
    pub fn with_client(client: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self {
            client,
            api_key,
            base_url,
        }
    }
}

// ---------------------------------------------------------------------------
// Request construction
// ---------------------------------------------------------------------------

/// Build the `generateContent` body: garment image, model image, prompt text,
/// sampling config, and the relaxed safety settings.
pub fn build_request_body(request: &GenerationRequest) -> Value {
    let safety_settings: Vec<Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| {
            json!({
                "category": category,
                "threshold": SAFETY_THRESHOLD,
            })
        })
        .collect();

    json!({
        "contents": [{
            "parts": [
                {
                    "inlineData": {
                        "mimeType": request.product_image.mime_type,
                        "data": request.product_image.data_b64,
                    }
                },
                {
                    "inlineData": {
                        "mimeType": request.model_image.mime_type,
                        "data": request.model_image.data_b64,
                    }
                },
                { "text": request.prompt },
            ]
        }],
        "generationConfig": {
            "temperature": request.temperature,
            "topK": request.top_k,
            "topP": request.top_p,
            "responseModalities": ["IMAGE", "TEXT"],
        },
        "safetySettings": safety_settings,
    })
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Normalize a 2xx `generateContent` response.
///
/// - No candidates: map `promptFeedback.blockReason` to a block failure.
/// - First candidate finish reason `SAFETY` / `RECITATION`: block failures.
/// - Otherwise scan parts for the first inline image and return it as a
///   data URL.
/// - No image with a non-`STOP` finish reason: provider error citing it.
/// - Text-only reply: empty-response failure carrying the text.
pub fn parse_response(body: &Value) -> GenerationResult {
    let candidates = body
        .get("candidates")
        .and_then(Value::as_array)
        .filter(|c| !c.is_empty());

    let Some(candidates) = candidates else {
        let reason = body
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str);
        return match reason {
            Some(reason) => Err(GenerationFailure::new(
                FailureKind::SafetyBlock,
                format!("A solicitação foi bloqueada pelo provedor ({reason})."),
                false,
            )),
            None => Err(GenerationFailure::new(
                FailureKind::EmptyResponse,
                "O provedor não retornou nenhum candidato.",
                false,
            )),
        };
    };

    let candidate = &candidates[0];
    let finish_reason = candidate.get("finishReason").and_then(Value::as_str);

    match finish_reason {
        Some("SAFETY") => {
            return Err(GenerationFailure::new(
                FailureKind::SafetyBlock,
                "A geração foi bloqueada pelos filtros de segurança. \
                 Ajuste o estilo, as instruções ou as imagens.",
                false,
            ));
        }
        Some("RECITATION") => {
            return Err(GenerationFailure::new(
                FailureKind::CopyrightBlock,
                "A geração foi bloqueada por semelhança com conteúdo protegido.",
                false,
            ));
        }
        _ => {}
    }

    let parts = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    // First inline image wins.
    for part in parts {
        if let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) {
            let mime = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            if let Some(data) = inline.get("data").and_then(Value::as_str) {
                return Ok(GeneratedImage {
                    data_url: to_data_url(mime, data),
                });
            }
        }
    }

    if let Some(reason) = finish_reason.filter(|r| *r != "STOP") {
        return Err(GenerationFailure::new(
            FailureKind::ProviderError,
            format!("O provedor interrompeu a geração ({reason})."),
            false,
        ));
    }

    // Text-only reply: keep the text for diagnostics.
    let text = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n");
    let message = if text.is_empty() {
        "O provedor respondeu sem nenhuma imagem.".to_string()
    } else {
        format!("O provedor respondeu apenas com texto: {text}")
    };
    Err(GenerationFailure::new(
        FailureKind::EmptyResponse,
        message,
        false,
    ))
}

/// Extract `(message, details)` from a Gemini error body, falling back to the
/// raw text when it is not the documented `{"error": {...}}` shape.
fn error_parts(body_text: &str) -> (String, Option<Value>) {
    match serde_json::from_str::<Value>(body_text) {
        Ok(parsed) => {
            let message = parsed
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or(body_text)
                .to_string();
            let details = parsed.pointer("/error/details").cloned();
            (message, details)
        }
        Err(_) => (body_text.to_string(), None),
    }
}

// ---------------------------------------------------------------------------
// Provider impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Provider for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let url = format!("{}/{}:generateContent", self.base_url, request.model);
        let body = build_request_body(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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
            let (message, details) = error_parts(&text);
            tracing::warn!(
                status = status.as_u16(),
                model = %request.model,
                "Gemini call failed",
            );
            return Err(classify_http_failure(status.as_u16(), &message, details));
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
                mime_type: "image/jpeg".into(),
            },
            prompt: "try-on prompt".into(),
            model: "gemini-2.5-flash-image".into(),
            temperature: 0.4,
            top_k: 32,
            top_p: 0.95,
        }
    }

    // -- Request body --

    #[test]
    fn body_carries_two_images_and_the_prompt() {
        let body = build_request_body(&request());
        let parts = body.pointer("/contents/0/parts").unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[0].pointer("/inlineData/data").unwrap(),
            "cHJvZHV0bw=="
        );
        assert_eq!(parts[1].pointer("/inlineData/data").unwrap(), "bW9kZWw=");
        assert_eq!(parts[2]["text"], "try-on prompt");
    }

    #[test]
    fn body_relaxes_all_four_harm_categories() {
        let body = build_request_body(&request());
        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        for setting in settings {
            assert_eq!(setting["threshold"], "BLOCK_ONLY_HIGH");
        }
    }

    #[test]
    fn body_carries_sampling_config() {
        let body = build_request_body(&request());
        assert_eq!(body.pointer("/generationConfig/temperature").unwrap(), 0.4);
        assert_eq!(body.pointer("/generationConfig/topK").unwrap(), 32);
        assert_eq!(body.pointer("/generationConfig/topP").unwrap(), 0.95);
    }

    // -- Response parsing --

    #[test]
    fn inline_image_part_becomes_data_url() {
        let body = json!({
            "candidates": [{
                "finishReason": "STOP",
                "content": { "parts": [
                    { "text": "here you go" },
                    { "inlineData": { "mimeType": "image/jpeg", "data": "aW1n" } }
                ]}
            }]
        });
        let image = parse_response(&body).unwrap();
        assert_eq!(image.data_url, "data:image/jpeg;base64,aW1n");
    }

    #[test]
    fn no_candidates_with_block_reason_is_safety_block() {
        let body = json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "PROHIBITED_CONTENT" }
        });
        let failure = parse_response(&body).unwrap_err();
        assert_eq!(failure.kind, FailureKind::SafetyBlock);
        assert!(failure.message.contains("PROHIBITED_CONTENT"));
        assert!(!failure.retriable);
    }

    #[test]
    fn safety_finish_reason_is_safety_block() {
        let body = json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        });
        let failure = parse_response(&body).unwrap_err();
        assert_eq!(failure.kind, FailureKind::SafetyBlock);
    }

    #[test]
    fn recitation_finish_reason_is_copyright_block() {
        let body = json!({
            "candidates": [{ "finishReason": "RECITATION" }]
        });
        let failure = parse_response(&body).unwrap_err();
        assert_eq!(failure.kind, FailureKind::CopyrightBlock);
    }

    #[test]
    fn other_finish_reason_without_content_cites_the_reason() {
        let body = json!({
            "candidates": [{ "finishReason": "MAX_TOKENS", "content": { "parts": [] } }]
        });
        let failure = parse_response(&body).unwrap_err();
        assert_eq!(failure.kind, FailureKind::ProviderError);
        assert!(failure.message.contains("MAX_TOKENS"));
    }

    #[test]
    fn text_only_reply_is_empty_response_with_text() {
        let body = json!({
            "candidates": [{
                "finishReason": "STOP",
                "content": { "parts": [{ "text": "I cannot produce that image." }] }
            }]
        });
        let failure = parse_response(&body).unwrap_err();
        assert_eq!(failure.kind, FailureKind::EmptyResponse);
        assert!(failure.message.contains("I cannot produce that image."));
    }

    #[test]
    fn empty_body_is_empty_response() {
        let failure = parse_response(&json!({})).unwrap_err();
        assert_eq!(failure.kind, FailureKind::EmptyResponse);
    }

    // -- Error body extraction --

    #[test]
    fn error_parts_reads_documented_shape() {
        let text = r#"{"error":{"message":"RESOURCE_EXHAUSTED","details":[{"quotaMetric":"x_free_tier"}]}}"#;
        let (message, details) = error_parts(text);
        assert_eq!(message, "RESOURCE_EXHAUSTED");
        assert!(details.unwrap().to_string().contains("free_tier"));
    }

    #[test]
    fn error_parts_falls_back_to_raw_text() {
        let (message, details) = error_parts("plain text error");
        assert_eq!(message, "plain text error");
        assert!(details.is_none());
    }
}
