//! Transient generation payloads and the normalized failure taxonomy.
//!
//! Provider adapters translate their wire-specific responses into
//! [`GenerationResult`]; nothing above the adapter boundary ever sees a raw
//! provider error. The orchestrator is the only layer allowed to turn a
//! [`GenerationFailure`] into free-text user-facing copy.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request / result payloads
// ---------------------------------------------------------------------------

/// A base64-encoded image plus its mime type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    pub data_b64: String,
    pub mime_type: String,
}

/// Normalized payload handed to a provider adapter. Not persisted.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The person photo.
    pub model_image: ImagePayload,
    /// The garment photo.
    pub product_image: ImagePayload,
    /// Fully rendered prompt text (see `crate::prompt`).
    pub prompt: String,
    /// Provider-specific model identifier, e.g. `gemini-2.5-flash-image`.
    pub model: String,
    /// Sampling parameters are f64 so they serialize onto the wire exactly
    /// as configured.
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
}

/// Default sampling parameters used when the client does not override them.
pub const DEFAULT_TEMPERATURE: f64 = 0.4;
pub const DEFAULT_TOP_K: u32 = 32;
pub const DEFAULT_TOP_P: f64 = 0.95;

/// A successfully generated image, carried as a `data:` URL.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    /// `data:<mime>;base64,<data>` -- durable enough to hand straight to a client.
    pub data_url: String,
}

/// Uniform adapter outcome: one image, or a categorized failure.
pub type GenerationResult = Result<GeneratedImage, GenerationFailure>;

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// Caller-visible failure categories (spec'd wire-stable codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing/corrupt local input; never reached a provider.
    ValidationError,
    /// Provider quota or rate limit; retriable after a delay.
    QuotaExceeded,
    /// Provider refused on safety grounds; not retriable with same inputs.
    SafetyBlock,
    /// Provider refused citing recitation/copyright.
    CopyrightBlock,
    /// Provider answered but returned no usable image.
    EmptyResponse,
    /// Provider-side 5xx or unexpected response shape.
    ProviderError,
    /// Transport failure before a response was received.
    NetworkError,
    /// The selected provider/model cannot generate images at all.
    CapabilityMismatch,
}

impl FailureKind {
    /// Stable code string used in API payloads and job error records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::QuotaExceeded => "quota_exceeded",
            Self::SafetyBlock => "safety_block",
            Self::CopyrightBlock => "copyright_block",
            Self::EmptyResponse => "empty_response",
            Self::ProviderError => "provider_error",
            Self::NetworkError => "network_error",
            Self::CapabilityMismatch => "capability_mismatch",
        }
    }
}

/// A structured, normalized generation failure.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
    pub retriable: bool,
    /// Provider-supplied metadata (e.g. quota violation details), when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>, retriable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retriable,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Markers in provider error text that indicate quota exhaustion.
const QUOTA_MARKERS: &[&str] = &["quota", "429", "RESOURCE_EXHAUSTED", "rate limit"];

/// True if an HTTP status / message pair looks like a quota error.
pub fn is_quota_error(status: Option<u16>, message: &str) -> bool {
    if status == Some(429) {
        return true;
    }
    QUOTA_MARKERS.iter().any(|m| message.contains(m))
}

/// Which quota situation the provider metadata describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaVariant {
    /// The key has no free-tier allowance at all; retrying will not help
    /// until billing or the provider configuration changes.
    NoFreeTier,
    /// A temporary rate limit; waiting and retrying is enough.
    TemporaryLimit,
}

/// Inspect provider violation metadata to distinguish "zero free-tier quota"
/// from a temporary rate limit. Looks for a `quotaMetric` mentioning
/// `free_tier` anywhere in the details structure.
pub fn quota_variant(details: Option<&serde_json::Value>) -> QuotaVariant {
    fn mentions_free_tier(value: &serde_json::Value) -> bool {
        match value {
            serde_json::Value::Object(map) => map.iter().any(|(k, v)| {
                (k == "quotaMetric" && v.as_str().is_some_and(|s| s.contains("free_tier")))
                    || mentions_free_tier(v)
            }),
            serde_json::Value::Array(items) => items.iter().any(mentions_free_tier),
            _ => false,
        }
    }

    match details {
        Some(v) if mentions_free_tier(v) => QuotaVariant::NoFreeTier,
        _ => QuotaVariant::TemporaryLimit,
    }
}

/// Normalize a provider HTTP failure into the taxonomy.
///
/// - 429 or quota markers in the body: [`FailureKind::QuotaExceeded`], retriable.
/// - 500/503: [`FailureKind::ProviderError`], retriable.
/// - Anything else: [`FailureKind::ProviderError`], not retriable.
///
/// Transport errors (no status at all) are normalized by the adapters
/// directly to [`FailureKind::NetworkError`].
pub fn classify_http_failure(
    status: u16,
    message: &str,
    details: Option<serde_json::Value>,
) -> GenerationFailure {
    if is_quota_error(Some(status), message) {
        let variant = quota_variant(details.as_ref());
        let guidance = match variant {
            QuotaVariant::NoFreeTier => {
                "A chave de API não possui cota gratuita para este modelo. \
                 Ative o faturamento na conta do provedor, troque de provedor \
                 ou configure uma nova chave de API."
            }
            QuotaVariant::TemporaryLimit => {
                "Limite de requisições atingido temporariamente. Aguarde e tente novamente."
            }
        };
        let mut failure =
            GenerationFailure::new(FailureKind::QuotaExceeded, guidance, true);
        if let Some(d) = details {
            failure = failure.with_details(d);
        }
        return failure;
    }

    match status {
        500 | 503 => GenerationFailure::new(
            FailureKind::ProviderError,
            format!("Provider returned {status}: {message}"),
            true,
        ),
        _ => GenerationFailure::new(
            FailureKind::ProviderError,
            format!("Provider returned {status}: {message}"),
            false,
        ),
    }
}

// ---------------------------------------------------------------------------
// Data URLs
// ---------------------------------------------------------------------------

/// Render a `data:<mime>;base64,<data>` URL.
pub fn to_data_url(mime_type: &str, data_b64: &str) -> String {
    format!("data:{mime_type};base64,{data_b64}")
}

/// Split a data URL back into `(mime_type, base64_data)`.
pub fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (mime, data) = rest.split_once(";base64,")?;
    if mime.is_empty() || data.is_empty() {
        return None;
    }
    Some((mime, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- Quota detection --

    #[test]
    fn status_429_is_quota() {
        assert!(is_quota_error(Some(429), ""));
    }

    #[test]
    fn quota_markers_in_message() {
        assert!(is_quota_error(Some(400), "RESOURCE_EXHAUSTED: try later"));
        assert!(is_quota_error(None, "You exceeded your quota"));
        assert!(is_quota_error(None, "rate limit reached"));
        assert!(!is_quota_error(Some(500), "internal error"));
    }

    #[test]
    fn free_tier_metric_selects_no_free_tier_variant() {
        let details = json!({
            "violations": [
                { "quotaMetric": "generativelanguage.googleapis.com/generate_requests_free_tier" }
            ]
        });
        assert_eq!(quota_variant(Some(&details)), QuotaVariant::NoFreeTier);
    }

    #[test]
    fn missing_free_tier_marker_is_temporary() {
        let details = json!({
            "violations": [{ "quotaMetric": "generate_requests_per_minute" }]
        });
        assert_eq!(quota_variant(Some(&details)), QuotaVariant::TemporaryLimit);
        assert_eq!(quota_variant(None), QuotaVariant::TemporaryLimit);
    }

    // -- HTTP classification --

    #[test]
    fn classify_429_retriable_quota() {
        let f = classify_http_failure(429, "too many requests", None);
        assert_eq!(f.kind, FailureKind::QuotaExceeded);
        assert!(f.retriable);
    }

    #[test]
    fn classify_429_free_tier_carries_structural_guidance() {
        let details = json!({ "quotaMetric": "x_free_tier_y" });
        let f = classify_http_failure(429, "", Some(details));
        assert_eq!(f.kind, FailureKind::QuotaExceeded);
        assert!(f.message.contains("cota gratuita"));
        // Structural quota problems carry actionable next steps.
        assert!(f.message.contains("faturamento"));
        assert!(f.message.contains("troque de provedor"));
        assert!(f.details.is_some());
    }

    #[test]
    fn classify_5xx_retriable_provider_error() {
        for status in [500, 503] {
            let f = classify_http_failure(status, "boom", None);
            assert_eq!(f.kind, FailureKind::ProviderError);
            assert!(f.retriable);
        }
    }

    #[test]
    fn classify_other_status_not_retriable() {
        let f = classify_http_failure(403, "forbidden", None);
        assert_eq!(f.kind, FailureKind::ProviderError);
        assert!(!f.retriable);
    }

    // -- Data URLs --

    #[test]
    fn data_url_roundtrip() {
        let url = to_data_url("image/jpeg", "aGVsbG8=");
        assert_eq!(url, "data:image/jpeg;base64,aGVsbG8=");
        let (mime, data) = parse_data_url(&url).unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(data, "aGVsbG8=");
    }

    #[test]
    fn malformed_data_urls_rejected() {
        assert!(parse_data_url("http://example.com/a.jpg").is_none());
        assert!(parse_data_url("data:image/png;base64,").is_none());
        assert!(parse_data_url("data:;base64,abc").is_none());
    }

    #[test]
    fn failure_kind_codes_are_stable() {
        assert_eq!(FailureKind::QuotaExceeded.as_str(), "quota_exceeded");
        assert_eq!(FailureKind::CapabilityMismatch.as_str(), "capability_mismatch");
    }
}
