//! Tests for `AppError` → HTTP response mapping.
//!
//! These tests verify that each `AppError` variant produces the correct HTTP
//! status code, error code, and message. They do NOT need an HTTP server --
//! they call `IntoResponse` directly on `AppError` values.

use axum::response::IntoResponse;
use http_body_util::BodyExt;

use espelho_api::error::AppError;
use espelho_core::error::CoreError;
use espelho_core::generation::{FailureKind, GenerationFailure};

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (axum::http::StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::NotFound maps to 404 with NOT_FOUND code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Job",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Job with id 42 not found");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Validation maps to 400 with VALIDATION_ERROR code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("Imagem vazia.".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Imagem vazia.");
}

// ---------------------------------------------------------------------------
// Test: AppError::BadRequest maps to 400 with BAD_REQUEST code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("Imagens ausentes".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "Imagens ausentes");
}

// ---------------------------------------------------------------------------
// Test: CoreError::Forbidden maps to 403 with FORBIDDEN code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn forbidden_error_returns_403() {
    let err = AppError::Core(CoreError::Forbidden(
        "Cannot view another user's job".into(),
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
}

// ---------------------------------------------------------------------------
// Test: AppError::InternalError maps to 500 and sanitizes the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::InternalError("secret database credentials leaked".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");

    // The response body must NOT contain the original error details.
    let body_text = json.to_string();
    assert!(
        !body_text.contains("secret"),
        "Internal error response must not leak sensitive details"
    );
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: quota failures map to 429 with the pinned wire envelope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quota_failure_returns_429_with_pinned_envelope() {
    let failure = GenerationFailure::new(
        FailureKind::QuotaExceeded,
        "Limite de requisições atingido temporariamente.",
        true,
    )
    .with_details(serde_json::json!({ "quotaMetric": "generate_requests_free_tier" }));

    let (status, json) = error_to_response(AppError::Generation(failure)).await;

    assert_eq!(status, axum::http::StatusCode::TOO_MANY_REQUESTS);
    // Clients match on `error` being the stable code; the copy travels in
    // `message` and the provider metadata in `details`.
    assert_eq!(json["error"], "QUOTA_EXCEEDED");
    assert_eq!(
        json["message"],
        "Limite de requisições atingido temporariamente."
    );
    assert_eq!(json["retriable"], true);
    assert_eq!(json["details"]["quotaMetric"], "generate_requests_free_tier");
}

// ---------------------------------------------------------------------------
// Test: safety blocks map to 400 and keep their user-facing copy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn safety_block_returns_400_with_copy() {
    let failure = GenerationFailure::new(
        FailureKind::SafetyBlock,
        "A geração foi bloqueada pelos filtros de segurança.",
        false,
    );

    let (status, json) = error_to_response(AppError::Generation(failure)).await;

    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "SAFETY_BLOCK");
    assert_eq!(json["retriable"], false);
    assert_eq!(
        json["error"],
        "A geração foi bloqueada pelos filtros de segurança."
    );
}

// ---------------------------------------------------------------------------
// Test: provider/network failures map to 502
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provider_and_network_failures_return_502() {
    for (kind, code) in [
        (FailureKind::ProviderError, "PROVIDER_ERROR"),
        (FailureKind::NetworkError, "NETWORK_ERROR"),
        (FailureKind::EmptyResponse, "EMPTY_RESPONSE"),
    ] {
        let failure = GenerationFailure::new(kind, "mensagem", true);
        let (status, json) = error_to_response(AppError::Generation(failure)).await;

        assert_eq!(status, axum::http::StatusCode::BAD_GATEWAY);
        assert_eq!(json["code"], code);
    }
}

// ---------------------------------------------------------------------------
// Test: sqlx RowNotFound maps to 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sqlx_row_not_found_returns_404() {
    let err = AppError::Database(sqlx::Error::RowNotFound);

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}
