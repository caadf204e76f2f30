use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use espelho_core::error::CoreError;
use espelho_core::generation::{FailureKind, GenerationFailure};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `espelho_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A normalized generation failure surfaced as an HTTP error (proxy path).
    #[error("Generation failed: {}", .0.message)]
    Generation(GenerationFailure),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Generation(failure) = &self {
            return generation_failure_response(failure);
        }

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            AppError::Generation(_) => unreachable!("handled above"),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a normalized generation failure to an HTTP response.
///
/// Failure messages are already user-facing copy, so they travel as-is
/// (unlike raw internal errors, which are sanitized).
///
/// Quota responses have a pinned wire shape that existing clients match on:
/// `{error: "QUOTA_EXCEEDED", message, details?}`, with the copy in
/// `message` and the provider's violation metadata in `details`.
fn generation_failure_response(failure: &GenerationFailure) -> Response {
    let (status, code) = match failure.kind {
        FailureKind::ValidationError => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        FailureKind::QuotaExceeded => (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXCEEDED"),
        FailureKind::SafetyBlock => (StatusCode::BAD_REQUEST, "SAFETY_BLOCK"),
        FailureKind::CopyrightBlock => (StatusCode::BAD_REQUEST, "COPYRIGHT_BLOCK"),
        FailureKind::EmptyResponse => (StatusCode::BAD_GATEWAY, "EMPTY_RESPONSE"),
        FailureKind::ProviderError => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
        FailureKind::NetworkError => (StatusCode::BAD_GATEWAY, "NETWORK_ERROR"),
        FailureKind::CapabilityMismatch => (StatusCode::BAD_REQUEST, "CAPABILITY_MISMATCH"),
    };

    let mut body = if failure.kind == FailureKind::QuotaExceeded {
        json!({
            "error": code,
            "message": failure.message,
            "retriable": failure.retriable,
        })
    } else {
        json!({
            "error": failure.message,
            "code": code,
            "retriable": failure.retriable,
        })
    };
    if let Some(details) = &failure.details {
        body["details"] = details.clone();
    }

    (status, axum::Json(body)).into_response()
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Foreign key violations (code 23503) map to 400: the client referenced
///   an asset or job that no longer exists.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23503") {
                return (
                    StatusCode::BAD_REQUEST,
                    "INVALID_REFERENCE",
                    "A referenced resource does not exist".to_string(),
                );
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
