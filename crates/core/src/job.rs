//! Try-on job status machine and staleness rules.
//!
//! A job moves `queued → processing → {completed | failed}`. Terminal states
//! are immutable except for two deliberate idempotencies: re-completing a
//! completed job overwrites the artifact reference (last-write-wins), and
//! re-failing an already-terminal job is a no-op. Both are required because
//! the staleness sweep and a double-submitted client may race to settle the
//! same job.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a try-on generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Parse a status string from the database.
    ///
    /// Accepts the legacy `"pending"` spelling as a synonym for `Queued`;
    /// historic rows were written with both values interchangeably. The
    /// canonical serialized form is always `"queued"`.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "queued" | "pending" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::Validation(format!(
                "Invalid job status '{s}'. Must be one of: queued, processing, \
                 completed, failed"
            ))),
        }
    }

    /// Convert to the canonical database string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and failed jobs are append-only: a retry creates a new job.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Staleness
// ---------------------------------------------------------------------------

/// A job stuck in `processing` longer than this is treated as failed the
/// next time it is loaded for display.
pub const STALE_JOB_TIMEOUT_MINS: i64 = 10;

/// True if a `processing` job created at `created_at` should be presented as
/// failed. Non-processing jobs are never stale.
pub fn is_stale(status: JobStatus, created_at: Timestamp, now: Timestamp) -> bool {
    status == JobStatus::Processing
        && now - created_at > Duration::minutes(STALE_JOB_TIMEOUT_MINS)
}

/// Error message recorded when the staleness sweep force-fails a job.
pub const STALE_JOB_MESSAGE: &str =
    "Tempo limite de processamento excedido (10 minutos). Tente novamente.";
