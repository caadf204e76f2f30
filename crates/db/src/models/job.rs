//! Try-on job entity models and DTOs.
//!
//! Status is stored as text; use `espelho_core::job::JobStatus` for every
//! comparison and write so the legacy `pending` spelling stays confined to
//! historic rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use espelho_core::style::Style;
use espelho_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `tryon_jobs` table.
///
/// Invariants enforced by the repository:
/// - `result_image` is set iff `status = 'completed'`.
/// - `error_message` is set iff `status = 'failed'`.
/// - Asset references are only NULL after a keep-history asset deletion.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TryOnJob {
    pub id: DbId,
    pub owner_id: DbId,
    pub garment_asset_id: Option<DbId>,
    pub model_asset_id: Option<DbId>,
    /// Seller attribution when the garment belongs to a storefront owner.
    pub product_owner_id: Option<DbId>,
    pub style: String,
    pub instructions: String,
    pub status: String,
    /// Durable public reference to the generated look.
    pub result_image: Option<String>,
    pub error_message: Option<String>,
    pub favorite: bool,
    pub is_public: bool,
    pub ai_model: Option<String>,
    pub prompt_version: Option<String>,
    pub pipeline_version: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for creating a new job (status starts at `queued`).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJob {
    pub garment_asset_id: DbId,
    pub model_asset_id: DbId,
    pub product_owner_id: Option<DbId>,
    pub style: Style,
    #[serde(default)]
    pub instructions: String,
    pub ai_model: Option<String>,
    pub prompt_version: Option<String>,
    pub pipeline_version: Option<String>,
}

/// Query parameters for listing jobs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListQuery {
    /// Filter by status (canonical spelling).
    pub status: Option<String>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
