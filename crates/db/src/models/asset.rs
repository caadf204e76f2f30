//! Asset entity models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use espelho_core::error::CoreError;
use espelho_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// What an asset image depicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// A garment product photo (may carry price/published flags).
    Product,
    /// A human model photo.
    Model,
    /// A generated try-on result.
    Result,
}

impl AssetKind {
    /// Parse a kind string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "product" => Ok(Self::Product),
            "model" => Ok(Self::Model),
            "result" => Ok(Self::Result),
            _ => Err(CoreError::Validation(format!(
                "Invalid asset kind '{s}'. Must be one of: product, model, result"
            ))),
        }
    }

    /// Convert to the database string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Model => "model",
            Self::Result => "result",
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `assets` table.
///
/// The binary at `file_path` is immutable after creation; only metadata
/// (name, price, published, favorite) mutates.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    pub id: DbId,
    pub owner_id: DbId,
    pub kind: String,
    /// Durable public reference into the artifact store.
    pub file_path: String,
    pub mime_type: String,
    pub name: String,
    /// Product price in cents (product assets only).
    pub price_cents: Option<i64>,
    /// Whether a product asset is visible on the storefront.
    pub published: bool,
    pub favorite: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Input for registering a newly uploaded asset.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAsset {
    pub kind: AssetKind,
    pub file_path: String,
    pub mime_type: String,
    pub name: String,
    pub price_cents: Option<i64>,
}

/// Metadata patch for an existing asset. Binary content never changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAssetMetadata {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub published: Option<bool>,
    pub favorite: Option<bool>,
}

/// Query parameters for listing assets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetListQuery {
    /// Filter by kind (`product`, `model`, `result`).
    pub kind: Option<String>,
    /// Maximum results (default 50, max 100).
    pub limit: Option<i64>,
    /// Offset for pagination.
    pub offset: Option<i64>,
}

/// What happens to jobs referencing an asset when it is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletionStrategy {
    /// Unlink the asset from dependent jobs but preserve their history.
    KeepHistory,
    /// Cascade-delete every dependent job.
    DeleteAll,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrip() {
        for kind in [AssetKind::Product, AssetKind::Model, AssetKind::Result] {
            assert_eq!(AssetKind::from_str_db(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(AssetKind::from_str_db("banner").is_err());
    }

    #[test]
    fn deletion_strategy_parses_kebab_case() {
        let s: DeletionStrategy = serde_json::from_str("\"keep-history\"").unwrap();
        assert_eq!(s, DeletionStrategy::KeepHistory);
        let s: DeletionStrategy = serde_json::from_str("\"delete-all\"").unwrap();
        assert_eq!(s, DeletionStrategy::DeleteAll);
    }
}
