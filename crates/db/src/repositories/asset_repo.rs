//! Repository for the `assets` table.
//!
//! Binary content is immutable after creation; every update here touches
//! metadata columns only. Deletion takes an explicit strategy because jobs
//! reference assets rather than copying them.

use sqlx::PgPool;

use espelho_core::types::DbId;

use crate::models::asset::{
    Asset, AssetListQuery, CreateAsset, DeletionStrategy, UpdateAssetMetadata,
};

/// Column list for `assets` queries.
const COLUMNS: &str = "\
    id, owner_id, kind, file_path, mime_type, name, \
    price_cents, published, favorite, created_at, updated_at";

/// Maximum page size for asset listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for asset listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations for image assets.
pub struct AssetRepo;

impl AssetRepo {
    /// Register a newly uploaded asset.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        input: &CreateAsset,
    ) -> Result<Asset, sqlx::Error> {
        let query = format!(
            "INSERT INTO assets (owner_id, kind, file_path, mime_type, name, price_cents) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(owner_id)
            .bind(input.kind.as_str())
            .bind(&input.file_path)
            .bind(&input.mime_type)
            .bind(&input.name)
            .bind(input.price_cents)
            .fetch_one(pool)
            .await
    }

    /// Find an asset by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's assets with optional kind filter and pagination.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
        params: &AssetListQuery,
    ) -> Result<Vec<Asset>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        let (filter, has_kind) = match params.kind {
            Some(_) => ("AND kind = $2", true),
            None => ("", false),
        };

        let query = format!(
            "SELECT {COLUMNS} FROM assets \
             WHERE owner_id = $1 {filter} \
             ORDER BY created_at DESC \
             LIMIT ${} OFFSET ${}",
            if has_kind { 3 } else { 2 },
            if has_kind { 4 } else { 3 },
        );

        let mut q = sqlx::query_as::<_, Asset>(&query).bind(owner_id);
        if let Some(ref kind) = params.kind {
            q = q.bind(kind);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Patch asset metadata. The stored binary never changes.
    pub async fn update_metadata(
        pool: &PgPool,
        id: DbId,
        patch: &UpdateAssetMetadata,
    ) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!(
            "UPDATE assets \
             SET name = COALESCE($2, name), \
                 price_cents = COALESCE($3, price_cents), \
                 published = COALESCE($4, published), \
                 favorite = COALESCE($5, favorite), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .bind(&patch.name)
            .bind(patch.price_cents)
            .bind(patch.published)
            .bind(patch.favorite)
            .fetch_optional(pool)
            .await
    }

    /// Delete an asset using the given strategy for dependent jobs.
    ///
    /// - [`DeletionStrategy::KeepHistory`]: dependent jobs survive with the
    ///   asset reference unlinked (set NULL).
    /// - [`DeletionStrategy::DeleteAll`]: dependent jobs are cascade-deleted.
    ///
    /// Runs in a transaction so a failure leaves both tables untouched.
    /// Returns `true` if the asset row existed.
    pub async fn delete(
        pool: &PgPool,
        id: DbId,
        strategy: DeletionStrategy,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        match strategy {
            DeletionStrategy::KeepHistory => {
                sqlx::query(
                    "UPDATE tryon_jobs SET garment_asset_id = NULL WHERE garment_asset_id = $1",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
                sqlx::query(
                    "UPDATE tryon_jobs SET model_asset_id = NULL WHERE model_asset_id = $1",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
            DeletionStrategy::DeleteAll => {
                sqlx::query(
                    "DELETE FROM tryon_jobs \
                     WHERE garment_asset_id = $1 OR model_asset_id = $1",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
