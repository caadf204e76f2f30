//! Repository for the `tryon_jobs` table.
//!
//! Every status literal comes from `espelho_core::job::JobStatus`; terminal
//! transitions are guarded in SQL so redundant settle calls (double-submit
//! races, staleness repairs from concurrent observers) stay idempotent.

use sqlx::PgPool;

use espelho_core::job::JobStatus;
use espelho_core::types::DbId;

use crate::models::job::{CreateJob, JobListQuery, TryOnJob};

/// Column list for `tryon_jobs` queries.
const COLUMNS: &str = "\
    id, owner_id, garment_asset_id, model_asset_id, product_owner_id, \
    style, instructions, status, result_image, error_message, \
    favorite, is_public, ai_model, prompt_version, pipeline_version, \
    created_at, started_at, completed_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides CRUD operations for try-on jobs.
pub struct JobRepo;

impl JobRepo {
    /// Create a new job in `queued` status. Returns the full row.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        input: &CreateJob,
    ) -> Result<TryOnJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO tryon_jobs \
                 (owner_id, garment_asset_id, model_asset_id, product_owner_id, \
                  style, instructions, status, ai_model, prompt_version, pipeline_version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TryOnJob>(&query)
            .bind(owner_id)
            .bind(input.garment_asset_id)
            .bind(input.model_asset_id)
            .bind(input.product_owner_id)
            .bind(input.style.as_str())
            .bind(&input.instructions)
            .bind(JobStatus::Queued.as_str())
            .bind(&input.ai_model)
            .bind(&input.prompt_version)
            .bind(&input.pipeline_version)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TryOnJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tryon_jobs WHERE id = $1");
        sqlx::query_as::<_, TryOnJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move a queued job to `processing` and stamp `started_at`.
    ///
    /// Returns `false` if the job was not in `queued` (already dispatched or
    /// settled), which callers treat as a conflict.
    pub async fn mark_processing(pool: &PgPool, job_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tryon_jobs \
             SET status = $2, started_at = NOW() \
             WHERE id = $1 AND status IN ($3, $4)",
        )
        .bind(job_id)
        .bind(JobStatus::Processing.as_str())
        .bind(JobStatus::Queued.as_str())
        // Historic rows may still carry the legacy initial-state spelling.
        .bind("pending")
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a job completed with its result artifact reference.
    ///
    /// Idempotent with last-write-wins semantics: completing an
    /// already-completed job overwrites the artifact reference rather than
    /// erroring. Clears `error_message` so the completed/failed field
    /// invariants hold even if a stale repair failed the job first.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        result_image: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tryon_jobs \
             SET status = $2, result_image = $3, error_message = NULL, \
                 completed_at = NOW() \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.as_str())
        .bind(result_image)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job failed with an error message.
    ///
    /// No-op on a job that already reached a terminal state, so the
    /// staleness sweep and a late provider response can both call it safely.
    /// Returns `true` if the row transitioned on this call.
    pub async fn fail(
        pool: &PgPool,
        job_id: DbId,
        message: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tryon_jobs \
             SET status = $2, error_message = COALESCE($3, error_message, 'Falha na geração'), \
                 completed_at = NOW() \
             WHERE id = $1 AND status NOT IN ($4, $5)",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.as_str())
        .bind(message)
        .bind(JobStatus::Completed.as_str())
        .bind(JobStatus::Failed.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Toggle public visibility. Independent of status.
    pub async fn set_public(
        pool: &PgPool,
        job_id: DbId,
        is_public: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tryon_jobs SET is_public = $2 WHERE id = $1")
            .bind(job_id)
            .bind(is_public)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Toggle the favorite flag.
    pub async fn set_favorite(
        pool: &PgPool,
        job_id: DbId,
        favorite: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE tryon_jobs SET favorite = $2 WHERE id = $1")
            .bind(job_id)
            .bind(favorite)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// List jobs for a specific owner with optional status filter and pagination.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
        params: &JobListQuery,
    ) -> Result<Vec<TryOnJob>, sqlx::Error> {
        Self::list_jobs(pool, Some(owner_id), false, params).await
    }

    /// List publicly visible jobs (storefront gallery).
    pub async fn list_public(
        pool: &PgPool,
        params: &JobListQuery,
    ) -> Result<Vec<TryOnJob>, sqlx::Error> {
        Self::list_jobs(pool, None, true, params).await
    }

    /// Shared listing query builder.
    async fn list_jobs(
        pool: &PgPool,
        owner_id: Option<DbId>,
        public_only: bool,
        params: &JobListQuery,
    ) -> Result<Vec<TryOnJob>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if owner_id.is_some() {
            conditions.push(format!("owner_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if public_only {
            conditions.push("is_public = TRUE".to_string());
        }
        if params.status.is_some() {
            conditions.push(format!("status = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM tryon_jobs \
             {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, TryOnJob>(&query);

        if let Some(oid) = owner_id {
            q = q.bind(oid);
        }
        if let Some(ref status) = params.status {
            q = q.bind(status);
        }

        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }
}
