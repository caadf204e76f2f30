//! Job persistence seam for the orchestrator.
//!
//! The orchestrator settles jobs through this trait rather than a concrete
//! pool, mirroring the `Provider` and `ArtifactStore` seams. The Postgres
//! implementation delegates to `JobRepo`, keeping the SQL transition guards
//! as the enforcement point.

use async_trait::async_trait;

use espelho_core::error::CoreError;
use espelho_core::types::DbId;
use espelho_db::models::job::{CreateJob, TryOnJob};
use espelho_db::repositories::JobRepo;
use espelho_db::DbPool;

/// Persistence operations the generation pipeline needs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job in `queued` status and return the full row.
    async fn create(&self, owner_id: DbId, input: &CreateJob) -> Result<TryOnJob, CoreError>;

    /// Move a queued job to `processing`. Returns `false` if it was not
    /// queued (already dispatched or settled).
    async fn mark_processing(&self, job_id: DbId) -> Result<bool, CoreError>;

    /// Complete a job with its artifact reference. Last-write-wins; clears
    /// any recorded error message.
    async fn complete(&self, job_id: DbId, result_image: &str) -> Result<(), CoreError>;

    /// Fail a job with a message. No-op on a terminal job; returns `true`
    /// if the row transitioned on this call.
    async fn fail(&self, job_id: DbId, message: Option<&str>) -> Result<bool, CoreError>;

    async fn find_by_id(&self, job_id: DbId) -> Result<Option<TryOnJob>, CoreError>;
}

/// Postgres-backed job store.
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, owner_id: DbId, input: &CreateJob) -> Result<TryOnJob, CoreError> {
        JobRepo::create(&self.pool, owner_id, input)
            .await
            .map_err(db_err)
    }

    async fn mark_processing(&self, job_id: DbId) -> Result<bool, CoreError> {
        JobRepo::mark_processing(&self.pool, job_id)
            .await
            .map_err(db_err)
    }

    async fn complete(&self, job_id: DbId, result_image: &str) -> Result<(), CoreError> {
        JobRepo::complete(&self.pool, job_id, result_image)
            .await
            .map_err(db_err)
    }

    async fn fail(&self, job_id: DbId, message: Option<&str>) -> Result<bool, CoreError> {
        JobRepo::fail(&self.pool, job_id, message)
            .await
            .map_err(db_err)
    }

    async fn find_by_id(&self, job_id: DbId) -> Result<Option<TryOnJob>, CoreError> {
        JobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(db_err)
    }
}

fn db_err(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("Database error: {e}"))
}
