//! Handlers for the `/jobs` resource.
//!
//! Jobs created here start `queued` and are settled through the proxy; the
//! studio flow creates and settles its own jobs in one request. Every read
//! path runs the staleness sweep: a job stuck in `processing` past the
//! timeout is presented as failed immediately and repaired in the background.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use espelho_core::error::CoreError;
use espelho_core::job::{is_stale, JobStatus, STALE_JOB_MESSAGE};
use espelho_core::types::{DbId, Timestamp};
use espelho_db::models::job::{CreateJob, JobListQuery, TryOnJob};
use espelho_db::repositories::JobRepo;
use espelho_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Staleness sweep
// ---------------------------------------------------------------------------

/// Present a stale `processing` job as failed, in place. Returns `true` when
/// the row was rewritten and needs a persisted repair; once presented, the
/// job is no longer `processing`, so repeat sweeps are no-ops.
fn present_stale(job: &mut TryOnJob, now: Timestamp) -> bool {
    let Ok(status) = JobStatus::from_str_db(&job.status) else {
        return false;
    };
    if !is_stale(status, job.created_at, now) {
        return false;
    }

    job.status = JobStatus::Failed.as_str().to_string();
    job.error_message = Some(STALE_JOB_MESSAGE.to_string());
    true
}

/// Present a stale `processing` job as failed and persist the repair in the
/// background. The response never waits on the write; a lost repair is
/// retried the next time anyone loads the job.
fn sweep_stale(pool: &DbPool, job: &mut TryOnJob) {
    if !present_stale(job, Utc::now()) {
        return;
    }

    let pool = pool.clone();
    let job_id = job.id;
    tokio::spawn(async move {
        match JobRepo::fail(&pool, job_id, Some(STALE_JOB_MESSAGE)).await {
            Ok(true) => tracing::info!(job_id, "stale job repaired"),
            Ok(false) => {} // settled concurrently
            Err(e) => tracing::warn!(job_id, error = %e, "stale job repair failed"),
        }
    });
}

/// Fetch a job by ID and verify the caller owns it.
///
/// Returns `NotFound` if the job does not exist, `Forbidden` if the caller
/// is not the owner. `action` is used in the error message.
async fn find_and_authorize(
    pool: &DbPool,
    job_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<TryOnJob> {
    let job = JobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    if job.owner_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's job"
        ))));
    }

    Ok(job)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/jobs
///
/// Create a job in `queued` status for a client-driven generation flow (the
/// proxy settles it later). Returns 201 with the created job.
pub async fn create_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::create(&state.pool, auth.user_id, &input).await?;

    tracing::info!(
        job_id = job.id,
        style = %job.style,
        user_id = auth.user_id,
        "job created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs
///
/// List the caller's jobs, newest first. Supports optional `status`,
/// `limit`, and `offset` query parameters.
pub async fn list_jobs(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let mut jobs = JobRepo::list_by_owner(&state.pool, auth.user_id, &params).await?;
    for job in &mut jobs {
        sweep_stale(&state.pool, job);
    }
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/jobs/public
///
/// Storefront gallery: jobs their owners marked public. No authentication.
pub async fn list_public_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let mut jobs = JobRepo::list_public(&state.pool, &params).await?;
    for job in &mut jobs {
        sweep_stale(&state.pool, job);
    }
    Ok(Json(DataResponse { data: jobs }))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/jobs/{id}
///
/// Get a single job. Owners see their own jobs; anyone sees public ones.
pub async fn get_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let mut job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;

    if job.owner_id != auth.user_id && !job.is_public {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot view another user's job".into(),
        )));
    }

    sweep_stale(&state.pool, &mut job);
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SetPublicBody {
    pub is_public: bool,
}

/// PATCH /api/v1/jobs/{id}/public
///
/// Toggle storefront visibility of a job's result.
pub async fn set_public(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(body): Json<SetPublicBody>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, job_id, &auth, "publish").await?;
    JobRepo::set_public(&state.pool, job_id, body.is_public).await?;

    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;
    Ok(Json(DataResponse { data: job }))
}

#[derive(Debug, Deserialize)]
pub struct SetFavoriteBody {
    pub favorite: bool,
}

/// PATCH /api/v1/jobs/{id}/favorite
///
/// Toggle the favorite flag on a job.
pub async fn set_favorite(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
    Json(body): Json<SetFavoriteBody>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, job_id, &auth, "favorite").await?;
    JobRepo::set_favorite(&state.pool, job_id, body.favorite).await?;

    let job = JobRepo::find_by_id(&state.pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))?;
    Ok(Json(DataResponse { data: job }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(status: &str, age_mins: i64, now: Timestamp) -> TryOnJob {
        TryOnJob {
            id: 1,
            owner_id: 7,
            garment_asset_id: Some(1),
            model_asset_id: Some(2),
            product_owner_id: None,
            style: "editorial".into(),
            instructions: String::new(),
            status: status.into(),
            result_image: None,
            error_message: None,
            favorite: false,
            is_public: false,
            ai_model: None,
            prompt_version: None,
            pipeline_version: None,
            created_at: now - Duration::minutes(age_mins),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn stale_processing_job_is_presented_as_failed() {
        let now = Utc::now();
        let mut stale = job("processing", 11, now);

        assert!(present_stale(&mut stale, now));
        assert_eq!(stale.status, "failed");
        assert_eq!(stale.error_message.as_deref(), Some(STALE_JOB_MESSAGE));
    }

    #[test]
    fn presentation_requests_exactly_one_repair() {
        let now = Utc::now();
        let mut stale = job("processing", 11, now);

        assert!(present_stale(&mut stale, now));
        // Once failed, repeat sweeps leave the row alone.
        assert!(!present_stale(&mut stale, now));
        assert_eq!(stale.error_message.as_deref(), Some(STALE_JOB_MESSAGE));
    }

    #[test]
    fn fresh_and_terminal_jobs_are_untouched() {
        let now = Utc::now();

        let mut fresh = job("processing", 9, now);
        assert!(!present_stale(&mut fresh, now));
        assert_eq!(fresh.status, "processing");

        for status in ["queued", "completed", "failed"] {
            let mut old = job(status, 120, now);
            assert!(!present_stale(&mut old, now));
            assert_eq!(old.status, status);
            assert!(old.error_message.is_none());
        }
    }
}
