// crates/server/src/jobs/query.rs
//! Owner-scoped reads and deletion of job records.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use transcribe_core::{Job, JobId, JobView, OwnerId, PageRequest, Pagination};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// One page of an owner's jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPage {
    pub jobs: Vec<JobView>,
    pub pagination: Pagination,
}

/// Fetch a job and check that `owner_id` owns it.
///
/// A job owned by someone else is `Forbidden`, not `JobNotFound`.
pub async fn get_owned_job(state: &AppState, job_id: JobId, owner_id: OwnerId) -> ApiResult<Job> {
    let job = state
        .db
        .get_job(job_id)
        .await?
        .ok_or_else(|| ApiError::JobNotFound(job_id.to_string()))?;

    if !job.is_owned_by(owner_id) {
        warn!(job_id = %job_id, owner_id, "access to another owner's job denied");
        return Err(ApiError::Forbidden);
    }
    Ok(job)
}

pub async fn list_jobs(state: &AppState, owner_id: OwnerId, page: PageRequest) -> ApiResult<JobPage> {
    let (jobs, total) = state.db.list_jobs_for_owner(owner_id, page).await?;
    Ok(JobPage {
        jobs: jobs.iter().map(JobView::from).collect(),
        pagination: Pagination::new(page, total),
    })
}

/// Remove a job's stored media (best effort) and then its record.
pub async fn delete_job(state: &AppState, job_id: JobId, owner_id: OwnerId) -> ApiResult<()> {
    let job = get_owned_job(state, job_id, owner_id).await?;

    if let Err(e) = state
        .uploads
        .remove(std::path::Path::new(&job.file_path))
        .await
    {
        warn!(job_id = %job_id, owner_id, error = %e, "failed to delete stored media");
    }

    if !state.db.delete_job(job_id).await? {
        return Err(ApiError::JobNotFound(job_id.to_string()));
    }
    info!(job_id = %job_id, owner_id, "job deleted");
    Ok(())
}
