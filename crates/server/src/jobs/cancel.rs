// crates/server/src/jobs/cancel.rs
//! Cooperative cancellation.
//!
//! Two independent writes: the signal (authoritative for workers) and the
//! record status. If the record update fails the signal still stands and a
//! worker will abort when it next checks.

use tracing::{info, warn};
use transcribe_core::{progress_channel, Job, JobId, JobStatus, OwnerId, ProgressEvent, CANCEL_SIGNAL_TTL};

use crate::error::{ApiError, ApiResult};
use crate::jobs::query::get_owned_job;
use crate::state::AppState;

pub const CANCELLED_MESSAGE: &str = "job cancelled";

/// Request cancellation of a queued or processing job.
///
/// Returns the job as it stands afterwards: `cancelled` when the record
/// update applied, the pre-cancel status when only the signal was written.
pub async fn cancel_job(state: &AppState, job_id: JobId, owner_id: OwnerId) -> ApiResult<Job> {
    let job = get_owned_job(state, job_id, owner_id).await?;
    if job.status.is_terminal() {
        return Err(ApiError::NotCancellable(job.status));
    }

    state.signals.request(job_id, CANCEL_SIGNAL_TTL).await?;

    match state.db.cancel_job(job_id).await {
        Ok(true) => {}
        Ok(false) => {
            // Lost the race to a worker or another cancel.
            let current = get_owned_job(state, job_id, owner_id).await?;
            if current.status != JobStatus::Cancelled {
                return Err(ApiError::NotCancellable(current.status));
            }
        }
        Err(e) => {
            warn!(
                job_id = %job_id,
                owner_id,
                error = %e,
                "cancellation signal set but record not updated"
            );
            return Ok(job);
        }
    }

    let event = ProgressEvent::status(job_id, JobStatus::Cancelled).with_message(CANCELLED_MESSAGE);
    if let Err(e) = state
        .progress
        .publish(&progress_channel(job_id), &event.to_json())
        .await
    {
        warn!(job_id = %job_id, error = %e, "failed to publish cancellation event");
    }

    info!(job_id = %job_id, owner_id, "job cancelled");
    get_owned_job(state, job_id, owner_id).await
}
