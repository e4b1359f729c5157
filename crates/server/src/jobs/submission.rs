// crates/server/src/jobs/submission.rs
//! Job submission: store the media, create the record, queue the job.
//!
//! The record and the queue entry are created in that order. If the queue
//! push fails the record and the file are removed again, so a submission
//! either fully happens or leaves nothing behind.

use chrono::Utc;
use tracing::{error, info, warn};
use transcribe_core::{
    check_size, validate_extension, Job, NewJob, OwnerId, QueueDescriptor,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

pub const SUBMITTED_MESSAGE: &str = "job created and queued for transcription";

/// An uploaded media file, already read from the request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Accept an upload for `owner_id` and return the queued job.
pub async fn submit_job(state: &AppState, owner_id: OwnerId, upload: UploadedFile) -> ApiResult<Job> {
    let ext = validate_extension(&upload.file_name)?;
    check_size(upload.bytes.len() as u64, state.max_upload_bytes)?;

    let job_id = Uuid::new_v4();
    let path = state
        .uploads
        .save(owner_id, job_id, &ext, &upload.bytes)
        .await?;

    let job = Job::queued(
        NewJob {
            id: job_id,
            owner_id,
            file_name: upload.file_name,
            file_path: path.to_string_lossy().into_owned(),
            file_size: upload.bytes.len() as i64,
        },
        Utc::now(),
    );

    if let Err(e) = state.db.insert_job(&job).await {
        if let Err(rm) = state.uploads.remove(&path).await {
            warn!(job_id = %job_id, owner_id, error = %rm, "failed to release upload after insert failure");
        }
        return Err(e.into());
    }

    if let Err(e) = state.queue.push(&QueueDescriptor::for_job(&job)).await {
        rollback(state, &job).await;
        return Err(e.into());
    }

    info!(
        job_id = %job.id,
        owner_id,
        file_size = job.file_size,
        "job queued"
    );
    Ok(job)
}

/// Undo a submission whose queue push failed. A failed rollback leaves an
/// orphan record that no worker will ever pick up; it is logged loudly.
async fn rollback(state: &AppState, job: &Job) {
    match state.db.delete_job(job.id).await {
        Ok(_) => {}
        Err(e) => {
            error!(
                job_id = %job.id,
                owner_id = job.owner_id,
                error = %e,
                "orphaned job: queue push failed and the record could not be removed"
            );
        }
    }
    if let Err(e) = state.uploads.remove(std::path::Path::new(&job.file_path)).await {
        warn!(job_id = %job.id, owner_id = job.owner_id, error = %e, "failed to release upload during rollback");
    }
}
