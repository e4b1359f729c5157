// crates/server/src/jobs/mod.rs
//! Job lifecycle operations behind the HTTP routes, plus the worker-side
//! helpers that consume the queue.
//!
//! - `submission` - validate an upload, persist the record, queue it
//! - `query` - owner-checked snapshot, listing, deletion
//! - `cancel` - cooperative cancellation
//! - `worker` - `JobExecutor` and the `Worker` loop for queue consumers

pub mod cancel;
pub mod query;
pub mod submission;
pub mod worker;

pub use cancel::cancel_job;
pub use query::{delete_job, get_owned_job, list_jobs, JobPage};
pub use submission::{submit_job, UploadedFile, SUBMITTED_MESSAGE};
pub use worker::{ExecutionError, JobExecutor, JobOutcome, StageContext, Transcript, Worker};

use transcribe_core::JobId;

use crate::error::{ApiError, ApiResult};

/// Parse a job id from a path segment. Anything that is not a UUID cannot
/// name a job, so it is reported as not found.
pub fn parse_job_id(raw: &str) -> ApiResult<JobId> {
    JobId::parse_str(raw).map_err(|_| ApiError::JobNotFound(raw.to_string()))
}
