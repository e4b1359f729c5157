// crates/core/src/queue.rs
//! The descriptor handed to transcription workers through the work queue.

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobId, OwnerId};

/// Name of the Redis list workers pop from.
pub const WORK_QUEUE: &str = "transcription_queue";

/// Minimal job hand-off: enough for a worker to find the media and the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDescriptor {
    pub job_id: JobId,
    pub file_path: String,
    #[serde(rename = "user_id")]
    pub owner_id: OwnerId,
}

impl QueueDescriptor {
    pub fn for_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            file_path: job.file_path.clone(),
            owner_id: job.owner_id,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
