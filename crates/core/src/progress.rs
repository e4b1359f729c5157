// crates/core/src/progress.rs
//! Progress channel naming and the event shape used on it.
//!
//! The relay never parses what flows over a progress channel; these types are
//! only used by code that *produces* events (the connect-time snapshot and the
//! worker helpers).

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobId, JobStatus};

/// Prefix of every per-job progress topic.
pub const PROGRESS_CHANNEL_PREFIX: &str = "job_progress:";

/// Message attached to the snapshot sent when a live connection opens.
pub const SNAPSHOT_MESSAGE: &str = "connected. current status fetched.";

/// Deterministic topic name for a job: `job_progress:<id>`.
pub fn progress_channel(job_id: JobId) -> String {
    format!("{PROGRESS_CHANNEL_PREFIX}{job_id}")
}

/// A status or partial-result update for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub r#final: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl ProgressEvent {
    /// An event for `status`; `final` is set for terminal statuses.
    pub fn status(job_id: JobId, status: JobStatus) -> Self {
        Self {
            job_id,
            status,
            message: None,
            text: None,
            r#final: status.is_terminal(),
        }
    }

    /// The first frame a live connection receives: the persisted status at
    /// connect time. Only `done` and `failed` snapshots carry `final`.
    pub fn snapshot(job: &Job) -> Self {
        let mut event = Self::status(job.id, job.status).with_message(SNAPSHOT_MESSAGE);
        event.r#final = job.status.sets_completed_at();
        event
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn to_json(&self) -> String {
        // Every field is a plain string, enum or bool.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::NewJob;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_channel_name_is_prefixed_id() {
        let id = Uuid::parse_str("aa0e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(
            progress_channel(id),
            "job_progress:aa0e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_emitted_events_are_final_on_every_terminal_status() {
        let id = Uuid::new_v4();
        let json = ProgressEvent::status(id, JobStatus::Processing).to_json();
        assert!(!json.contains("final"));

        for status in [JobStatus::Done, JobStatus::Failed, JobStatus::Cancelled] {
            let v: serde_json::Value =
                serde_json::from_str(&ProgressEvent::status(id, status).to_json()).unwrap();
            assert_eq!(v["final"], true);
        }
    }

    #[test]
    fn test_snapshot_event() {
        let mut job = Job::queued(
            NewJob {
                id: Uuid::new_v4(),
                owner_id: 1,
                file_name: "a.wav".into(),
                file_path: "/tmp/a.wav".into(),
                file_size: 1,
            },
            Utc::now(),
        );
        job.status = JobStatus::Done;

        let v: serde_json::Value =
            serde_json::from_str(&ProgressEvent::snapshot(&job).to_json()).unwrap();
        assert_eq!(v["job_id"], job.id.to_string());
        assert_eq!(v["status"], "done");
        assert_eq!(v["message"], SNAPSHOT_MESSAGE);
        assert_eq!(v["final"], true);
        assert!(v.get("text").is_none());
    }

    #[test]
    fn test_snapshot_final_only_for_done_and_failed() {
        let mut job = Job::queued(
            NewJob {
                id: Uuid::new_v4(),
                owner_id: 1,
                file_name: "a.wav".into(),
                file_path: "/tmp/a.wav".into(),
                file_size: 1,
            },
            Utc::now(),
        );
        for (status, is_final) in [
            (JobStatus::Queued, false),
            (JobStatus::Processing, false),
            (JobStatus::Done, true),
            (JobStatus::Failed, true),
            (JobStatus::Cancelled, false),
        ] {
            job.status = status;
            let v: serde_json::Value =
                serde_json::from_str(&ProgressEvent::snapshot(&job).to_json()).unwrap();
            assert_eq!(v.get("final").is_some(), is_final, "{status}");
        }
    }

    #[test]
    fn test_event_deserializes_without_optional_fields() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"job_id":"{id}","status":"processing"}}"#);
        let ev: ProgressEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(ev, ProgressEvent::status(id, JobStatus::Processing));
    }
}
