// crates/core/src/job.rs
//! Job record, status state machine and the per-status field projection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SegmentError, StatusParseError};

/// Globally unique job identifier, generated at submission.
pub type JobId = Uuid;

/// Identifier of the authenticated user that owns a job.
pub type OwnerId = i64;

/// Lifecycle status of a transcription job.
///
/// ```text
/// queued ──► processing ──► done
///   │            │    └───► failed
///   │            └────────► cancelled
///   ├───────────────────────► cancelled
///   └───────────────────────► failed
/// ```
///
/// `queued → failed` covers a worker that rejects a job before it starts
/// (missing file, cancellation observed at pickup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Done,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Done,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Wire/database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses accept no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Statuses that carry a `completed_at` timestamp.
    pub fn sets_completed_at(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Whether `self → next` is a legal edge of the state machine.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Processing)
                | (Queued, Failed)
                | (Queued, Cancelled)
                | (Processing, Done)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }

    /// All statuses from which `next` can be reached in one step.
    pub fn predecessors(next: JobStatus) -> Vec<JobStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(next))
            .collect()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// One timed piece of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "id")]
    pub index: i64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Check that indices ascend, every segment has `start <= end`, and starts
/// never move backwards.
pub fn validate_segments(segments: &[Segment]) -> Result<(), SegmentError> {
    let mut previous: Option<&Segment> = None;
    for seg in segments {
        if seg.start > seg.end {
            return Err(SegmentError::Inverted {
                index: seg.index,
                start: seg.start,
                end: seg.end,
            });
        }
        if let Some(prev) = previous {
            if seg.index <= prev.index {
                return Err(SegmentError::IndexNotAscending {
                    index: seg.index,
                    previous: prev.index,
                });
            }
            if seg.start < prev.start {
                return Err(SegmentError::OutOfOrder {
                    index: seg.index,
                    start: seg.start,
                    previous: prev.start,
                });
            }
        }
        previous = Some(seg);
    }
    Ok(())
}

/// Fields supplied by the submitter when a job is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub id: JobId,
    pub owner_id: OwnerId,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
}

/// A persisted transcription job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub owner_id: OwnerId,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub status: JobStatus,
    pub duration: Option<f64>,
    pub text: Option<String>,
    pub segments: Option<Vec<Segment>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A freshly submitted job: `queued`, no result or error fields.
    pub fn queued(new: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            id: new.id,
            owner_id: new.owner_id,
            file_name: new.file_name,
            file_path: new.file_path,
            file_size: new.file_size,
            status: JobStatus::Queued,
            duration: None,
            text: None,
            segments: None,
            error_message: None,
            created_at: now,
            completed_at: None,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, owner_id: OwnerId) -> bool {
        self.owner_id == owner_id
    }

    /// Result and error fields a client may see for the current status.
    pub fn visible_fields(&self) -> VisibleFields<'_> {
        match self.status {
            JobStatus::Done => VisibleFields {
                text: self.text.as_deref(),
                segments: self.segments.as_deref(),
                duration: self.duration,
                error_message: None,
            },
            JobStatus::Failed => VisibleFields {
                error_message: self.error_message.as_deref(),
                ..VisibleFields::default()
            },
            JobStatus::Queued | JobStatus::Processing | JobStatus::Cancelled => {
                VisibleFields::default()
            }
        }
    }
}

/// Status-dependent slice of a [`Job`] that is safe to expose.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VisibleFields<'a> {
    pub text: Option<&'a str>,
    pub segments: Option<&'a [Segment]>,
    pub duration: Option<f64>,
    pub error_message: Option<&'a str>,
}

/// Client-facing job snapshot. Inapplicable fields are omitted, not nulled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub file_name: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobView {
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        let visible = job.visible_fields();
        Self {
            job_id: job.id,
            status: job.status,
            message: None,
            text: visible.text.map(str::to_owned),
            segments: visible.segments.map(<[Segment]>::to_vec),
            duration: visible.duration,
            file_name: job.file_name.clone(),
            file_size: job.file_size,
            created_at: job.created_at,
            completed_at: job.completed_at,
            error_message: visible.error_message.map(str::to_owned),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_job(status: JobStatus) -> Job {
        let now = Utc::now();
        let mut job = Job::queued(
            NewJob {
                id: Uuid::new_v4(),
                owner_id: 7,
                file_name: "meeting.wav".into(),
                file_path: "/uploads/user_7/x.wav".into(),
                file_size: 2048,
            },
            now,
        );
        job.status = status;
        job.text = Some("hello world".into());
        job.segments = Some(vec![Segment {
            index: 0,
            start: 0.0,
            end: 1.5,
            text: "hello world".into(),
            speaker: None,
        }]);
        job.duration = Some(1.5);
        job.error_message = Some("decoder crashed".into());
        job
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("running".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_as_wire_string() {
        let json = serde_json::to_string(&JobStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn test_terminal_statuses_have_no_outgoing_edges() {
        for from in JobStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in JobStatus::ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be illegal");
            }
        }
    }

    #[test]
    fn test_legal_edges() {
        use JobStatus::*;
        assert!(Queued.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Done));
        assert!(Processing.can_transition_to(Failed));
        assert!(Queued.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Queued.can_transition_to(Done));
        assert!(!Processing.can_transition_to(Queued));
        assert!(!Queued.can_transition_to(Queued));
    }

    #[test]
    fn test_predecessors_of_cancelled() {
        assert_eq!(
            JobStatus::predecessors(JobStatus::Cancelled),
            vec![JobStatus::Queued, JobStatus::Processing]
        );
        assert_eq!(
            JobStatus::predecessors(JobStatus::Done),
            vec![JobStatus::Processing]
        );
    }

    #[test]
    fn test_completed_at_statuses() {
        assert!(JobStatus::Done.sets_completed_at());
        assert!(JobStatus::Failed.sets_completed_at());
        assert!(!JobStatus::Cancelled.sets_completed_at());
        assert!(!JobStatus::Queued.sets_completed_at());
    }

    #[test]
    fn test_visible_fields_done_exposes_result_only() {
        let job = sample_job(JobStatus::Done);
        let v = job.visible_fields();
        assert_eq!(v.text, Some("hello world"));
        assert_eq!(v.segments.map(|s| s.len()), Some(1));
        assert_eq!(v.duration, Some(1.5));
        assert_eq!(v.error_message, None);
    }

    #[test]
    fn test_visible_fields_failed_exposes_error_only() {
        let job = sample_job(JobStatus::Failed);
        let v = job.visible_fields();
        assert_eq!(v.text, None);
        assert_eq!(v.segments, None);
        assert_eq!(v.error_message, Some("decoder crashed"));
    }

    #[test]
    fn test_visible_fields_hidden_for_non_final_statuses() {
        for status in [JobStatus::Queued, JobStatus::Processing, JobStatus::Cancelled] {
            assert_eq!(sample_job(status).visible_fields(), VisibleFields::default());
        }
    }

    #[test]
    fn test_job_view_omits_inapplicable_fields() {
        let job = sample_job(JobStatus::Queued);
        let json = serde_json::to_value(JobView::from(&job)).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["file_name"], "meeting.wav");
        assert!(json.get("text").is_none());
        assert!(json.get("segments").is_none());
        assert!(json.get("error_message").is_none());
        assert!(json.get("completed_at").is_none());
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_job_view_done_carries_segments() {
        let job = sample_job(JobStatus::Done);
        let json = serde_json::to_value(JobView::from(&job)).unwrap();
        assert_eq!(json["text"], "hello world");
        assert_eq!(json["segments"][0]["id"], 0);
        assert_eq!(json["segments"][0]["end"], 1.5);
        assert!(json["segments"][0].get("speaker").is_none());
    }

    #[test]
    fn test_validate_segments_accepts_ordered() {
        let segs = vec![
            Segment { index: 0, start: 0.0, end: 1.0, text: "a".into(), speaker: None },
            Segment { index: 1, start: 1.0, end: 1.0, text: "b".into(), speaker: Some("S1".into()) },
            Segment { index: 2, start: 1.0, end: 3.5, text: "c".into(), speaker: None },
        ];
        assert!(validate_segments(&segs).is_ok());
        assert!(validate_segments(&[]).is_ok());
    }

    #[test]
    fn test_validate_segments_rejects_inverted_and_unordered() {
        let inverted = vec![Segment { index: 0, start: 2.0, end: 1.0, text: "a".into(), speaker: None }];
        assert!(matches!(
            validate_segments(&inverted),
            Err(SegmentError::Inverted { index: 0, .. })
        ));

        let backwards = vec![
            Segment { index: 0, start: 5.0, end: 6.0, text: "a".into(), speaker: None },
            Segment { index: 1, start: 4.0, end: 7.0, text: "b".into(), speaker: None },
        ];
        assert!(matches!(
            validate_segments(&backwards),
            Err(SegmentError::OutOfOrder { index: 1, .. })
        ));

        let repeated = vec![
            Segment { index: 3, start: 0.0, end: 1.0, text: "a".into(), speaker: None },
            Segment { index: 3, start: 1.0, end: 2.0, text: "b".into(), speaker: None },
        ];
        assert!(matches!(
            validate_segments(&repeated),
            Err(SegmentError::IndexNotAscending { index: 3, previous: 3 })
        ));
    }
}
