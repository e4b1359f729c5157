// crates/db/src/queries/row_types.rs
// Internal row type for transcription_jobs and its conversion into the
// domain `Job`.

use chrono::{DateTime, Utc};
use sqlx::Row;
use transcribe_core::{Job, JobStatus, Segment};
use uuid::Uuid;

use crate::{DbError, DbResult};

pub(crate) const JOB_COLUMNS: &str = "id, owner_id, file_name, file_path, file_size, duration, \
     status, text, segments, error_message, created_at, completed_at, updated_at";

#[derive(Debug)]
pub(crate) struct JobRow {
    id: String,
    owner_id: i64,
    file_name: String,
    file_path: String,
    file_size: i64,
    duration: Option<f64>,
    status: String,
    text: Option<String>,
    segments: Option<String>,
    error_message: Option<String>,
    created_at: i64,
    completed_at: Option<i64>,
    updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for JobRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            file_name: row.try_get("file_name")?,
            file_path: row.try_get("file_path")?,
            file_size: row.try_get("file_size")?,
            duration: row.try_get("duration")?,
            status: row.try_get("status")?,
            text: row.try_get("text")?,
            segments: row.try_get("segments")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl JobRow {
    pub(crate) fn into_job(self) -> DbResult<Job> {
        let corrupt = |reason: String| DbError::CorruptRow {
            id: self.id.clone(),
            reason,
        };

        let id = Uuid::parse_str(&self.id).map_err(|e| corrupt(format!("id: {e}")))?;
        let status: JobStatus = self
            .status
            .parse()
            .map_err(|e: transcribe_core::StatusParseError| corrupt(e.to_string()))?;
        let segments = match self.segments.as_deref() {
            Some(raw) => Some(
                serde_json::from_str::<Vec<Segment>>(raw)
                    .map_err(|e| corrupt(format!("segments: {e}")))?,
            ),
            None => None,
        };
        let created_at = from_millis(self.created_at).ok_or_else(|| corrupt("created_at".into()))?;
        let updated_at = from_millis(self.updated_at).ok_or_else(|| corrupt("updated_at".into()))?;
        let completed_at = match self.completed_at {
            Some(ms) => Some(from_millis(ms).ok_or_else(|| corrupt("completed_at".into()))?),
            None => None,
        };

        Ok(Job {
            id,
            owner_id: self.owner_id,
            file_name: self.file_name,
            file_path: self.file_path,
            file_size: self.file_size,
            status,
            duration: self.duration,
            text: self.text,
            segments,
            error_message: self.error_message,
            created_at,
            completed_at,
            updated_at,
        })
    }
}

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}
