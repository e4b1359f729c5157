// crates/db/src/queries/jobs.rs
//! Job record CRUD and conditional status transitions.
//!
//! Every transition is a single `UPDATE ... WHERE status IN (...)`, so a
//! record that already reached a terminal status is never rewritten even
//! when two writers race.

use chrono::Utc;
use transcribe_core::{
    validate_segments, Job, JobId, JobStatus, OwnerId, PageRequest, Segment,
};

use super::row_types::{to_millis, JobRow, JOB_COLUMNS};
use crate::{Database, DbResult};

/// `'queued', 'processing'` style list of the statuses that may move to `next`.
fn predecessor_list(next: JobStatus) -> String {
    JobStatus::predecessors(next)
        .into_iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Database {
    /// Persist a newly submitted job.
    pub async fn insert_job(&self, job: &Job) -> DbResult<()> {
        let segments = match &job.segments {
            Some(segs) => Some(serde_json::to_string(segs)?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO transcription_jobs (
                id, owner_id, file_name, file_path, file_size, duration,
                status, text, segments, error_message, created_at, completed_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.owner_id)
        .bind(&job.file_name)
        .bind(&job.file_path)
        .bind(job.file_size)
        .bind(job.duration)
        .bind(job.status.as_str())
        .bind(&job.text)
        .bind(segments)
        .bind(&job.error_message)
        .bind(to_millis(job.created_at))
        .bind(job.completed_at.map(to_millis))
        .bind(to_millis(job.updated_at))
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Fetch one job by id.
    pub async fn get_job(&self, id: JobId) -> DbResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM transcription_jobs WHERE id = ?");
        let row: Option<JobRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await?;

        row.map(JobRow::into_job).transpose()
    }

    /// One page of an owner's jobs, newest first, plus the owner's total.
    pub async fn list_jobs_for_owner(
        &self,
        owner_id: OwnerId,
        page: PageRequest,
    ) -> DbResult<(Vec<Job>, i64)> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM transcription_jobs WHERE owner_id = ?")
                .bind(owner_id)
                .fetch_one(self.pool())
                .await?;

        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM transcription_jobs \
             WHERE owner_id = ? \
             ORDER BY created_at DESC, id DESC \
             LIMIT ? OFFSET ?"
        );
        let rows: Vec<JobRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool())
            .await?;

        let jobs = rows
            .into_iter()
            .map(JobRow::into_job)
            .collect::<DbResult<Vec<_>>>()?;
        Ok((jobs, total))
    }

    /// Remove a job record. Returns false when it did not exist.
    pub async fn delete_job(&self, id: JobId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM transcription_jobs WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// queued → processing.
    pub async fn mark_processing(&self, id: JobId) -> DbResult<bool> {
        let sql = format!(
            "UPDATE transcription_jobs SET status = 'processing', updated_at = ? \
             WHERE id = ? AND status IN ({})",
            predecessor_list(JobStatus::Processing)
        );
        let result = sqlx::query(&sql)
            .bind(to_millis(Utc::now()))
            .bind(id.to_string())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// processing → done, storing the transcript.
    pub async fn complete_job(
        &self,
        id: JobId,
        text: &str,
        segments: &[Segment],
        duration: Option<f64>,
    ) -> DbResult<bool> {
        validate_segments(segments)?;
        let segments = serde_json::to_string(segments)?;
        let now = to_millis(Utc::now());

        let sql = format!(
            "UPDATE transcription_jobs \
             SET status = 'done', text = ?, segments = ?, duration = ?, \
                 completed_at = ?, updated_at = ? \
             WHERE id = ? AND status IN ({})",
            predecessor_list(JobStatus::Done)
        );
        let result = sqlx::query(&sql)
            .bind(text)
            .bind(segments)
            .bind(duration)
            .bind(now)
            .bind(now)
            .bind(id.to_string())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// queued|processing → failed, storing the error message.
    pub async fn fail_job(&self, id: JobId, message: &str) -> DbResult<bool> {
        let now = to_millis(Utc::now());
        let sql = format!(
            "UPDATE transcription_jobs \
             SET status = 'failed', error_message = ?, completed_at = ?, updated_at = ? \
             WHERE id = ? AND status IN ({})",
            predecessor_list(JobStatus::Failed)
        );
        let result = sqlx::query(&sql)
            .bind(message)
            .bind(now)
            .bind(now)
            .bind(id.to_string())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// queued|processing → cancelled. `completed_at` stays null.
    pub async fn cancel_job(&self, id: JobId) -> DbResult<bool> {
        let sql = format!(
            "UPDATE transcription_jobs SET status = 'cancelled', updated_at = ? \
             WHERE id = ? AND status IN ({})",
            predecessor_list(JobStatus::Cancelled)
        );
        let result = sqlx::query(&sql)
            .bind(to_millis(Utc::now()))
            .bind(id.to_string())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
