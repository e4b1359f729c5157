// crates/server/src/jobs/worker.rs
//! Worker-side half of the queue contract.
//!
//! A worker pops a descriptor, checks the cancellation signal before it
//! starts and at every stage boundary the executor reports, drives the record
//! through `processing` to a terminal status, and publishes each transition
//! on the job's progress channel. The transcription engine itself sits
//! behind [`JobExecutor`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use transcribe_broker::{BrokerError, CancelSignals, ProgressBus, WorkQueue};
use transcribe_core::{
    progress_channel, JobId, JobStatus, ProgressEvent, QueueDescriptor, Segment,
};
use transcribe_db::{Database, DbError};

use crate::state::AppState;

/// How long one `pop` blocks before the loop re-checks for shutdown.
pub const POP_TIMEOUT: Duration = Duration::from_secs(5);

/// Back-off after an infrastructure error in the run loop.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Output of a successful transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
    pub duration: Option<f64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The cancellation signal was observed at a checkpoint.
    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// What happened to a popped job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobId),
    Failed(JobId),
    Cancelled(JobId),
    /// The record was no longer `queued` (cancelled or deleted meanwhile).
    Skipped(JobId),
}

/// Handle given to an executor for the duration of one job.
pub struct StageContext<'a> {
    job_id: JobId,
    channel: String,
    signals: &'a dyn CancelSignals,
    progress: &'a dyn ProgressBus,
}

impl StageContext<'_> {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Stage boundary: returns `Cancelled` if cancellation was requested.
    /// A signal store that cannot be reached does not stop the job.
    pub async fn checkpoint(&self) -> Result<(), ExecutionError> {
        match self.signals.state(self.job_id).await {
            Ok(state) if state.should_abort() => Err(ExecutionError::Cancelled),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(job_id = %self.job_id, error = %e, "cancellation check failed, continuing");
                Ok(())
            }
        }
    }

    /// Publish partial transcript text.
    pub async fn partial(&self, text: &str) {
        let event = ProgressEvent::status(self.job_id, JobStatus::Processing).with_text(text);
        publish(self.progress, &self.channel, &event).await;
    }
}

/// The transcription engine.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Transcribe the media at `descriptor.file_path`. Long-running
    /// implementations call [`StageContext::checkpoint`] between stages.
    async fn execute(
        &self,
        descriptor: &QueueDescriptor,
        ctx: &StageContext<'_>,
    ) -> Result<Transcript, ExecutionError>;
}

/// Queue consumer bound to the same store and broker as the API.
#[derive(Clone)]
pub struct Worker {
    db: Database,
    queue: Arc<dyn WorkQueue>,
    signals: Arc<dyn CancelSignals>,
    progress: Arc<dyn ProgressBus>,
}

impl Worker {
    pub fn new(
        db: Database,
        queue: Arc<dyn WorkQueue>,
        signals: Arc<dyn CancelSignals>,
        progress: Arc<dyn ProgressBus>,
    ) -> Self {
        Self {
            db,
            queue,
            signals,
            progress,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.db.clone(),
            state.queue.clone(),
            state.signals.clone(),
            state.progress.clone(),
        )
    }

    /// Pop and process one job. `Ok(None)` when the queue stayed empty for
    /// `wait`.
    pub async fn process_next(
        &self,
        executor: &dyn JobExecutor,
        wait: Duration,
    ) -> Result<Option<JobOutcome>, WorkerError> {
        let Some(descriptor) = self.queue.pop(wait).await? else {
            return Ok(None);
        };
        self.process(executor, descriptor).await.map(Some)
    }

    /// Drive one popped job to a terminal status.
    ///
    /// On a store error the job is not dropped: a record still `queued` (or
    /// one that cannot be read) goes back on the queue, and a record already
    /// `processing` is failed.
    pub async fn process(
        &self,
        executor: &dyn JobExecutor,
        descriptor: QueueDescriptor,
    ) -> Result<JobOutcome, WorkerError> {
        match self.drive(executor, &descriptor).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.recover(&descriptor, &e).await;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        executor: &dyn JobExecutor,
        descriptor: &QueueDescriptor,
    ) -> Result<JobOutcome, WorkerError> {
        let job_id = descriptor.job_id;
        let channel = progress_channel(job_id);
        info!(job_id = %job_id, owner_id = descriptor.owner_id, "processing job");

        let cancel_requested = match self.signals.state(job_id).await {
            Ok(state) => state.should_abort(),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "cancellation check failed, continuing");
                false
            }
        };
        if cancel_requested {
            return self.abort_cancelled(job_id, &channel).await;
        }

        if !Path::new(&descriptor.file_path).exists() {
            let message = format!("file not found: {}", descriptor.file_path);
            return self.fail(job_id, &channel, &message).await;
        }

        if !self.db.mark_processing(job_id).await? {
            debug!(job_id = %job_id, "record no longer queued, skipping");
            return Ok(JobOutcome::Skipped(job_id));
        }
        publish(
            self.progress.as_ref(),
            &channel,
            &ProgressEvent::status(job_id, JobStatus::Processing).with_message("transcription started"),
        )
        .await;

        let ctx = StageContext {
            job_id,
            channel: channel.clone(),
            signals: self.signals.as_ref(),
            progress: self.progress.as_ref(),
        };

        let transcript = match executor.execute(descriptor, &ctx).await {
            Ok(transcript) => transcript,
            Err(ExecutionError::Cancelled) => {
                return self.abort_cancelled(job_id, &channel).await
            }
            Err(ExecutionError::Failed(message)) => {
                return self.fail(job_id, &channel, &message).await
            }
        };

        // Last boundary before the result is committed.
        if ctx.checkpoint().await.is_err() {
            return self.abort_cancelled(job_id, &channel).await;
        }

        match self
            .db
            .complete_job(job_id, &transcript.text, &transcript.segments, transcript.duration)
            .await
        {
            Ok(true) => {
                let event = ProgressEvent::status(job_id, JobStatus::Done)
                    .with_message("transcription completed")
                    .with_text(transcript.text);
                publish(self.progress.as_ref(), &channel, &event).await;
                info!(job_id = %job_id, "job completed");
                Ok(JobOutcome::Completed(job_id))
            }
            Ok(false) => {
                debug!(job_id = %job_id, "record left processing before completion");
                Ok(JobOutcome::Skipped(job_id))
            }
            Err(DbError::InvalidSegments(e)) => {
                self.fail(job_id, &channel, &format!("invalid transcript: {e}"))
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Consume the queue until `shutdown` fires.
    pub async fn run(&self, executor: Arc<dyn JobExecutor>, shutdown: CancellationToken) {
        info!("worker started");
        loop {
            // Only the wait for work is interruptible; a popped job runs to
            // a terminal status.
            let popped = tokio::select! {
                _ = shutdown.cancelled() => break,
                popped = self.queue.pop(POP_TIMEOUT) => popped,
            };
            let result = match popped {
                Ok(Some(descriptor)) => self.process(executor.as_ref(), descriptor).await.map(|_| ()),
                Ok(None) => Ok(()),
                Err(e) => Err(WorkerError::from(e)),
            };
            if let Err(e) = result {
                error!(error = %e, "worker iteration failed");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                }
            }
        }
        info!("worker stopped");
    }

    /// Put a job whose run hit a store error back into a state it can
    /// leave.
    async fn recover(&self, descriptor: &QueueDescriptor, cause: &WorkerError) {
        let job_id = descriptor.job_id;
        match self.db.get_job(job_id).await {
            Ok(Some(job)) if job.status == JobStatus::Processing => {
                let message = format!("worker error: {cause}");
                match self.db.fail_job(job_id, &message).await {
                    Ok(_) => {
                        let event = ProgressEvent::status(job_id, JobStatus::Failed).with_message(&message);
                        publish(self.progress.as_ref(), &progress_channel(job_id), &event).await;
                        warn!(job_id = %job_id, error = %cause, "job failed after store error");
                    }
                    Err(e) => error!(job_id = %job_id, error = %e, "could not fail job after store error"),
                }
            }
            Ok(Some(job)) if job.status != JobStatus::Queued => {}
            Ok(None) => {}
            // Still queued, or unknown because the store is down.
            _ => match self.queue.push(descriptor).await {
                Ok(()) => warn!(job_id = %job_id, error = %cause, "job requeued after store error"),
                Err(e) => error!(job_id = %job_id, error = %e, "job lost: requeue failed"),
            },
        }
    }

    async fn abort_cancelled(&self, job_id: JobId, channel: &str) -> Result<JobOutcome, WorkerError> {
        // false when the API already wrote `cancelled`.
        self.db.cancel_job(job_id).await?;
        if let Err(e) = self.signals.mark_honored(job_id).await {
            warn!(job_id = %job_id, error = %e, "failed to mark cancellation honored");
        }
        let event = ProgressEvent::status(job_id, JobStatus::Cancelled).with_message("job cancelled");
        publish(self.progress.as_ref(), channel, &event).await;
        info!(job_id = %job_id, "job cancelled by request");
        Ok(JobOutcome::Cancelled(job_id))
    }

    async fn fail(&self, job_id: JobId, channel: &str, message: &str) -> Result<JobOutcome, WorkerError> {
        if !self.db.fail_job(job_id, message).await? {
            return Ok(JobOutcome::Skipped(job_id));
        }
        let event = ProgressEvent::status(job_id, JobStatus::Failed).with_message(message);
        publish(self.progress.as_ref(), channel, &event).await;
        warn!(job_id = %job_id, error = message, "job failed");
        Ok(JobOutcome::Failed(job_id))
    }
}

async fn publish(progress: &dyn ProgressBus, channel: &str, event: &ProgressEvent) {
    if let Err(e) = progress.publish(channel, &event.to_json()).await {
        warn!(channel, error = %e, "failed to publish progress");
    }
}
