// crates/core/src/cancellation.rs
//! Cooperative cancellation signal.
//!
//! A signal is an expiring key per job. Its *existence* means cancellation was
//! requested; workers poll for it before and between processing stages. The
//! value distinguishes a signal a worker has acted on from one still pending,
//! which gives the tri-state below. Nothing here is synchronous: a worker
//! inside an uninterruptible step only sees the request once it comes back
//! out, if at all.

use std::time::Duration;

use crate::job::JobId;

/// Signals expire after 24 hours if nobody cleans them up.
pub const CANCEL_SIGNAL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const CANCEL_SIGNAL_PREFIX: &str = "job_cancel:";

/// Value written when cancellation is requested.
pub const SIGNAL_REQUESTED: &str = "1";

/// Value a worker writes after aborting the job.
pub const SIGNAL_HONORED: &str = "honored";

/// Key of the cancellation signal for a job: `job_cancel:<id>`.
pub fn cancel_signal_key(job_id: JobId) -> String {
    format!("{CANCEL_SIGNAL_PREFIX}{job_id}")
}

/// What a worker can know about cancellation of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationState {
    NotRequested,
    /// Requested and not yet acted on. May be observed late, or never if the
    /// worker finishes first.
    Requested,
    /// A worker saw the request and aborted.
    Honored,
}

impl CancellationState {
    /// Interpret the raw signal value; a missing key means no request.
    /// Any value other than [`SIGNAL_HONORED`] counts as a pending request.
    pub fn from_signal(value: Option<&str>) -> Self {
        match value {
            None => CancellationState::NotRequested,
            Some(SIGNAL_HONORED) => CancellationState::Honored,
            Some(_) => CancellationState::Requested,
        }
    }

    /// Whether a worker should stop working on the job.
    pub fn should_abort(self) -> bool {
        !matches!(self, CancellationState::NotRequested)
    }
}
