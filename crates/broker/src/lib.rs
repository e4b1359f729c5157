// crates/broker/src/lib.rs
//! Transient coordination primitives shared by the API and the workers:
//!
//! - [`WorkQueue`]: FIFO hand-off of [`QueueDescriptor`]s to workers.
//! - [`CancelSignals`]: TTL-bounded advisory cancellation flags.
//! - [`ProgressBus`]: per-job publish/subscribe progress topics.
//!
//! [`RedisBroker`] backs all three with one Redis deployment;
//! [`MemoryBroker`] is the single-process equivalent used for local runs and
//! tests.

mod error;
mod memory;
mod redis_broker;

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use transcribe_core::{CancellationState, JobId, QueueDescriptor};

pub use error::{BrokerError, BrokerResult};
pub use memory::MemoryBroker;
pub use redis_broker::RedisBroker;

/// Raw payloads received on a progress channel, in publish order.
pub type ProgressStream = BoxStream<'static, String>;

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Append a descriptor to the tail of the queue.
    async fn push(&self, descriptor: &QueueDescriptor) -> BrokerResult<()>;

    /// Take the head of the queue, waiting up to `timeout` for one to arrive.
    /// A zero `timeout` is a short poll, never an unbounded wait.
    async fn pop(&self, timeout: Duration) -> BrokerResult<Option<QueueDescriptor>>;

    /// Number of descriptors waiting.
    async fn len(&self) -> BrokerResult<usize>;
}

#[async_trait]
pub trait CancelSignals: Send + Sync {
    /// Set the signal for `job_id`, replacing any previous value and TTL.
    async fn request(&self, job_id: JobId, ttl: Duration) -> BrokerResult<()>;

    async fn state(&self, job_id: JobId) -> BrokerResult<CancellationState>;

    /// Record that a worker aborted because of the signal. The remaining TTL
    /// is kept; an absent signal stays absent.
    async fn mark_honored(&self, job_id: JobId) -> BrokerResult<()>;

    /// Remaining lifetime of the signal, `None` when it does not exist.
    async fn ttl(&self, job_id: JobId) -> BrokerResult<Option<Duration>>;
}

#[async_trait]
pub trait ProgressBus: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> BrokerResult<()>;

    /// Subscribe to `channel`. The subscription is active once this returns:
    /// anything published afterwards shows up on the stream. Dropping the
    /// stream releases the subscription.
    async fn subscribe(&self, channel: &str) -> BrokerResult<ProgressStream>;
}
