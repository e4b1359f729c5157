// crates/broker/src/redis_broker.rs
//! Redis-backed broker.
//!
//! Queue: `RPUSH`/`BLPOP` on [`WORK_QUEUE`]. Signals: string keys
//! `job_cancel:<id>` with `SETEX`. Progress: `PUBLISH`/`SUBSCRIBE`, each
//! subscriber holding its own dedicated pub/sub connection.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands, ExistenceCheck, SetExpiry, SetOptions};
use deadpool_redis::{Config, Pool, Runtime};
use futures_util::StreamExt;
use tracing::{debug, info, warn};
use transcribe_core::{
    cancel_signal_key, CancellationState, JobId, QueueDescriptor, SIGNAL_HONORED,
    SIGNAL_REQUESTED, WORK_QUEUE,
};

use crate::{
    BrokerResult, CancelSignals, ProgressBus, ProgressStream, WorkQueue,
};

/// Shortest `BLPOP` block. A timeout of zero means "forever" to Redis.
const MIN_BLOCK: Duration = Duration::from_millis(10);

/// `BLPOP` timeout in seconds for a caller's wait.
fn blpop_timeout_secs(timeout: Duration) -> f64 {
    timeout.max(MIN_BLOCK).as_secs_f64()
}

/// Redis connection pool plus a client for dedicated pub/sub connections.
#[derive(Clone)]
pub struct RedisBroker {
    pool: Pool,
    client: redis::Client,
}

impl RedisBroker {
    /// Create the pool. Connections are opened lazily on first use.
    pub fn connect(redis_url: &str) -> BrokerResult<Self> {
        let pool = Config::from_url(redis_url).create_pool(Some(Runtime::Tokio1))?;
        let client = redis::Client::open(redis_url)?;
        info!("Redis broker configured");
        Ok(Self { pool, client })
    }

    /// Round-trip a `PING` so startup fails fast on a bad URL.
    pub async fn ping(&self) -> BrokerResult<()> {
        let mut con = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut con).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for RedisBroker {
    async fn push(&self, descriptor: &QueueDescriptor) -> BrokerResult<()> {
        let payload = descriptor.to_json()?;
        let mut con = self.pool.get().await?;
        let _: i64 = con.rpush(WORK_QUEUE, payload).await?;
        debug!(job_id = %descriptor.job_id, "descriptor queued");
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> BrokerResult<Option<QueueDescriptor>> {
        let mut con = self.pool.get().await?;
        let popped: Option<(String, String)> =
            con.blpop(WORK_QUEUE, blpop_timeout_secs(timeout)).await?;
        match popped {
            Some((_, raw)) => Ok(Some(QueueDescriptor::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    async fn len(&self) -> BrokerResult<usize> {
        let mut con = self.pool.get().await?;
        let len: usize = con.llen(WORK_QUEUE).await?;
        Ok(len)
    }
}

#[async_trait]
impl CancelSignals for RedisBroker {
    async fn request(&self, job_id: JobId, ttl: Duration) -> BrokerResult<()> {
        let mut con = self.pool.get().await?;
        let _: () = con
            .set_ex(cancel_signal_key(job_id), SIGNAL_REQUESTED, ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn state(&self, job_id: JobId) -> BrokerResult<CancellationState> {
        let mut con = self.pool.get().await?;
        let value: Option<String> = con.get(cancel_signal_key(job_id)).await?;
        Ok(CancellationState::from_signal(value.as_deref()))
    }

    async fn mark_honored(&self, job_id: JobId) -> BrokerResult<()> {
        let mut con = self.pool.get().await?;
        let options = SetOptions::default()
            .conditional_set(ExistenceCheck::XX)
            .with_expiration(SetExpiry::KEEPTTL);
        let _: Option<String> = con
            .set_options(cancel_signal_key(job_id), SIGNAL_HONORED, options)
            .await?;
        Ok(())
    }

    async fn ttl(&self, job_id: JobId) -> BrokerResult<Option<Duration>> {
        let mut con = self.pool.get().await?;
        // -2: no key, -1: key without expiry.
        let secs: i64 = con.ttl(cancel_signal_key(job_id)).await?;
        Ok(u64::try_from(secs).ok().map(Duration::from_secs))
    }
}

#[async_trait]
impl ProgressBus for RedisBroker {
    async fn publish(&self, channel: &str, payload: &str) -> BrokerResult<()> {
        let mut con = self.pool.get().await?;
        let receivers: i64 = con.publish(channel, payload).await?;
        debug!(channel, receivers, "progress published");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> BrokerResult<ProgressStream> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        debug!(channel, "subscribed");

        let channel = channel.to_owned();
        let stream = pubsub
            .into_on_message()
            .filter_map(move |msg| {
                let payload = match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "dropping non-text progress payload");
                        None
                    }
                };
                async move { payload }
            })
            .boxed();
        Ok(stream)
    }
}
