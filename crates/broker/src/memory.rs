// crates/broker/src/memory.rs
//! Single-process broker with the same observable semantics as Redis:
//! FIFO queue with blocking pop, expiring signal keys, fire-and-forget
//! pub/sub with no retention.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{debug, warn};
use transcribe_core::{
    CancellationState, JobId, QueueDescriptor, SIGNAL_HONORED, SIGNAL_REQUESTED,
};

use crate::{BrokerResult, CancelSignals, ProgressBus, ProgressStream, WorkQueue};

/// Per-channel buffer; a subscriber that falls further behind skips ahead.
const CHANNEL_CAPACITY: usize = 256;

struct Signal {
    value: &'static str,
    expires_at: Instant,
}

/// A receiver that removes its channel entry when it is the last one out.
struct Subscription {
    rx: broadcast::Receiver<String>,
    channel: String,
    channels: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // `rx` is still alive here, so a count of one is this subscription.
        self.channels
            .remove_if(&self.channel, |_, tx| tx.receiver_count() <= 1);
    }
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    queue: Arc<Mutex<VecDeque<String>>>,
    queue_ready: Arc<Notify>,
    signals: Arc<DashMap<JobId, Signal>>,
    channels: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions on `channel`.
    pub fn receiver_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Raw queue contents, head first.
    pub async fn queued_payloads(&self) -> Vec<String> {
        self.queue.lock().await.iter().cloned().collect()
    }

    /// Signal value if present and unexpired. Expired entries are evicted.
    fn live_signal(&self, job_id: JobId) -> Option<&'static str> {
        let now = Instant::now();
        self.signals.remove_if(&job_id, |_, s| s.expires_at <= now);
        self.signals.get(&job_id).map(|s| s.value)
    }
}

#[async_trait]
impl WorkQueue for MemoryBroker {
    async fn push(&self, descriptor: &QueueDescriptor) -> BrokerResult<()> {
        let payload = descriptor.to_json()?;
        self.queue.lock().await.push_back(payload);
        self.queue_ready.notify_one();
        debug!(job_id = %descriptor.job_id, "descriptor queued");
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> BrokerResult<Option<QueueDescriptor>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let ready = self.queue_ready.notified();
            if let Some(raw) = self.queue.lock().await.pop_front() {
                return Ok(Some(QueueDescriptor::from_json(&raw)?));
            }
            if tokio::time::timeout_at(deadline, ready).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn len(&self) -> BrokerResult<usize> {
        Ok(self.queue.lock().await.len())
    }
}

#[async_trait]
impl CancelSignals for MemoryBroker {
    async fn request(&self, job_id: JobId, ttl: Duration) -> BrokerResult<()> {
        self.signals.insert(
            job_id,
            Signal {
                value: SIGNAL_REQUESTED,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn state(&self, job_id: JobId) -> BrokerResult<CancellationState> {
        Ok(CancellationState::from_signal(self.live_signal(job_id)))
    }

    async fn mark_honored(&self, job_id: JobId) -> BrokerResult<()> {
        if self.live_signal(job_id).is_some() {
            if let Some(mut signal) = self.signals.get_mut(&job_id) {
                signal.value = SIGNAL_HONORED;
            }
        }
        Ok(())
    }

    async fn ttl(&self, job_id: JobId) -> BrokerResult<Option<Duration>> {
        self.live_signal(job_id);
        Ok(self
            .signals
            .get(&job_id)
            .map(|s| s.expires_at.saturating_duration_since(Instant::now())))
    }
}

#[async_trait]
impl ProgressBus for MemoryBroker {
    async fn publish(&self, channel: &str, payload: &str) -> BrokerResult<()> {
        // Nobody listening: the message is gone, as with Redis PUBLISH.
        self.channels
            .remove_if(channel, |_, tx| tx.receiver_count() == 0);
        let receivers = self
            .channels
            .get(channel)
            .and_then(|tx| tx.send(payload.to_owned()).ok())
            .unwrap_or(0);
        debug!(channel, receivers, "progress published");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> BrokerResult<ProgressStream> {
        let rx = self
            .channels
            .entry(channel.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        let mut sub = Subscription {
            rx,
            channel: channel.to_owned(),
            channels: self.channels.clone(),
        };

        let stream = async_stream::stream! {
            loop {
                match sub.rx.recv().await {
                    Ok(payload) => yield payload,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(channel = %sub.channel, skipped, "subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use transcribe_core::{progress_channel, CANCEL_SIGNAL_TTL};
    use uuid::Uuid;

    fn descriptor() -> QueueDescriptor {
        QueueDescriptor {
            job_id: Uuid::new_v4(),
            file_path: "uploads/user_1/x.wav".into(),
            owner_id: 1,
        }
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let broker = MemoryBroker::new();
        let first = descriptor();
        let second = descriptor();
        broker.push(&first).await.unwrap();
        broker.push(&second).await.unwrap();
        assert_eq!(broker.len().await.unwrap(), 2);

        let timeout = Duration::from_millis(10);
        assert_eq!(broker.pop(timeout).await.unwrap(), Some(first));
        assert_eq!(broker.pop(timeout).await.unwrap(), Some(second));
        assert_eq!(broker.pop(timeout).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let broker = MemoryBroker::new();
        let d = descriptor();

        let popper = {
            let broker = broker.clone();
            tokio::spawn(async move { broker.pop(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.push(&d).await.unwrap();

        assert_eq!(popper.await.unwrap().unwrap(), Some(d));
    }

    #[tokio::test]
    async fn test_malformed_descriptor_is_an_error() {
        let broker = MemoryBroker::new();
        broker.queue.lock().await.push_back("{not json".into());
        assert!(broker.pop(Duration::from_millis(10)).await.is_err());
    }

    #[tokio::test]
    async fn test_signal_lifecycle() {
        let broker = MemoryBroker::new();
        let id = Uuid::new_v4();

        assert_eq!(broker.state(id).await.unwrap(), CancellationState::NotRequested);
        assert_eq!(broker.ttl(id).await.unwrap(), None);

        broker.request(id, CANCEL_SIGNAL_TTL).await.unwrap();
        assert_eq!(broker.state(id).await.unwrap(), CancellationState::Requested);
        let ttl = broker.ttl(id).await.unwrap().unwrap();
        assert!(ttl > CANCEL_SIGNAL_TTL - Duration::from_secs(5));
        assert!(ttl <= CANCEL_SIGNAL_TTL);

        broker.mark_honored(id).await.unwrap();
        assert_eq!(broker.state(id).await.unwrap(), CancellationState::Honored);
        assert!(broker.ttl(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_signal_expires() {
        let broker = MemoryBroker::new();
        let id = Uuid::new_v4();
        broker.request(id, Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(broker.state(id).await.unwrap(), CancellationState::NotRequested);
        assert_eq!(broker.ttl(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mark_honored_without_signal_is_noop() {
        let broker = MemoryBroker::new();
        let id = Uuid::new_v4();
        broker.mark_honored(id).await.unwrap();
        assert_eq!(broker.state(id).await.unwrap(), CancellationState::NotRequested);
    }

    #[tokio::test]
    async fn test_pubsub_delivers_in_order_to_every_subscriber() {
        let broker = MemoryBroker::new();
        let channel = progress_channel(Uuid::new_v4());
        let mut a = broker.subscribe(&channel).await.unwrap();
        let mut b = broker.subscribe(&channel).await.unwrap();
        assert_eq!(broker.receiver_count(&channel), 2);

        for i in 0..5 {
            broker.publish(&channel, &format!("m{i}")).await.unwrap();
        }
        for sub in [&mut a, &mut b] {
            let got: Vec<String> = sub.by_ref().take(5).collect().await;
            assert_eq!(got, vec!["m0", "m1", "m2", "m3", "m4"]);
        }
    }

    #[tokio::test]
    async fn test_no_retention_for_late_subscribers() {
        let broker = MemoryBroker::new();
        let channel = progress_channel(Uuid::new_v4());
        broker.publish(&channel, "early").await.unwrap();

        let mut sub = broker.subscribe(&channel).await.unwrap();
        broker.publish(&channel, "late").await.unwrap();
        assert_eq!(sub.next().await.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_subscription() {
        let broker = MemoryBroker::new();
        let channel = progress_channel(Uuid::new_v4());
        let sub = broker.subscribe(&channel).await.unwrap();
        assert_eq!(broker.receiver_count(&channel), 1);

        drop(sub);
        assert_eq!(broker.receiver_count(&channel), 0);
    }

    #[tokio::test]
    async fn test_last_unsubscribe_removes_channel_entry() {
        let broker = MemoryBroker::new();
        let channel = progress_channel(Uuid::new_v4());
        let first = broker.subscribe(&channel).await.unwrap();
        let mut second = broker.subscribe(&channel).await.unwrap();

        drop(first);
        assert_eq!(broker.channels.len(), 1);
        broker.publish(&channel, "still here").await.unwrap();
        assert_eq!(second.next().await.as_deref(), Some("still here"));

        drop(second);
        assert!(broker.channels.is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_channels_do_not_accumulate() {
        let broker = MemoryBroker::new();
        for _ in 0..50 {
            let sub = broker.subscribe(&progress_channel(Uuid::new_v4())).await.unwrap();
            drop(sub);
        }
        assert!(broker.channels.is_empty());
    }
}
