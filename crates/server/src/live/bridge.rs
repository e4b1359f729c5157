// crates/server/src/live/bridge.rs
//! Per-connection progress relay.
//!
//! Connect → snapshot (when the record exists) → subscribe → relay. The relay is two tasks: one
//! forwards subscription payloads to the client, the other drains client
//! frames only to notice disconnects. They share a [`CancellationToken`], so
//! whichever exits first tears down the other, and the subscription is
//! released when the forwarding task ends.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use transcribe_broker::ProgressStream;
use transcribe_core::{progress_channel, JobId, OwnerId, ProgressEvent};

use crate::state::AppState;

/// Close code sent when the job belongs to someone else.
pub const CLOSE_FORBIDDEN: u16 = 4003;
/// Server-side failure (RFC 6455 "internal error").
const CLOSE_INTERNAL: u16 = 1011;

pub const FORBIDDEN_ERROR: &str = "forbidden: you do not have access to this job";

/// Serve one live connection for `job_id` on behalf of `owner_id`.
///
/// The caller has already authenticated `owner_id`; ownership is checked
/// here because a rejection is reported in-band as an error frame followed
/// by a close frame. A job with no record yet gets no snapshot and no
/// ownership check, only the relay.
pub async fn relay_job_progress(
    mut socket: WebSocket,
    state: Arc<AppState>,
    job_id: JobId,
    owner_id: OwnerId,
) {
    match state.db.get_job(job_id).await {
        Ok(Some(job)) => {
            if !job.is_owned_by(owner_id) {
                warn!(job_id = %job_id, owner_id, "live connection to another owner's job denied");
                reject(socket, CLOSE_FORBIDDEN, FORBIDDEN_ERROR).await;
                return;
            }

            // The snapshot is read before subscribing; anything published in
            // between is missed, and the snapshot stands in for it.
            let snapshot = ProgressEvent::snapshot(&job).to_json();
            if socket.send(Message::Text(snapshot.into())).await.is_err() {
                debug!(job_id = %job_id, "client gone before snapshot");
                return;
            }
        }
        // The record may not be visible yet; attach without a snapshot.
        Ok(None) => debug!(job_id = %job_id, owner_id, "live connection before job record exists"),
        Err(e) => {
            error!(job_id = %job_id, owner_id, error = %e, "failed to load job for live connection");
            reject(socket, CLOSE_INTERNAL, "internal server error").await;
            return;
        }
    }

    let channel = progress_channel(job_id);
    let subscription = match state.progress.subscribe(&channel).await {
        Ok(subscription) => subscription,
        Err(e) => {
            error!(job_id = %job_id, channel = %channel, error = %e, "failed to subscribe to progress");
            reject(socket, CLOSE_INTERNAL, "progress unavailable").await;
            return;
        }
    };
    info!(job_id = %job_id, owner_id, channel = %channel, "live connection opened");

    let (sink, stream) = socket.split();
    let token = CancellationToken::new();
    let forward = tokio::spawn(forward_progress(subscription, sink, token.clone()));
    let watch = tokio::spawn(watch_client(stream, token));

    let (forwarded, _) = tokio::join!(forward, watch);
    match forwarded {
        Ok(count) => info!(job_id = %job_id, owner_id, relayed = count, "live connection closed"),
        Err(e) => warn!(job_id = %job_id, owner_id, error = %e, "progress relay task failed"),
    }
}

/// Forward every payload to the client until the subscription ends, a write
/// fails, or the token fires. Returns the number of payloads relayed.
async fn forward_progress(
    mut subscription: ProgressStream,
    mut sink: SplitSink<WebSocket, Message>,
    token: CancellationToken,
) -> usize {
    let _guard = token.clone().drop_guard();
    let mut relayed = 0;
    loop {
        let payload = tokio::select! {
            _ = token.cancelled() => break,
            payload = subscription.next() => payload,
        };
        let Some(payload) = payload else {
            break;
        };
        if sink.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
        relayed += 1;
    }
    drop(subscription);
    let _ = sink.close().await;
    relayed
}

/// Drain client frames. The protocol is server to client only; inbound
/// frames matter only as a disconnect signal.
async fn watch_client(mut stream: SplitStream<WebSocket>, token: CancellationToken) {
    let _guard = token.clone().drop_guard();
    loop {
        let frame = tokio::select! {
            _ = token.cancelled() => break,
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(_)) => {}
        }
    }
}

/// Send an error frame and close with `code`.
async fn reject(mut socket: WebSocket, code: u16, error: &'static str) {
    let _ = socket.send(Message::Text(error_frame(error))).await;
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: error.into(),
        })))
        .await;
}

fn error_frame(error: &str) -> Utf8Bytes {
    serde_json::json!({ "status": "error", "error": error })
        .to_string()
        .into()
}
