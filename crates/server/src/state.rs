// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use transcribe_broker::{CancelSignals, ProgressBus, WorkQueue};
use transcribe_db::Database;

use crate::auth::Authenticator;
use crate::storage::UploadStore;

/// Shared application state accessible from all route handlers.
///
/// Every external handle is built once at startup and injected here.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Job record store.
    pub db: Database,
    /// Hand-off to the transcription workers.
    pub queue: Arc<dyn WorkQueue>,
    /// Cooperative cancellation flags read by workers.
    pub signals: Arc<dyn CancelSignals>,
    /// Per-job progress topics relayed to live connections.
    pub progress: Arc<dyn ProgressBus>,
    pub uploads: UploadStore,
    pub auth: Authenticator,
    pub max_upload_bytes: u64,
}

impl AppState {
    /// Build the state with one broker serving the queue, the signals and the
    /// progress channels.
    pub fn new<B>(
        db: Database,
        broker: B,
        uploads: UploadStore,
        auth: Authenticator,
        max_upload_bytes: u64,
    ) -> Arc<Self>
    where
        B: WorkQueue + CancelSignals + ProgressBus + 'static,
    {
        let broker = Arc::new(broker);
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            queue: broker.clone(),
            signals: broker.clone(),
            progress: broker,
            uploads,
            auth,
            max_upload_bytes,
        })
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
