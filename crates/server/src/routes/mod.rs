//! API route handlers for the transcription server.

pub mod health;
pub mod live;
pub mod transcribe;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET    /api/health - Health check (no auth)
/// - POST   /api/transcribe - Submit a media file (multipart `audio`)
/// - GET    /api/transcribe - Paginated list of the caller's jobs
/// - GET    /api/transcribe/:job_id - Job snapshot
/// - POST   /api/transcribe/:job_id/cancel - Request cancellation
/// - DELETE /api/transcribe/:job_id - Delete a job and its media
/// - GET    /api/ws/job/:job_id - WebSocket live progress
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", transcribe::router())
        .nest("/api", live::router())
        .with_state(state)
}
