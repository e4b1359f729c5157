// crates/server/src/routes/live.rs
//! Live job progress endpoint.
//!
//! - `WS /ws/job/{job_id}` - snapshot, then every progress payload for the job

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::jobs::parse_job_id;
use crate::live::relay_job_progress;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Bearer token for clients that cannot set headers on the upgrade.
    pub token: Option<String>,
}

/// GET /api/ws/job/{job_id} - authenticate, then upgrade.
///
/// Authentication failures and malformed ids are plain HTTP errors. Missing
/// jobs and ownership mismatches are reported on the socket after the upgrade.
async fn ws_job_progress(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let claims = state.auth.authenticate(&headers, query.token.as_deref())?;
    let job_id = parse_job_id(&job_id)?;
    let owner_id = claims.user_id;
    Ok(ws.on_upgrade(move |socket| relay_job_progress(socket, state, job_id, owner_id)))
}

/// Build the live progress router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws/job/{job_id}", get(ws_job_progress))
}
