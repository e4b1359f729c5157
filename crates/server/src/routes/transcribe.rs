// crates/server/src/routes/transcribe.rs
//! Transcription job endpoints.
//!
//! - POST   /transcribe                 - submit a media file (multipart `audio`)
//! - GET    /transcribe                 - page through the caller's jobs
//! - GET    /transcribe/{job_id}        - one job snapshot
//! - POST   /transcribe/{job_id}/cancel - request cancellation
//! - DELETE /transcribe/{job_id}        - delete a job and its media

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use transcribe_core::{check_size, validate_extension, JobView, PageRequest, UploadError};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::jobs::{
    self, cancel::CANCELLED_MESSAGE, parse_job_id, JobPage, UploadedFile, SUBMITTED_MESSAGE,
};
use crate::state::AppState;

/// Multipart field carrying the media file.
pub const AUDIO_FIELD: &str = "audio";

pub const DELETED_MESSAGE: &str = "job deleted successfully";

/// Raw listing parameters. Values that do not parse as integers are treated
/// as absent rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        PageRequest::clamped(parse(&self.page), parse(&self.page_size))
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/transcribe - store the upload and queue a job (201).
async fn submit(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<JobView>)> {
    let upload = read_audio_field(&mut multipart, state.max_upload_bytes).await?;
    let job = jobs::submit_job(&state, user.user_id, upload).await?;
    Ok((
        StatusCode::CREATED,
        Json(JobView::from(&job).with_message(SUBMITTED_MESSAGE)),
    ))
}

/// Read the `audio` field, rejecting a bad extension before the body and an
/// oversized body as soon as it crosses `limit`.
async fn read_audio_field(multipart: &mut Multipart, limit: u64) -> ApiResult<UploadedFile> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        validate_extension(&file_name)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            bytes.extend_from_slice(&chunk);
            check_size(bytes.len() as u64, limit)?;
        }
        return Ok(UploadedFile { file_name, bytes });
    }
    Err(UploadError::Missing.into())
}

/// GET /api/transcribe?page=&page_size=
async fn list(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<JobPage>> {
    let page = jobs::list_jobs(&state, user.user_id, query.page_request()).await?;
    Ok(Json(page))
}

/// GET /api/transcribe/{job_id}
async fn status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let job = jobs::get_owned_job(&state, parse_job_id(&job_id)?, user.user_id).await?;
    Ok(Json(JobView::from(&job)))
}

/// POST /api/transcribe/{job_id}/cancel
async fn cancel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let job = jobs::cancel_job(&state, parse_job_id(&job_id)?, user.user_id).await?;
    Ok(Json(JobView::from(&job).with_message(CANCELLED_MESSAGE)))
}

/// DELETE /api/transcribe/{job_id}
async fn delete(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    jobs::delete_job(&state, parse_job_id(&job_id)?, user.user_id).await?;
    Ok(Json(MessageResponse {
        message: DELETED_MESSAGE.to_string(),
    }))
}

/// Build the transcription router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/transcribe", post(submit).get(list))
        .route("/transcribe/{job_id}", get(status).delete(delete))
        .route("/transcribe/{job_id}/cancel", post(cancel))
}
