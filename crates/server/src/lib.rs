// crates/server/src/lib.rs
//! Transcription job server library.
//!
//! Accepts media uploads, records jobs and hands them to external workers
//! over a queue, serves job snapshots, relays cooperative cancellation, and
//! bridges per-job progress channels to websocket clients.

pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod live;
pub mod routes;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Multipart framing allowance on top of the media size ceiling.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes under `/api`
/// - a request body limit derived from the upload ceiling
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;
    use transcribe_broker::MemoryBroker;
    use transcribe_db::Database;

    use crate::auth::Authenticator;
    use crate::storage::UploadStore;

    async fn app() -> Router {
        let db = Database::new_in_memory().await.expect("in-memory DB");
        let state = AppState::new(
            db,
            MemoryBroker::new(),
            UploadStore::new(std::env::temp_dir()),
            Authenticator::new("secret"),
            1024,
        );
        create_app(state)
    }

    /// Helper to make a GET request to the app.
    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body_str = String::from_utf8(body.to_vec()).unwrap();

        (status, body_str)
    }

    // ========================================================================
    // Health Endpoint Tests
    // ========================================================================

    #[tokio::test]
    async fn test_health_endpoint_response_structure() {
        let (status, body) = get(app().await, "/api/health").await;

        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["message"], "server is running");
        assert!(json["version"].is_string());
        assert!(json["uptime_secs"].is_number());
    }

    #[tokio::test]
    async fn test_health_needs_no_token_but_jobs_do() {
        let (status, body) = get(app().await, "/api/transcribe").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "missing authorization header");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, _) = get(app().await, "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let response = app()
            .await
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/transcribe")
                    .header("Origin", "http://localhost:5173")
                    .header("Access-Control-Request-Method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
    }
}
