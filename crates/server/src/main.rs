// crates/server/src/main.rs
//! Transcription server binary.
//!
//! Reads configuration from the environment, connects the record store and
//! the broker, and serves the API until Ctrl-C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use transcribe_broker::{MemoryBroker, RedisBroker};
use transcribe_db::Database;
use transcribe_server::auth::Authenticator;
use transcribe_server::config::BrokerBackend;
use transcribe_server::storage::UploadStore;
use transcribe_server::{create_app, telemetry, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    telemetry::init_tracing(config.is_development());

    let db = Database::new(&config.database_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_path.display()))?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create upload dir {}", config.upload_dir.display()))?;
    let uploads = UploadStore::new(&config.upload_dir);
    let auth = Authenticator::new(&config.jwt_secret);

    let state = match &config.broker {
        BrokerBackend::Redis { url } => {
            let broker = RedisBroker::connect(url).context("invalid REDIS_URL")?;
            broker.ping().await.context("redis is unreachable")?;
            tracing::info!("connected to redis");
            AppState::new(db.clone(), broker, uploads, auth, config.max_upload_bytes)
        }
        BrokerBackend::Memory => {
            tracing::warn!("using the in-process broker; external workers will not see queued jobs");
            AppState::new(db.clone(), MemoryBroker::new(), uploads, auth, config.max_upload_bytes)
        }
    };

    let app = create_app(Arc::clone(&state));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, env = %config.app_env, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down, closing database pool");
    db.close().await;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
