// crates/server/src/config.rs
//! Process configuration read from the environment (and an optional `.env`).

use std::path::PathBuf;

use thiserror::Error;
use transcribe_core::DEFAULT_MAX_UPLOAD_BYTES;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Which broker backs the queue, cancellation signals and progress channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerBackend {
    Redis { url: String },
    /// Single-process broker; only useful when the workers live in-process.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub app_env: String,
    pub port: u16,
    /// SQLite database file.
    pub database_path: PathBuf,
    pub broker: BrokerBackend,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: u64,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_err() {
            tracing::debug!("no .env file found, reading from environment variables");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let app_env = get("APP_ENV").unwrap_or_else(|| "development".to_string());

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
                reason: "expected a port number",
            })?,
            None => DEFAULT_PORT,
        };

        let database_url = require("DATABASE_URL")?;
        let database_path = PathBuf::from(
            database_url
                .strip_prefix("sqlite://")
                .or_else(|| database_url.strip_prefix("sqlite:"))
                .unwrap_or(&database_url),
        );

        let broker = match get("BROKER").as_deref() {
            None | Some("redis") => BrokerBackend::Redis {
                url: require("REDIS_URL")?,
            },
            Some("memory") => BrokerBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "BROKER",
                    value: other.to_string(),
                    reason: "expected \"redis\" or \"memory\"",
                })
            }
        };

        let jwt_secret = require("JWT_SECRET")?;
        let upload_dir = PathBuf::from(require("UPLOAD_DIR")?);

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "MAX_UPLOAD_BYTES",
                        value: raw,
                        reason: "expected a positive byte count",
                    })
                }
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            app_env,
            port,
            database_path,
            broker,
            jwt_secret,
            upload_dir,
            max_upload_bytes,
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
