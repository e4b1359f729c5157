// crates/broker/src/error.rs
use deadpool_redis::redis::RedisError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Malformed queue descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
}

pub type BrokerResult<T> = Result<T, BrokerError>;
