//! Key-value store capability.
//!
//! The store owns the authoritative copy of every entity and every index
//! list. Handlers only read-modify-write through this interface, so tests
//! (and alternative deployments) can substitute [`MemoryKv`] for the Redis
//! backend.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde_json::Value;

use crate::config::RedisConfig;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryKv;
pub use redis_store::RedisKv;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Structured key-value storage. Values are JSON records, not raw bytes;
/// implementations handle serialization. No compare-and-swap primitive is
/// assumed, so callers that read-modify-write shared keys must serialize
/// access themselves (see `IndexManager`).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Connect to Redis and verify the connection with a PING.
pub async fn connect(config: &RedisConfig) -> anyhow::Result<RedisKv> {
    let client = redis::Client::open(config.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    Ok(RedisKv::new(manager))
}
