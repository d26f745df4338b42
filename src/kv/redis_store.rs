use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

use super::{KvStore, StoreError};

/// Redis-backed store. Records are stored as JSON strings; the connection
/// manager reconnects on its own, so a clone per call is all that is needed.
#[derive(Clone)]
pub struct RedisKv {
    manager: ConnectionManager,
}

impl RedisKv {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let json = serde_json::to_string(&value)?;
        let _: () = conn.set(key, json).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
