//! Secondary index maintenance.
//!
//! Indexes are ordered id-lists stored as JSON arrays under derived keys
//! (`blog:all_posts`, `blog:author:{id}:posts`, `course:{id}:materials`, ...).
//! Every mutation is a read-modify-write against the KV store; the store
//! offers no compare-and-swap, so mutations of the same index key are
//! serialized behind a per-key lock. Ordering is newest-first; read paths
//! re-sort by entity timestamp, so list order is not the sole source of
//! presentation order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::kv::{KvStore, StoreError};

pub struct IndexManager {
    kv: Arc<dyn KvStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IndexManager {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Read the id list under `key`, defaulting to empty when absent.
    pub async fn ids(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.kv.get(key).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_ids(&self, key: &str, ids: Vec<String>) -> Result<(), StoreError> {
        self.kv.set(key, serde_json::to_value(ids)?).await
    }

    /// Prepend `id` to the list under `key`. No-op if already present, so an
    /// id appears in any index at most once.
    pub async fn add(&self, key: &str, id: &str) -> Result<(), StoreError> {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let mut ids = self.ids(key).await?;
        if ids.iter().any(|existing| existing == id) {
            return Ok(());
        }
        ids.insert(0, id.to_string());
        self.write_ids(key, ids).await
    }

    /// Remove `id` from the list under `key`. No-op if absent.
    pub async fn remove(&self, key: &str, id: &str) -> Result<(), StoreError> {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let mut ids = self.ids(key).await?;
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() == before {
            return Ok(());
        }
        self.write_ids(key, ids).await
    }

    /// Move `id` between two index keys. Used when an index-relevant field
    /// (e.g. a blog post's category) changes.
    pub async fn move_entry(&self, old_key: &str, new_key: &str, id: &str) -> Result<(), StoreError> {
        self.remove(old_key, id).await?;
        self.add(new_key, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    fn manager() -> IndexManager {
        IndexManager::new(Arc::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn add_prepends_newest_first() {
        let indexes = manager();
        indexes.add("posts", "a").await.unwrap();
        indexes.add("posts", "b").await.unwrap();
        indexes.add("posts", "c").await.unwrap();

        assert_eq!(indexes.ids("posts").await.unwrap(), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let indexes = manager();
        indexes.add("posts", "a").await.unwrap();
        indexes.add("posts", "a").await.unwrap();

        assert_eq!(indexes.ids("posts").await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn remove_filters_and_tolerates_absence() {
        let indexes = manager();
        indexes.add("posts", "a").await.unwrap();
        indexes.add("posts", "b").await.unwrap();

        indexes.remove("posts", "a").await.unwrap();
        assert_eq!(indexes.ids("posts").await.unwrap(), vec!["b"]);

        indexes.remove("posts", "missing").await.unwrap();
        assert_eq!(indexes.ids("posts").await.unwrap(), vec!["b"]);

        indexes.remove("empty", "anything").await.unwrap();
        assert!(indexes.ids("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn move_entry_switches_lists_exactly_once() {
        let indexes = manager();
        indexes.add("category:Football", "p1").await.unwrap();

        indexes
            .move_entry("category:Football", "category:Athletics", "p1")
            .await
            .unwrap();

        assert!(indexes.ids("category:Football").await.unwrap().is_empty());
        assert_eq!(
            indexes.ids("category:Athletics").await.unwrap(),
            vec!["p1"]
        );
    }

    #[tokio::test]
    async fn concurrent_adds_to_one_key_all_land() {
        let indexes = Arc::new(manager());

        let mut handles = Vec::new();
        for i in 0..32 {
            let indexes = Arc::clone(&indexes);
            handles.push(tokio::spawn(async move {
                indexes.add("posts", &format!("id-{i}")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut ids = indexes.ids("posts").await.unwrap();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 32);
    }
}
