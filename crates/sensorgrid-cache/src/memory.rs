use crate::store::CacheStore;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct StoredEntry {
    value: Value,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory implementation of [`CacheStore`] backed by a HashMap.
///
/// Expired entries are treated as absent on read and purged on write.
/// `set_many` holds the write lock for the whole batch, which gives the
/// multi-key atomicity the entity cache relies on.
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(Instant::now()))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        self.set_many(vec![(key.to_string(), value)], ttl).await
    }

    async fn set_many(&self, batch: Vec<(String, Value)>, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| !e.is_expired(now));
        for (key, value) in batch {
            entries.insert(
                key,
                StoredEntry {
                    value,
                    expires_at: now + ttl,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryCacheStore::new();
        store
            .set("k", json!({"a": 1}), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 1})));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_absent() {
        let store = InMemoryCacheStore::new();
        store
            .set("k", json!(1), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_many_writes_all() {
        let store = InMemoryCacheStore::new();
        store
            .set_many(
                vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))],
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));
        assert_eq!(store.get("b").await.unwrap(), Some(json!(2)));
    }
}
