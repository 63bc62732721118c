use crate::store::CacheStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Entity types cacheable as a named collection, identified by primary id.
pub trait CacheEntity {
    fn cache_id(&self) -> &str;
}

impl CacheEntity for sensorgrid_domain::Company {
    fn cache_id(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for sensorgrid_domain::User {
    fn cache_id(&self) -> &str {
        &self.id
    }
}

impl CacheEntity for sensorgrid_domain::Device {
    fn cache_id(&self) -> &str {
        &self.device_id
    }
}

/// A whole-collection cache hit, with an id index rebuilt on every load
/// so member lookups stay O(1) instead of hiding an O(n) scan on the
/// request path.
pub struct CachedCollection<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: CacheEntity> CachedCollection<T> {
    fn new(items: Vec<T>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.cache_id().to_string(), i))
            .collect();
        Self { items, index }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Read-through, write-invalidate cache for one named entity collection.
///
/// The collection lives under `cache_key`; a sibling boolean flag lives
/// under `"<app_name>_fetch_list"`. When the flag is true the collection
/// is treated as absent no matter what the store holds: stale-but-present
/// data is never served. Collection and flag are always written together
/// through an atomic multi-key write.
///
/// Mutations are coarse: a cold `add_member` stores a singleton that is
/// immediately flagged for reload (a singleton is not a valid "all"
/// view), and `remove_member` always flags, since removal cannot narrow
/// dependent cached derivations correctly without a reload.
pub struct EntityCache<T> {
    store: Arc<dyn CacheStore>,
    app_name: String,
    cache_key: String,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> EntityCache<T>
where
    T: CacheEntity + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(store: Arc<dyn CacheStore>, app_name: &str, cache_key: &str, ttl: Duration) -> Self {
        Self {
            store,
            app_name: app_name.to_string(),
            cache_key: cache_key.to_string(),
            ttl,
            _marker: PhantomData,
        }
    }

    fn refresh_flag_key(&self) -> String {
        format!("{}_fetch_list", self.app_name)
    }

    /// The cached collection, or `None` when the caller must reload from
    /// the source of truth. Store failures are cache misses, never errors.
    pub async fn get_all(&self) -> Option<CachedCollection<T>> {
        match self.store.get(&self.refresh_flag_key()).await {
            Ok(Some(Value::Bool(false))) => {}
            Ok(_) => {
                debug!(cache_key = %self.cache_key, "refresh flag unset or raised, treating as miss");
                return None;
            }
            Err(e) => {
                warn!(cache_key = %self.cache_key, error = %e, "cache store unavailable, failing open");
                return None;
            }
        }

        self.read_collection().await
    }

    /// Atomically store the collection and its refresh flag.
    pub async fn set_all(&self, items: &[T], needs_refresh: bool) {
        let data = match serde_json::to_value(items) {
            Ok(v) => v,
            Err(e) => {
                warn!(cache_key = %self.cache_key, error = %e, "failed to serialize collection");
                return;
            }
        };
        let entries = vec![
            (self.cache_key.clone(), data),
            (self.refresh_flag_key(), Value::Bool(needs_refresh)),
        ];
        if let Err(e) = self.store.set_many(entries, self.ttl).await {
            warn!(cache_key = %self.cache_key, error = %e, "cache write failed");
        }
    }

    /// Member lookup through the rebuilt id index.
    pub async fn get_member(&self, id: &str) -> Option<T>
    where
        T: Clone,
    {
        self.get_all().await?.get(id).cloned()
    }

    /// Merge one entity into the cached collection.
    ///
    /// When the collection is cold, stores a singleton flagged
    /// `needs_refresh` so the next `get_all` misses and reloads.
    pub async fn add_member(&self, item: T) {
        match self.get_all().await {
            Some(collection) => {
                let mut items = collection.into_items();
                match items
                    .iter_mut()
                    .find(|existing| existing.cache_id() == item.cache_id())
                {
                    Some(existing) => *existing = item,
                    None => items.push(item),
                }
                self.set_all(&items, false).await;
            }
            None => {
                debug!(cache_key = %self.cache_key, "add_member on cold collection, flagging for reload");
                self.set_all(&[item], true).await;
            }
        }
    }

    /// Remove one entity from the cached collection and flag the whole
    /// collection for reload.
    pub async fn remove_member(&self, id: &str) {
        let Some(collection) = self.read_collection().await else {
            return;
        };
        let mut items = collection.into_items();
        let before = items.len();
        items.retain(|item| item.cache_id() != id);
        if items.len() != before {
            self.set_all(&items, true).await;
        }
    }

    // Raw collection read, ignoring the refresh flag. Used by mutations
    // that must see flagged data to rewrite it.
    async fn read_collection(&self) -> Option<CachedCollection<T>> {
        let value = match self.store.get(&self.cache_key).await {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                warn!(cache_key = %self.cache_key, error = %e, "cache store unavailable, failing open");
                return None;
            }
        };
        match serde_json::from_value::<Vec<T>>(value) {
            Ok(items) => Some(CachedCollection::new(items)),
            Err(e) => {
                warn!(cache_key = %self.cache_key, error = %e, "cached collection failed to deserialize");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCacheStore;
    use crate::store::{MockCacheStore, DEFAULT_TTL};
    use sensorgrid_domain::Company;

    fn company(id: &str, slug: &str) -> Company {
        Company {
            id: id.to_string(),
            name: slug.to_string(),
            slug: slug.to_string(),
            email: format!("{slug}@example.com"),
            created_at: None,
            updated_at: None,
        }
    }

    fn cache(store: Arc<dyn CacheStore>) -> EntityCache<Company> {
        EntityCache::new(store, "companies", "companies_all", DEFAULT_TTL)
    }

    #[tokio::test]
    async fn test_set_all_then_get_all() {
        let cache = cache(Arc::new(InMemoryCacheStore::new()));
        cache
            .set_all(&[company("c-1", "acme-co"), company("c-2", "globex")], false)
            .await;

        let collection = cache.get_all().await.unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get("c-2").unwrap().slug, "globex");
    }

    #[tokio::test]
    async fn test_needs_refresh_hides_present_data() {
        let cache = cache(Arc::new(InMemoryCacheStore::new()));
        cache.set_all(&[company("c-1", "acme-co")], true).await;
        assert!(cache.get_all().await.is_none());
    }

    #[tokio::test]
    async fn test_cold_add_member_forces_miss() {
        let cache = cache(Arc::new(InMemoryCacheStore::new()));
        cache.add_member(company("c-1", "acme-co")).await;
        // A singleton must never masquerade as the full set
        assert!(cache.get_all().await.is_none());
    }

    #[tokio::test]
    async fn test_warm_add_member_merges() {
        let cache = cache(Arc::new(InMemoryCacheStore::new()));
        cache.set_all(&[company("c-1", "acme-co")], false).await;
        cache.add_member(company("c-2", "globex")).await;

        let collection = cache.get_all().await.unwrap();
        assert_eq!(collection.len(), 2);
    }

    #[tokio::test]
    async fn test_warm_add_member_replaces_same_id() {
        let cache = cache(Arc::new(InMemoryCacheStore::new()));
        cache.set_all(&[company("c-1", "acme-co")], false).await;
        cache.add_member(company("c-1", "acme-renamed")).await;

        let collection = cache.get_all().await.unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("c-1").unwrap().slug, "acme-renamed");
    }

    #[tokio::test]
    async fn test_remove_member_flags_reload() {
        let cache = cache(Arc::new(InMemoryCacheStore::new()));
        cache
            .set_all(&[company("c-1", "acme-co"), company("c-2", "globex")], false)
            .await;
        cache.remove_member("c-1").await;

        // Removal never narrows correctly without a reload
        assert!(cache.get_all().await.is_none());
    }

    #[tokio::test]
    async fn test_get_member_uses_index() {
        let cache = cache(Arc::new(InMemoryCacheStore::new()));
        cache
            .set_all(&[company("c-1", "acme-co"), company("c-2", "globex")], false)
            .await;

        assert_eq!(cache.get_member("c-1").await.unwrap().slug, "acme-co");
        assert!(cache.get_member("c-9").await.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_a_miss() {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .returning(|_| Err(anyhow::anyhow!("store unreachable")));

        let cache = cache(Arc::new(store));
        assert!(cache.get_all().await.is_none());
        assert!(cache.get_member("c-1").await.is_none());
    }

    #[tokio::test]
    async fn test_store_write_failure_swallowed() {
        let mut store = MockCacheStore::new();
        store
            .expect_get()
            .returning(|_| Err(anyhow::anyhow!("store unreachable")));
        store
            .expect_set_many()
            .returning(|_, _| Err(anyhow::anyhow!("store unreachable")));

        let cache = cache(Arc::new(store));
        // Must not panic or surface an error
        cache.add_member(company("c-1", "acme-co")).await;
    }
}
