use crate::store::CacheStore;
use sensorgrid_domain::{digest_api_key, DomainResult, Principal, PrincipalSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Read-through cache mapping an opaque API key to its principal.
///
/// The raw key never touches the store: entries are keyed by the
/// SHA-256 hex digest, so the backend and anything reading it never see
/// the plaintext credential. Each entry is an independent single value;
/// credentials are keyed by an unpredictable external string, so there
/// is no enumerable collection to cache wholesale.
pub struct ApiKeyCache {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn PrincipalSource>,
    ttl: Duration,
}

impl ApiKeyCache {
    pub fn new(store: Arc<dyn CacheStore>, source: Arc<dyn PrincipalSource>, ttl: Duration) -> Self {
        Self { store, source, ttl }
    }

    pub async fn resolve_by_api_key(&self, raw_key: &str) -> DomainResult<Option<Principal>> {
        let digest = digest_api_key(raw_key);

        match self.store.get(&digest).await {
            Ok(Some(value)) => match serde_json::from_value::<Principal>(value) {
                Ok(principal) => {
                    debug!(key_digest = %digest, "credential cache hit");
                    return Ok(Some(principal));
                }
                Err(e) => {
                    warn!(key_digest = %digest, error = %e, "cached principal failed to deserialize");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(key_digest = %digest, error = %e, "cache store unavailable, failing open");
            }
        }

        let principal = self.source.find_by_api_key(raw_key).await?;

        if let Some(principal) = &principal {
            match serde_json::to_value(principal) {
                Ok(value) => {
                    if let Err(e) = self.store.set(&digest, value, self.ttl).await {
                        warn!(key_digest = %digest, error = %e, "failed to populate credential cache");
                    }
                }
                Err(e) => warn!(key_digest = %digest, error = %e, "failed to serialize principal"),
            }
        }

        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCacheStore;
    use crate::store::DEFAULT_TTL;
    use sensorgrid_domain::{Device, MockPrincipalSource};

    fn device_principal() -> Principal {
        Principal::Device(Device {
            device_id: "dev-1".to_string(),
            name: "Pump 1".to_string(),
            company_id: Some("c-1".to_string()),
            user_id: None,
            api_key_digest: digest_api_key("raw-key"),
            created_at: None,
            updated_at: None,
        })
    }

    #[tokio::test]
    async fn test_miss_populates_then_hits() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut source = MockPrincipalSource::new();
        // Source of truth consulted exactly once across two resolves
        source
            .expect_find_by_api_key()
            .times(1)
            .return_once(|_| Ok(Some(device_principal())));

        let cache = ApiKeyCache::new(store.clone(), Arc::new(source), DEFAULT_TTL);

        let first = cache.resolve_by_api_key("raw-key").await.unwrap();
        assert!(first.is_some());
        let second = cache.resolve_by_api_key("raw-key").await.unwrap();
        assert_eq!(second.unwrap().id(), "dev-1");
    }

    #[tokio::test]
    async fn test_plaintext_never_used_as_key() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut source = MockPrincipalSource::new();
        source
            .expect_find_by_api_key()
            .times(1)
            .return_once(|_| Ok(Some(device_principal())));

        let cache = ApiKeyCache::new(store.clone(), Arc::new(source), DEFAULT_TTL);
        cache.resolve_by_api_key("raw-key").await.unwrap();

        use crate::store::CacheStore;
        assert!(store.get("raw-key").await.unwrap().is_none());
        assert!(store
            .get(&digest_api_key("raw-key"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_unknown_key_absent() {
        let store = Arc::new(InMemoryCacheStore::new());
        let mut source = MockPrincipalSource::new();
        source
            .expect_find_by_api_key()
            .times(1)
            .return_once(|_| Ok(None));

        let cache = ApiKeyCache::new(store, Arc::new(source), DEFAULT_TTL);
        assert!(cache.resolve_by_api_key("nope").await.unwrap().is_none());
    }
}
