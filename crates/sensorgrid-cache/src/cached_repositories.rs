use crate::entity_cache::EntityCache;
use crate::store::CacheStore;
use async_trait::async_trait;
use sensorgrid_domain::{
    BindingRepository, CompanyRepository, CreateBindingInput, CreateDeviceInput, Device,
    DeviceRepository, DomainResult, FieldSensorBinding, GetDeviceInput, ListBindingsInput, Owner,
    UserRepository,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

async fn cached_get<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> Option<T> {
    match store.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(items) => Some(items),
            Err(e) => {
                warn!(cache_key = %key, error = %e, "cached value failed to deserialize");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(cache_key = %key, error = %e, "cache store unavailable, failing open");
            None
        }
    }
}

async fn cached_set<T: Serialize>(store: &dyn CacheStore, key: &str, items: &T, ttl: Duration) {
    match serde_json::to_value(items) {
        Ok(value) => {
            if let Err(e) = store.set(key, value, ttl).await {
                warn!(cache_key = %key, error = %e, "cache write failed");
            }
        }
        Err(e) => warn!(cache_key = %key, error = %e, "failed to serialize cached value"),
    }
}

async fn invalidate(store: &dyn CacheStore, key: &str) {
    if let Err(e) = store.delete(key).await {
        warn!(cache_key = %key, error = %e, "cache invalidation failed");
    }
}

/// Per-device binding list cache key, e.g. `"device_sensors_dev-1"`.
fn binding_cache_key(device_id: &str) -> String {
    format!("device_sensors_{device_id}")
}

/// Per-tenant device list cache key, e.g. `"company_devices_acme-co"`.
fn device_list_cache_key(owner: &Owner) -> String {
    match owner {
        Owner::Company { .. } => owner.scoped_cache_key("company_devices"),
        Owner::User { .. } => owner.scoped_cache_key("user_devices"),
    }
}

/// Read-through decorator over a [`BindingRepository`]: binding lists are
/// cached per device, and any mutation invalidates the device's entry
/// rather than patching it in place.
pub struct CachedBindingRepository {
    inner: Arc<dyn BindingRepository>,
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CachedBindingRepository {
    pub fn new(inner: Arc<dyn BindingRepository>, store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { inner, store, ttl }
    }
}

#[async_trait]
impl BindingRepository for CachedBindingRepository {
    async fn create_binding(&self, input: CreateBindingInput) -> DomainResult<FieldSensorBinding> {
        let key = binding_cache_key(&input.device_id);
        let binding = self.inner.create_binding(input).await?;
        invalidate(self.store.as_ref(), &key).await;
        Ok(binding)
    }

    async fn list_bindings(
        &self,
        input: ListBindingsInput,
    ) -> DomainResult<Vec<FieldSensorBinding>> {
        let key = binding_cache_key(&input.device_id);
        if let Some(bindings) = cached_get::<Vec<FieldSensorBinding>>(self.store.as_ref(), &key).await
        {
            debug!(cache_key = %key, "binding cache hit");
            return Ok(bindings);
        }

        let bindings = self.inner.list_bindings(input).await?;
        cached_set(self.store.as_ref(), &key, &bindings, self.ttl).await;
        Ok(bindings)
    }
}

/// Read-through decorator over a [`DeviceRepository`]: per-tenant device
/// lists are cached as entity collections under the owner's scoped key,
/// with registration merging into the warm collection (or flagging a
/// cold one for reload) through the [`EntityCache`] protocol.
pub struct CachedDeviceRepository {
    inner: Arc<dyn DeviceRepository>,
    user_repository: Arc<dyn UserRepository>,
    company_repository: Arc<dyn CompanyRepository>,
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CachedDeviceRepository {
    pub fn new(
        inner: Arc<dyn DeviceRepository>,
        user_repository: Arc<dyn UserRepository>,
        company_repository: Arc<dyn CompanyRepository>,
        store: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner,
            user_repository,
            company_repository,
            store,
            ttl,
        }
    }

    fn device_list_cache(&self, key: &str) -> EntityCache<Device> {
        EntityCache::new(self.store.clone(), key, key, self.ttl)
    }

    // Map the new device's owner id to the slug/username the list cache
    // is keyed by. Lookup failures skip the cache update: the entry still
    // expires via TTL, and a stale list here only delays visibility of
    // the new device, never leaks across tenants.
    async fn owner_key_for(&self, input: &CreateDeviceInput) -> Option<String> {
        if let Some(company_id) = &input.company_id {
            let company = self
                .company_repository
                .get_company_by_id(company_id)
                .await
                .ok()??;
            return Some(device_list_cache_key(&Owner::Company { slug: company.slug }));
        }
        if let Some(user_id) = &input.user_id {
            let user = self.user_repository.get_user_by_id(user_id).await.ok()??;
            return Some(device_list_cache_key(&Owner::User {
                username: user.username,
            }));
        }
        None
    }
}

#[async_trait]
impl DeviceRepository for CachedDeviceRepository {
    async fn create_device(&self, input: CreateDeviceInput) -> DomainResult<Device> {
        let owner_key = self.owner_key_for(&input).await;
        let device = self.inner.create_device(input).await?;
        if let Some(key) = owner_key {
            self.device_list_cache(&key).add_member(device.clone()).await;
        }
        Ok(device)
    }

    async fn get_device(&self, input: GetDeviceInput) -> DomainResult<Option<Device>> {
        self.inner.get_device(input).await
    }

    async fn list_devices_for_owner(&self, owner: &Owner) -> DomainResult<Vec<Device>> {
        let key = device_list_cache_key(owner);
        let cache = self.device_list_cache(&key);
        if let Some(collection) = cache.get_all().await {
            debug!(cache_key = %key, "device list cache hit");
            return Ok(collection.into_items());
        }

        let devices = self.inner.list_devices_for_owner(owner).await?;
        cache.set_all(&devices, false).await;
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCacheStore;
    use crate::store::DEFAULT_TTL;
    use sensorgrid_domain::{
        MockBindingRepository, MockCompanyRepository, MockDeviceRepository, MockUserRepository,
    };

    fn binding(field: &str) -> FieldSensorBinding {
        FieldSensorBinding {
            device_id: "dev-1".to_string(),
            field_name: field.to_string(),
            field_number: 1,
            sensor_name: format!("sensor-{field}"),
            min_limit: None,
            max_limit: None,
            is_boolean: false,
        }
    }

    #[tokio::test]
    async fn test_binding_list_cached_after_first_load() {
        let mut inner = MockBindingRepository::new();
        inner
            .expect_list_bindings()
            .times(1)
            .return_once(|_| Ok(vec![binding("field1")]));

        let repo = CachedBindingRepository::new(
            Arc::new(inner),
            Arc::new(InMemoryCacheStore::new()),
            DEFAULT_TTL,
        );

        let input = ListBindingsInput {
            device_id: "dev-1".to_string(),
        };
        let first = repo.list_bindings(input.clone()).await.unwrap();
        let second = repo.list_bindings(input).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_create_binding_invalidates_device_entry() {
        let mut inner = MockBindingRepository::new();
        inner
            .expect_list_bindings()
            .times(2)
            .returning(|_| Ok(vec![binding("field1")]));
        inner
            .expect_create_binding()
            .times(1)
            .return_once(|_| Ok(binding("field2")));

        let repo = CachedBindingRepository::new(
            Arc::new(inner),
            Arc::new(InMemoryCacheStore::new()),
            DEFAULT_TTL,
        );

        let input = ListBindingsInput {
            device_id: "dev-1".to_string(),
        };
        repo.list_bindings(input.clone()).await.unwrap();
        repo.create_binding(CreateBindingInput {
            device_id: "dev-1".to_string(),
            field_name: "field2".to_string(),
            field_number: 2,
            sensor_name: "sensor-field2".to_string(),
            min_limit: None,
            max_limit: None,
            is_boolean: false,
        })
        .await
        .unwrap();
        // Second list must reach the inner repository again
        repo.list_bindings(input).await.unwrap();
    }

    #[tokio::test]
    async fn test_device_list_cached_per_owner() {
        let mut inner = MockDeviceRepository::new();
        inner
            .expect_list_devices_for_owner()
            .times(1)
            .return_once(|_| Ok(vec![]));

        let repo = CachedDeviceRepository::new(
            Arc::new(inner),
            Arc::new(MockUserRepository::new()),
            Arc::new(MockCompanyRepository::new()),
            Arc::new(InMemoryCacheStore::new()),
            DEFAULT_TTL,
        );

        let owner = Owner::Company {
            slug: "acme-co".to_string(),
        };
        repo.list_devices_for_owner(&owner).await.unwrap();
        repo.list_devices_for_owner(&owner).await.unwrap();
    }

    fn acme_device(device_id: &str) -> Device {
        Device {
            device_id: device_id.to_string(),
            name: device_id.to_string(),
            company_id: Some("c-1".to_string()),
            user_id: None,
            api_key_digest: "digest".to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    fn acme_company_repo() -> MockCompanyRepository {
        let mut companies = MockCompanyRepository::new();
        companies.expect_get_company_by_id().returning(|id: &str| {
            Ok(Some(sensorgrid_domain::Company {
                id: id.to_string(),
                name: "Acme Co".to_string(),
                slug: "acme-co".to_string(),
                email: "ops@acme.example".to_string(),
                created_at: None,
                updated_at: None,
            }))
        });
        companies
    }

    fn create_input(device_id: &str) -> CreateDeviceInput {
        CreateDeviceInput {
            device_id: device_id.to_string(),
            name: device_id.to_string(),
            company_id: Some("c-1".to_string()),
            user_id: None,
            api_key_digest: "digest".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_into_warm_list_merges_without_reload() {
        let mut inner = MockDeviceRepository::new();
        inner
            .expect_list_devices_for_owner()
            .times(1)
            .return_once(|_| Ok(vec![acme_device("dev-1")]));
        inner
            .expect_create_device()
            .return_once(|_| Ok(acme_device("dev-2")));

        let repo = CachedDeviceRepository::new(
            Arc::new(inner),
            Arc::new(MockUserRepository::new()),
            Arc::new(acme_company_repo()),
            Arc::new(InMemoryCacheStore::new()),
            DEFAULT_TTL,
        );

        let owner = Owner::Company {
            slug: "acme-co".to_string(),
        };
        repo.list_devices_for_owner(&owner).await.unwrap();
        repo.create_device(create_input("dev-2")).await.unwrap();

        let devices = repo.list_devices_for_owner(&owner).await.unwrap();
        assert_eq!(devices.len(), 2);
    }

    #[tokio::test]
    async fn test_register_into_cold_list_forces_reload() {
        let mut inner = MockDeviceRepository::new();
        inner
            .expect_create_device()
            .return_once(|_| Ok(acme_device("dev-1")));
        // The list after a cold registration must come from the source
        inner
            .expect_list_devices_for_owner()
            .times(1)
            .return_once(|_| Ok(vec![acme_device("dev-1")]));

        let repo = CachedDeviceRepository::new(
            Arc::new(inner),
            Arc::new(MockUserRepository::new()),
            Arc::new(acme_company_repo()),
            Arc::new(InMemoryCacheStore::new()),
            DEFAULT_TTL,
        );

        repo.create_device(create_input("dev-1")).await.unwrap();
        let owner = Owner::Company {
            slug: "acme-co".to_string(),
        };
        let devices = repo.list_devices_for_owner(&owner).await.unwrap();
        assert_eq!(devices.len(), 1);
    }
}
