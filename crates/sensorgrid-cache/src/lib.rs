pub mod cached_repositories;
pub mod entity_cache;
pub mod identity_cache;
pub mod memory;
pub mod store;

pub use cached_repositories::{CachedBindingRepository, CachedDeviceRepository};
pub use entity_cache::{CacheEntity, CachedCollection, EntityCache};
pub use identity_cache::ApiKeyCache;
pub use memory::InMemoryCacheStore;
pub use store::{CacheStore, DEFAULT_TTL};

// Re-export mocks when the testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use store::MockCacheStore;
