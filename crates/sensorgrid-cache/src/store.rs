use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Default expiry for cached entries: one week.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Underlying key/value store behind every cache in the system.
///
/// The store is constructed once at startup and injected into each
/// component; no process-wide singleton. Callers above this trait treat
/// any error as a cache miss and fall through to the source of truth —
/// a broken store degrades throughput, never correctness.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Atomic multi-key write: either every entry lands or none does.
    /// Collection data and its refresh flag are always written through
    /// here so readers never observe the two disagreeing.
    async fn set_many(&self, entries: Vec<(String, Value)>, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}
