use anyhow::Result;
use async_trait::async_trait;

/// Key/value contract the engine needs from whatever owns the cache.
/// Payloads are serialized [`GroupedMedia`](crate::media::GroupedMedia)
/// records keyed by canonical URL; expiry is the store's eviction policy.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
}
