use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::media::{GroupedMedia, Media};
use crate::storage::Storage;

/// Outcome of a cache check. Extractors branch on this explicitly; a `Hit`
/// ends their remaining extraction work.
#[derive(Debug)]
pub enum CacheLookup {
    Hit(Vec<Media>),
    Miss,
}

/// Dedup checkpoint keyed by canonical URL. Handed to every extractor so it
/// can be consulted mid-resolution, once the canonical URL is known (some
/// extractors only learn it after following a short link).
///
/// Store errors never surface: an unavailable cache behaves like no cache.
#[derive(Clone)]
pub struct MediaCache {
    store: Option<Arc<dyn Storage>>,
    ttl_secs: i64,
    reads_enabled: bool,
}

impl MediaCache {
    pub fn new(store: Arc<dyn Storage>, ttl_secs: i64) -> Self {
        Self { store: Some(store), ttl_secs, reads_enabled: true }
    }

    /// A gate with no backing store: every lookup misses, every store is a
    /// pass-through.
    pub fn disabled() -> Self {
        Self { store: None, ttl_secs: 0, reads_enabled: true }
    }

    /// Per-request variant; `use_cache = false` skips reads but keeps writes.
    pub fn for_request(&self, use_cache: bool) -> Self {
        let mut gate = self.clone();
        gate.reads_enabled = use_cache;
        gate
    }

    pub async fn lookup(&self, canonical_url: &str) -> CacheLookup {
        let Some(store) = &self.store else { return CacheLookup::Miss };
        if !self.reads_enabled || canonical_url.is_empty() {
            return CacheLookup::Miss;
        }
        match store.get_cache(canonical_url, current_epoch()).await {
            Ok(Some(payload)) => match serde_json::from_str::<GroupedMedia>(&payload) {
                Ok(group) => {
                    info!(key = canonical_url, items = group.len(), "cache hit");
                    CacheLookup::Hit(group.flat())
                }
                Err(e) => {
                    warn!(key = canonical_url, error = %e, "discarding unreadable cache record");
                    CacheLookup::Miss
                }
            },
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                warn!(key = canonical_url, error = format!("{e:#}"), "cache unavailable, continuing without it");
                CacheLookup::Miss
            }
        }
    }

    /// Persists the items under their shared canonical URL and returns them
    /// unchanged, so extractors can chain it into their return path. A later
    /// store for the same key overwrites the record.
    pub async fn store(&self, items: Vec<Media>) -> Vec<Media> {
        let Some(store) = &self.store else { return items };
        let Some(first) = items.first() else { return items };

        let key = first.original_url().to_string();
        let group = GroupedMedia::from_items(items.clone());
        let payload = match serde_json::to_string(&group) {
            Ok(p) => p,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache record");
                return items;
            }
        };
        let now = current_epoch();
        match store.put_cache(&key, &payload, now + self.ttl_secs).await {
            Ok(()) => debug!(key, items = items.len(), "saved to cache"),
            Err(e) => warn!(key, error = format!("{e:#}"), "cache store failed, returning items anyway"),
        }
        items
    }
}

fn current_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ExtractorKind, Image, Video};
    use crate::test_support::MemoryStore;

    fn video(original: &str) -> Media {
        Media::Video(Video::new(ExtractorKind::TikTok, original, "https://cdn.example/v.mp4"))
    }

    fn image(original: &str) -> Media {
        Media::Image(Image::new(ExtractorKind::TikTok, original, "https://cdn.example/i.jpg"))
    }

    #[tokio::test]
    async fn store_then_lookup_hits() {
        let gate = MediaCache::new(Arc::new(MemoryStore::default()), 60);
        let url = "https://www.tiktok.com/@foo/video/123456";

        let returned = gate.store(vec![video(url)]).await;
        assert_eq!(returned.len(), 1); // pass-through

        match gate.lookup(url).await {
            CacheLookup::Hit(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].original_url(), url);
            }
            CacheLookup::Miss => panic!("expected a hit"),
        }
    }

    #[tokio::test]
    async fn later_store_overwrites_instead_of_merging() {
        let gate = MediaCache::new(Arc::new(MemoryStore::default()), 60);
        let url = "https://www.tiktok.com/@foo/video/123456";

        gate.store(vec![video(url)]).await;
        gate.store(vec![image(url)]).await;

        match gate.lookup(url).await {
            CacheLookup::Hit(items) => {
                assert_eq!(items.len(), 1);
                assert!(matches!(items[0], Media::Image(_)));
            }
            CacheLookup::Miss => panic!("expected a hit"),
        }
    }

    #[tokio::test]
    async fn unknown_key_misses() {
        let gate = MediaCache::new(Arc::new(MemoryStore::default()), 60);
        assert!(matches!(gate.lookup("https://redd.it/zzz").await, CacheLookup::Miss));
    }

    #[tokio::test]
    async fn no_store_is_a_passthrough() {
        let gate = MediaCache::disabled();
        assert!(matches!(gate.lookup("anything").await, CacheLookup::Miss));
        let items = gate.store(vec![video("u")]).await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn failing_store_degrades_to_miss_and_passthrough() {
        let gate = MediaCache::new(Arc::new(MemoryStore::failing()), 60);
        assert!(matches!(gate.lookup("u").await, CacheLookup::Miss));
        let items = gate.store(vec![video("u")]).await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn disabled_reads_still_write() {
        let store = Arc::new(MemoryStore::default());
        let gate = MediaCache::new(store.clone(), 60).for_request(false);
        let url = "https://redd.it/abc";

        gate.store(vec![video(url)]).await;
        // read opt-out: record exists but this request does not see it
        assert!(matches!(gate.lookup(url).await, CacheLookup::Miss));
        assert!(store.records.lock().unwrap().contains_key(url));
    }

    #[tokio::test]
    async fn empty_item_list_stores_nothing() {
        let store = Arc::new(MemoryStore::default());
        let gate = MediaCache::new(store.clone(), 60);
        let items = gate.store(Vec::new()).await;
        assert!(items.is_empty());
        assert!(store.records.lock().unwrap().is_empty());
    }
}
