pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod dispatch;
pub mod extractors;
pub mod media;
pub mod net;
pub mod registry;
pub mod router;
pub mod selector;
pub mod storage;
#[cfg(test)]
pub(crate) mod test_support;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::RequestContext;
    pub use crate::media::{Audio, ExtractorKind, GroupedMedia, Image, Media, Video};
    pub use crate::Medley;
}

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use tracing::{debug, info};

use crate::cache::MediaCache;
use crate::config::Config;
use crate::context::RequestContext;
use crate::db::Database;
use crate::media::{ExtractorKind, GroupedMedia};
use crate::registry::ExtractorRegistry;
use crate::storage::Storage;

const DEFAULT_CACHE_TTL_SECS: i64 = 24 * 60 * 60;

/// Async library entry point. Owns the extractor registry, the shared HTTP
/// client, and the cache gate; one instance serves concurrent resolves.
pub struct Medley {
    registry: ExtractorRegistry,
    cache: MediaCache,
    http: reqwest::Client,
}

impl Medley {
    /// Initialize with the bundled SQLite cache store and (optionally) run
    /// migrations.
    pub async fn connect(config: &Config, run_migrations: bool) -> Result<Self> {
        let db = Database::connect(config.database_url.as_deref()).await?;
        if run_migrations { db.run_migrations().await?; }
        Self::with_storage(config, Arc::new(db))
    }

    /// Initialize against any cache store implementation.
    pub fn with_storage(config: &Config, storage: Arc<dyn Storage>) -> Result<Self> {
        Ok(Self {
            registry: ExtractorRegistry::from_config(&config.extractors),
            cache: MediaCache::new(storage, cache_ttl(config)),
            http: net::build_client()?,
        })
    }

    /// Initialize with no cache at all: every lookup misses, every store is
    /// a pass-through.
    pub fn without_cache(config: &Config) -> Result<Self> {
        Ok(Self {
            registry: ExtractorRegistry::from_config(&config.extractors),
            cache: MediaCache::disabled(),
            http: net::build_client()?,
        })
    }

    /// Resolves an input URL into the merged media items of every matching
    /// platform. Empty results are normal (nothing matched, or everything
    /// that matched found nothing); the only errors are a registry with zero
    /// configured extractors and expiry of the caller's own timeout.
    pub async fn resolve(&self, input: &str, ctx: &RequestContext) -> Result<GroupedMedia> {
        if self.registry.is_empty() {
            bail!("no extractors configured");
        }
        let started = Instant::now();

        let worklist = router::route(&self.registry.enabled(), input);
        if worklist.is_empty() {
            debug!(input, "no extractor matched");
            return Ok(GroupedMedia::default());
        }
        info!(
            input,
            matched = worklist.len(),
            service = ctx.service.as_deref().unwrap_or("-"),
            user = ctx.user.as_deref().unwrap_or("-"),
            "resolving"
        );

        let cache = self.cache.for_request(ctx.use_cache);
        let fut = dispatch::dispatch(worklist, &self.http, &cache, ctx);
        let merged = match ctx.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| anyhow!("resolution timed out after {limit:?}"))?,
            None => fut.await,
        };

        info!(
            items = merged.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resolved"
        );
        Ok(merged)
    }

    /// Usability per configured extractor; see [`ExtractorRegistry::supported`].
    pub fn supported(&self) -> BTreeMap<ExtractorKind, bool> {
        self.registry.supported()
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }
}

fn cache_ttl(config: &Config) -> i64 {
    config
        .cache_ttl_secs
        .or_else(|| std::env::var("MEDLEY_CACHE_TTL_SECS").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(DEFAULT_CACHE_TTL_SECS)
}
