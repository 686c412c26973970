use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use crate::cache::MediaCache;
use crate::context::RequestContext;
use crate::media::{ExtractorKind, Media};
use crate::router::RouteMatch;

pub mod instagram;
pub mod reddit;
pub mod tiktok;
pub mod twitter;
pub mod youtube;

pub use instagram::InstagramExtractor;
pub use reddit::RedditExtractor;
pub use tiktok::TikTokExtractor;
pub use twitter::TwitterExtractor;
pub use youtube::YouTubeExtractor;

/// A pluggable worker that recognizes and resolves URLs for one platform.
///
/// Implementations consult the cache gate once they know the canonical URL
/// (which may be mid-extraction, after following a short link) and report
/// resolved items back through it. Errors are isolated at the dispatch
/// boundary, so an implementation may freely use `?` on its network path.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn kind(&self) -> ExtractorKind;

    /// Match patterns in priority order. Anchored at the start of the input;
    /// trailing text after a recognized URL is allowed.
    fn patterns(&self) -> &[Regex];

    /// Whether required configuration is present. Disabled extractors are
    /// skipped by routing but still reported by the registry.
    fn enabled(&self) -> bool;

    async fn extract(
        &self,
        http: &reqwest::Client,
        hit: &RouteMatch,
        cache: &MediaCache,
        ctx: &RequestContext,
    ) -> Result<Vec<Media>>;
}
