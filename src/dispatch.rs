use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::MediaCache;
use crate::context::RequestContext;
use crate::extractors::Extractor;
use crate::media::GroupedMedia;
use crate::router::RouteMatch;

/// Runs every work item concurrently and merges the results in worklist
/// order; completion order never reorders the output.
///
/// A failing extractor is logged and contributes zero items. Nothing an
/// individual extractor does can fail its siblings or the merged result.
pub async fn dispatch(
    worklist: Vec<(Arc<dyn Extractor>, RouteMatch)>,
    http: &reqwest::Client,
    cache: &MediaCache,
    ctx: &RequestContext,
) -> GroupedMedia {
    let tasks = worklist.into_iter().map(|(extractor, hit)| async move {
        debug!(kind = %extractor.kind(), input = %hit.matched, "running extractor");
        match extractor.extract(http, &hit, cache, ctx).await {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    kind = %extractor.kind(),
                    input = %hit.matched,
                    error = format!("{e:#}"),
                    "extractor failed, contributing no items"
                );
                Vec::new()
            }
        }
    });

    let results = join_all(tasks).await;

    let mut merged = GroupedMedia::default();
    for items in results {
        merged = merged.merge(GroupedMedia::from_items(items));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{ExtractorKind, Media, Video};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use regex::Regex;
    use std::time::Duration;

    enum Behavior {
        Items(Vec<Media>),
        SlowItems(Duration, Vec<Media>),
        Fail,
    }

    struct StubExtractor {
        kind: ExtractorKind,
        patterns: Vec<Regex>,
        behavior: Behavior,
    }

    impl StubExtractor {
        fn new(kind: ExtractorKind, behavior: Behavior) -> Arc<dyn Extractor> {
            Arc::new(Self {
                kind,
                patterns: vec![Regex::new(r"^https://example\.com/").unwrap()],
                behavior,
            })
        }
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        fn kind(&self) -> ExtractorKind {
            self.kind
        }

        fn patterns(&self) -> &[Regex] {
            &self.patterns
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn extract(
            &self,
            _http: &reqwest::Client,
            _hit: &RouteMatch,
            _cache: &MediaCache,
            _ctx: &RequestContext,
        ) -> Result<Vec<Media>> {
            match &self.behavior {
                Behavior::Items(items) => Ok(items.clone()),
                Behavior::SlowItems(delay, items) => {
                    tokio::time::sleep(*delay).await;
                    Ok(items.clone())
                }
                Behavior::Fail => Err(anyhow!("upstream returned garbage")),
            }
        }
    }

    fn video(original: &str) -> Media {
        Media::Video(Video::new(ExtractorKind::TikTok, original, "https://cdn.example/v.mp4"))
    }

    fn worklist_for(extractors: Vec<Arc<dyn Extractor>>) -> Vec<(Arc<dyn Extractor>, RouteMatch)> {
        crate::router::route(&extractors, "https://example.com/post/1")
    }

    #[tokio::test]
    async fn one_failure_does_not_sink_the_batch() {
        let worklist = worklist_for(vec![
            StubExtractor::new(ExtractorKind::Twitter, Behavior::Fail),
            StubExtractor::new(ExtractorKind::Reddit, Behavior::Items(vec![video("u1")])),
        ]);
        let ctx = RequestContext::default();
        let merged = dispatch(worklist, &reqwest::Client::new(), &MediaCache::disabled(), &ctx).await;
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.videos[0].original_url, "u1");
    }

    #[tokio::test]
    async fn output_order_is_worklist_order_not_completion_order() {
        // the first extractor finishes last; its items must still come first
        let worklist = worklist_for(vec![
            StubExtractor::new(
                ExtractorKind::Twitter,
                Behavior::SlowItems(Duration::from_millis(30), vec![video("slow")]),
            ),
            StubExtractor::new(ExtractorKind::Reddit, Behavior::Items(vec![video("fast")])),
        ]);
        let ctx = RequestContext::default();
        let merged = dispatch(worklist, &reqwest::Client::new(), &MediaCache::disabled(), &ctx).await;
        let urls: Vec<&str> = merged.videos.iter().map(|v| v.original_url.as_str()).collect();
        assert_eq!(urls, vec!["slow", "fast"]);
    }

    #[tokio::test]
    async fn empty_worklist_merges_to_nothing() {
        let ctx = RequestContext::default();
        let merged = dispatch(Vec::new(), &reqwest::Client::new(), &MediaCache::disabled(), &ctx).await;
        assert!(merged.is_empty());
    }
}
