use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cache::{CacheLookup, MediaCache};
use crate::config::TikTokConfig;
use crate::context::RequestContext;
use crate::extractors::Extractor;
use crate::media::{ExtractorKind, Image, Media, Video};
use crate::net;
use crate::router::RouteMatch;
use crate::selector::{select_best, Rendition};

const FEED_API: &str = "https://api16-normal-c-useast1a.tiktokv.com/aweme/v1/feed/";

// Every short-link hop stays on tiktok.com; anything else aborts resolution.
const MAX_REDIRECT_HOPS: usize = 5;

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // https://www.tiktok.com/t/ZS8s7cPmd/
        Regex::new(r"^(?:https?://)?(?:www\.)?tiktok\.com/(?P<short_suffix>\w+)/(?P<id>\w+)/?")
            .expect("tiktok short-suffix pattern"),
        // https://vt.tiktok.com/ZSRq1jcrg/
        // https://vm.tiktok.com/ZSRq1jcrg/
        Regex::new(r"^(?:https?://)?(?:(?P<domain>[a-z]{2})\.)?tiktok\.com/(?P<id>\w+)/?")
            .expect("tiktok short-domain pattern"),
        // https://www.tiktok.com/@thejoyegg/video/7136001098841591041
        Regex::new(r"^(?:https?://)?(?:www\.)?tiktok\.com/@(?P<author>\w+)/video/(?P<video_id>\d+)/?")
            .expect("tiktok canonical pattern"),
    ]
});

pub struct TikTokExtractor {
    config: TikTokConfig,
    no_redirect: reqwest::Client,
}

impl TikTokExtractor {
    pub fn new(config: TikTokConfig) -> Result<Self> {
        Ok(Self { config, no_redirect: net::build_no_redirect_client()? })
    }

    /// Follows a short link hop by hop until the canonical `@author/video/id`
    /// page shows up in a Location header.
    async fn locate_video(&self, short_url: &str) -> Result<Option<(String, u64)>> {
        let mut url = short_url.to_string();
        let mut hops = 0;
        while !url.contains('@') && hops < MAX_REDIRECT_HOPS {
            let resp = self.no_redirect.get(&url).send().await?;
            let location = resp
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            url = location.split('?').next().unwrap_or("").to_string();
            if url.is_empty() {
                break;
            }
            if url.starts_with('/') {
                url = format!("https://www.tiktok.com{url}");
            }
            hops += 1;
        }

        let author = url
            .split('@')
            .nth(1)
            .and_then(|s| s.split('/').next())
            .unwrap_or("");
        let video_id = url.rsplit('/').next().unwrap_or("");
        match (author.is_empty(), video_id.parse::<u64>()) {
            (false, Ok(id)) => Ok(Some((author.to_ascii_lowercase(), id))),
            _ => {
                debug!(url, "short link did not resolve to a video page");
                Ok(None)
            }
        }
    }

    async fn fetch_aweme(&self, http: &reqwest::Client, video_id: u64) -> Result<Option<Aweme>> {
        let resp: FeedResponse = http
            .get(FEED_API)
            .query(&[("aweme_id", video_id)])
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .send()
            .await?
            .json()
            .await?;
        if resp.aweme_list.is_empty() {
            info!(video_id, "feed response carried no posts");
        }
        Ok(resp.aweme_list.into_iter().next())
    }
}

#[async_trait]
impl Extractor for TikTokExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::TikTok
    }

    fn patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn extract(
        &self,
        http: &reqwest::Client,
        hit: &RouteMatch,
        cache: &MediaCache,
        ctx: &RequestContext,
    ) -> Result<Vec<Media>> {
        let location = if let (Some(suffix), Some(id)) = (hit.group("short_suffix"), hit.group("id")) {
            let short_url = format!("https://www.tiktok.com/{suffix}/{id}");
            info!(url = %short_url, "resolving short link");
            self.locate_video(&short_url).await?
        } else if let Some(id) = hit.group("id") {
            let domain = hit.group("domain").unwrap_or("vt");
            let short_url = format!("https://{domain}.tiktok.com/{id}");
            info!(url = %short_url, "resolving short link");
            self.locate_video(&short_url).await?
        } else if let (Some(author), Some(video_id)) = (hit.group("author"), hit.group("video_id")) {
            video_id.parse::<u64>().ok().map(|id| (author.to_ascii_lowercase(), id))
        } else {
            None
        };

        let Some((author, video_id)) = location else { return Ok(Vec::new()) };
        let canonical_url = format!("https://www.tiktok.com/@{author}/video/{video_id}");

        if let CacheLookup::Hit(items) = cache.lookup(&canonical_url).await {
            return Ok(items);
        }

        info!(url = %canonical_url, video_id, "fetching video data");
        let Some(aweme) = self.fetch_aweme(http, video_id).await? else {
            return Ok(Vec::new());
        };

        // the author in the URL must agree with the payload
        let real_author = aweme
            .author
            .as_ref()
            .map(|a| a.unique_id.to_ascii_lowercase())
            .unwrap_or_default();
        if !author.is_empty() && author != real_author {
            info!(expected = %author, got = %real_author, "author mismatch, discarding");
            return Ok(Vec::new());
        }

        let items = match aweme.media_kind() {
            AwemeKind::Video => process_video(&aweme, &canonical_url, ctx),
            AwemeKind::Image => process_images(&aweme, &canonical_url),
        };
        Ok(cache.store(items).await)
    }
}

enum AwemeKind {
    Video,
    Image,
}

#[derive(Debug, Default, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    aweme_list: Vec<Aweme>,
}

#[derive(Debug, Default, Deserialize)]
struct Aweme {
    #[serde(default)]
    aweme_type: i64,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    author: Option<AwemeAuthor>,
    #[serde(default)]
    video: Option<AwemeVideo>,
    #[serde(default)]
    image_post_info: Option<ImagePostInfo>,
}

impl Aweme {
    // Photo posts are type 150; several codes all mean "video", and unknown
    // codes have historically been videos too.
    fn media_kind(&self) -> AwemeKind {
        if self.aweme_type == 150 {
            AwemeKind::Image
        } else {
            AwemeKind::Video
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AwemeAuthor {
    #[serde(default)]
    unique_id: String,
    #[serde(default)]
    nickname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AwemeVideo {
    #[serde(default)]
    bit_rate: Vec<BitRateEntry>,
    #[serde(default)]
    origin_cover: Option<UrlList>,
}

#[derive(Debug, Default, Deserialize)]
struct BitRateEntry {
    #[serde(default)]
    data_size: f64,
    #[serde(default)]
    play_addr: Option<UrlList>,
}

#[derive(Debug, Default, Deserialize)]
struct UrlList {
    #[serde(default)]
    url_list: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ImagePostInfo {
    #[serde(default)]
    images: Vec<PostImage>,
    #[serde(default)]
    thumbnail: Option<UrlList>,
}

#[derive(Debug, Default, Deserialize)]
struct PostImage {
    #[serde(default)]
    display_image: Option<DisplayImage>,
}

#[derive(Debug, Default, Deserialize)]
struct DisplayImage {
    #[serde(default)]
    url_list: Vec<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

fn process_video(aweme: &Aweme, canonical_url: &str, ctx: &RequestContext) -> Vec<Media> {
    let Some(video) = &aweme.video else { return Vec::new() };

    let renditions: Vec<Rendition> = video
        .bit_rate
        .iter()
        .filter_map(|entry| {
            let url = entry.play_addr.as_ref()?.url_list.first()?;
            Some(Rendition::new(url.clone(), entry.data_size))
        })
        .collect();
    let Some(url) = select_best(&renditions, ctx.max_size) else {
        info!(url = canonical_url, "no rendition within the size ceiling");
        return Vec::new();
    };

    let max_quality_url = video
        .bit_rate
        .first()
        .and_then(|entry| entry.play_addr.as_ref())
        .and_then(|addr| addr.url_list.first())
        .cloned();
    let thumbnail_url = video
        .origin_cover
        .as_ref()
        .and_then(|cover| cover.url_list.first())
        .cloned();
    let nickname = aweme.author.as_ref().and_then(|a| a.nickname.clone());

    vec![Media::Video(Video {
        caption: aweme.desc.clone(),
        thumbnail_url,
        author: nickname,
        language: aweme.region.clone(),
        max_quality_url,
        ..Video::new(ExtractorKind::TikTok, canonical_url, url)
    })]
}

fn process_images(aweme: &Aweme, canonical_url: &str) -> Vec<Media> {
    let Some(info) = &aweme.image_post_info else { return Vec::new() };

    let caption = aweme.desc.clone();
    let thumbnail_url = info
        .thumbnail
        .as_ref()
        .and_then(|t| t.url_list.last())
        .cloned();
    let nickname = aweme.author.as_ref().and_then(|a| a.nickname.clone());

    info.images
        .iter()
        .filter_map(|image| image.display_image.as_ref())
        .filter_map(|display| {
            let url = display.url_list.last()?;
            Some(Media::Image(Image {
                caption: caption.clone(),
                thumbnail_url: thumbnail_url.clone(),
                author: nickname.clone(),
                language: aweme.region.clone(),
                width: display.width,
                height: display.height,
                ..Image::new(ExtractorKind::TikTok, canonical_url, url.clone())
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;

    use serde_json::json;
    use std::sync::Arc;

    fn video_aweme() -> Aweme {
        serde_json::from_value(json!({
            "aweme_type": 0,
            "desc": "a caption",
            "region": "US",
            "author": {"unique_id": "foo", "nickname": "Foo"},
            "video": {
                "bit_rate": [
                    {"data_size": 500.0, "play_addr": {"url_list": ["a"]}},
                    {"data_size": 2_000_000.0, "play_addr": {"url_list": ["b"]}}
                ],
                "origin_cover": {"url_list": ["https://cdn.example/cover.jpg"]}
            }
        }))
        .unwrap()
    }

    #[test]
    fn size_ceiling_picks_the_smaller_rendition() {
        let ctx = RequestContext::default().with_max_size(1_000_000.0);
        let items = process_video(&video_aweme(), "https://www.tiktok.com/@foo/video/123456", &ctx);
        assert_eq!(items.len(), 1);
        match &items[0] {
            Media::Video(v) => {
                assert_eq!(v.url, "a");
                // the first bit-rate entry is the unconstrained best
                assert_eq!(v.max_quality_url.as_deref(), Some("a"));
                assert_eq!(v.author.as_deref(), Some("Foo"));
                assert_eq!(v.language.as_deref(), Some("US"));
            }
            other => panic!("expected a video, got {other:?}"),
        }
    }

    #[test]
    fn unconstrained_request_takes_the_largest() {
        let ctx = RequestContext::default();
        let items = process_video(&video_aweme(), "u", &ctx);
        match &items[0] {
            Media::Video(v) => assert_eq!(v.url, "b"),
            other => panic!("expected a video, got {other:?}"),
        }
    }

    #[test]
    fn nothing_fits_means_no_items() {
        let ctx = RequestContext::default().with_max_size(10.0);
        assert!(process_video(&video_aweme(), "u", &ctx).is_empty());
    }

    #[test]
    fn photo_posts_become_images() {
        let aweme: Aweme = serde_json::from_value(json!({
            "aweme_type": 150,
            "desc": "photos",
            "image_post_info": {
                "images": [
                    {"display_image": {"url_list": ["low1", "hi1"], "width": 1080, "height": 1920}},
                    {"display_image": {"url_list": ["low2", "hi2"]}}
                ]
            }
        }))
        .unwrap();
        assert!(matches!(aweme.media_kind(), AwemeKind::Image));

        let items = process_images(&aweme, "u");
        assert_eq!(items.len(), 2);
        match &items[0] {
            Media::Image(i) => {
                assert_eq!(i.url, "hi1");
                assert_eq!(i.width, Some(1080));
            }
            other => panic!("expected an image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cached_record_short_circuits_before_any_fetch() {
        let canonical = "https://www.tiktok.com/@foo/video/123456";

        // seed the cache with an image record under the canonical URL
        let store = Arc::new(MemoryStore::default());
        let gate = MediaCache::new(store, 60);
        gate.store(vec![Media::Image(Image::new(ExtractorKind::TikTok, canonical, "cached.jpg"))])
            .await;

        let extractor = TikTokExtractor::new(TikTokConfig::default()).unwrap();
        let pattern = &extractor.patterns()[2];
        let caps = pattern.captures(canonical).unwrap();
        let hit = RouteMatch::from_captures(canonical, pattern, &caps);

        // the stub client never sends anything: a fetch attempt would error out
        let items = extractor
            .extract(&reqwest::Client::new(), &hit, &gate, &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        match &items[0] {
            Media::Image(i) => assert_eq!(i.url, "cached.jpg"),
            other => panic!("expected the cached image, got {other:?}"),
        }
    }

    #[test]
    fn patterns_route_all_three_shapes() {
        let extractor = TikTokExtractor::new(TikTokConfig::default()).unwrap();
        let patterns = extractor.patterns();

        assert!(patterns[0].is_match("https://www.tiktok.com/t/ZS8s7cPmd/"));
        assert!(patterns[1].is_match("https://vt.tiktok.com/ZSRq1jcrg/"));
        assert!(patterns[1].is_match("https://vm.tiktok.com/ZSRq1jcrg/"));
        assert!(patterns[2].is_match("https://www.tiktok.com/@thejoyegg/video/7136001098841591041"));
        // the short-domain pattern must not swallow canonical author URLs
        assert!(!patterns[1].is_match("https://www.tiktok.com/@thejoyegg/video/7136001098841591041"));
    }
}
