use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::cache::{CacheLookup, MediaCache};
use crate::config::InstagramConfig;
use crate::context::RequestContext;
use crate::extractors::Extractor;
use crate::media::{ExtractorKind, Media, Video};
use crate::router::RouteMatch;

const QUERY_HASH: &str = "477b65a610463740ccdb83135b2014db";

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // https://www.instagram.com/p/CTQZ5Y8J8ZU/
        // https://www.instagram.com/reel/CTQZ5Y8J8ZU/
        // https://instagram.com/reel/CqQGB-1ISIw/
        Regex::new(r"^(?:https?://)?(?:www\.)?instagram\.com/(?P<type>\w+)/(?P<id>[\w-]+)")
            .expect("instagram pattern"),
    ]
});

pub struct InstagramExtractor {
    config: InstagramConfig,
}

impl InstagramExtractor {
    pub fn new(config: InstagramConfig) -> Self {
        Self { config }
    }

    async fn from_saas(
        &self,
        http: &reqwest::Client,
        cache: &MediaCache,
        media_code: &str,
        canonical_url: &str,
    ) -> Result<Vec<Media>> {
        let Some(token) = &self.config.saas_token else { return Ok(Vec::new()) };
        info!(url = canonical_url, "falling back to the SaaS endpoint");

        let resp = http
            .get(format!("{}/v1/media/by/code", self.config.saas_api))
            .query(&[("code", media_code)])
            .header("x-access-key", token)
            .send()
            .await?;
        if !resp.status().is_success() {
            error!(status = %resp.status(), url = canonical_url, "SaaS endpoint refused the request");
            return Ok(Vec::new());
        }
        let data: SaasMedia = resp.json().await?;

        let Some(url) = data.video_url else {
            info!(url = canonical_url, "not a video");
            return Ok(Vec::new());
        };
        let meta = data.video_versions.into_iter().next().unwrap_or_default();
        let video = Video {
            caption: data.title.or(data.caption_text).filter(|c| !c.is_empty()),
            thumbnail_url: data.thumbnail_url,
            author: data.user.and_then(|u| u.username),
            width: meta.width,
            height: meta.height,
            duration: data.video_duration.map(|d| d as u32).filter(|d| *d > 0),
            ..Video::new(ExtractorKind::Instagram, canonical_url, url)
        };
        Ok(cache.store(vec![Media::Video(video)]).await)
    }
}

#[async_trait]
impl Extractor for InstagramExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Instagram
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
        _ctx: &RequestContext,
    ) -> Result<Vec<Media>> {
        let (Some(post_type), Some(post_id)) = (hit.group("type"), hit.group("id")) else {
            return Ok(Vec::new());
        };

        let canonical_url = format!("https://www.instagram.com/{post_type}/{post_id}");

        if let CacheLookup::Hit(items) = cache.lookup(&canonical_url).await {
            return Ok(items);
        }

        let variables = json!({
            "shortcode": post_id,
            "child_comment_count": 3,
            "fetch_comment_count": 40,
            "parent_comment_count": 24,
            "has_threaded_comments": false,
        })
        .to_string();
        info!(url = %canonical_url, "querying graphql");
        let data: GraphqlResponse = http
            .get("https://www.instagram.com/graphql/query/")
            .query(&[("query_hash", QUERY_HASH), ("variables", variables.as_str())])
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .send()
            .await?
            .json()
            .await?;

        if data.status.as_deref() == Some("fail") && self.config.saas_token.is_some() {
            return self.from_saas(http, cache, post_id, &canonical_url).await;
        }

        let Some(media) = data.data.and_then(|d| d.shortcode_media) else {
            return Ok(Vec::new());
        };
        if !media.is_video {
            info!(url = %canonical_url, "not a video");
            return Ok(Vec::new());
        }
        let Some(url) = media.video_url else { return Ok(Vec::new()) };

        let caption = media.title.clone().filter(|t| !t.is_empty()).or_else(|| {
            let joined = media
                .edge_media_to_caption
                .edges
                .iter()
                .filter_map(|e| e.node.text.as_deref())
                .collect::<Vec<_>>()
                .join(" ");
            let joined = joined.trim().to_string();
            (!joined.is_empty()).then_some(joined)
        });

        let video = Video {
            caption,
            thumbnail_url: media.display_url.clone(),
            author: media.owner.and_then(|o| o.username),
            width: media.dimensions.as_ref().and_then(|d| d.width),
            height: media.dimensions.as_ref().and_then(|d| d.height),
            duration: media.video_duration.map(|d| d as u32).filter(|d| *d > 0),
            ..Video::new(ExtractorKind::Instagram, canonical_url, url)
        };
        Ok(cache.store(vec![Media::Video(video)]).await)
    }
}

#[derive(Debug, Default, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<GraphqlData>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphqlData {
    #[serde(default)]
    shortcode_media: Option<ShortcodeMedia>,
}

#[derive(Debug, Default, Deserialize)]
struct ShortcodeMedia {
    #[serde(default)]
    is_video: bool,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    display_url: Option<String>,
    #[serde(default)]
    owner: Option<Owner>,
    #[serde(default)]
    dimensions: Option<Dimensions>,
    #[serde(default)]
    video_duration: Option<f64>,
    #[serde(default)]
    edge_media_to_caption: CaptionEdges,
}

#[derive(Debug, Default, Deserialize)]
struct Owner {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Dimensions {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CaptionEdges {
    #[serde(default)]
    edges: Vec<CaptionEdge>,
}

#[derive(Debug, Default, Deserialize)]
struct CaptionEdge {
    #[serde(default)]
    node: CaptionNode,
}

#[derive(Debug, Default, Deserialize)]
struct CaptionNode {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SaasMedia {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    caption_text: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    video_duration: Option<f64>,
    #[serde(default)]
    user: Option<SaasUser>,
    #[serde(default)]
    video_versions: Vec<SaasVideoVersion>,
}

#[derive(Debug, Default, Deserialize)]
struct SaasUser {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SaasVideoVersion {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_captures_post_and_reel_shapes() {
        let extractor = InstagramExtractor::new(InstagramConfig::default());
        for (input, post_type, id) in [
            ("https://www.instagram.com/p/CTQZ5Y8J8ZU/", "p", "CTQZ5Y8J8ZU"),
            ("https://instagram.com/reel/CqQGB-1ISIw/", "reel", "CqQGB-1ISIw"),
        ] {
            let caps = extractor.patterns()[0].captures(input).unwrap();
            assert_eq!(&caps["type"], post_type);
            assert_eq!(&caps["id"], id);
        }
    }

    #[test]
    fn caption_falls_back_to_joined_edges() {
        let media: ShortcodeMedia = serde_json::from_value(serde_json::json!({
            "is_video": true,
            "video_url": "https://cdn.example/v.mp4",
            "edge_media_to_caption": {
                "edges": [
                    {"node": {"text": "part one"}},
                    {"node": {"text": "part two"}}
                ]
            }
        }))
        .unwrap();
        let joined = media
            .edge_media_to_caption
            .edges
            .iter()
            .filter_map(|e| e.node.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(joined, "part one part two");
    }
}
