use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cache::{CacheLookup, MediaCache};
use crate::config::TwitterConfig;
use crate::context::RequestContext;
use crate::extractors::Extractor;
use crate::media::{ExtractorKind, Media, Video};
use crate::router::RouteMatch;
use crate::selector::{select_best, Rendition};

// https://twitter.com/Yoda4ever/status/1580609309217628160
static STATUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?twitter\.com/(?P<user>\w+)/status/(?P<id>\d+)")
        .expect("twitter status pattern")
});

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        STATUS_RE.clone(),
        // https://x.com/Yoda4ever/status/1580609309217628160
        Regex::new(r"^(?:https?://)?(?:www\.)?x\.com/(?P<user>\w+)/status/(?P<id>\d+)")
            .expect("x.com status pattern"),
        // https://t.co/sOHvySZwUo
        Regex::new(r"^(?:https?://)?t\.co/(?P<tco_id>\w+)").expect("t.co pattern"),
    ]
});

pub struct TwitterExtractor {
    config: TwitterConfig,
}

impl TwitterExtractor {
    pub fn new(config: TwitterConfig) -> Self {
        Self { config }
    }

    /// Short links carry no tweet id; follow the redirect and re-match the
    /// landing URL.
    async fn resolve_tco(&self, http: &reqwest::Client, tco_id: &str) -> Result<Option<String>> {
        let resp = http.get(format!("https://t.co/{tco_id}")).send().await?;
        let landed = resp.url().to_string();
        match STATUS_RE.captures(&landed) {
            Some(caps) => Ok(caps.name("id").map(|m| m.as_str().to_string())),
            None => {
                debug!(url = %landed, "t.co link did not land on a tweet");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Extractor for TwitterExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Twitter
    }

    fn patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn enabled(&self) -> bool {
        !self.config.bearer_token.is_empty()
    }

    async fn extract(
        &self,
        http: &reqwest::Client,
        hit: &RouteMatch,
        cache: &MediaCache,
        _ctx: &RequestContext,
    ) -> Result<Vec<Media>> {
        let tweet_id = match hit.group("id") {
            Some(id) => id.to_string(),
            None => {
                let Some(tco_id) = hit.group("tco_id") else { return Ok(Vec::new()) };
                match self.resolve_tco(http, tco_id).await? {
                    Some(id) => id,
                    None => return Ok(Vec::new()),
                }
            }
        };

        let canonical_url = format!("https://twitter.com/i/status/{tweet_id}");

        if let CacheLookup::Hit(items) = cache.lookup(&canonical_url).await {
            return Ok(items);
        }

        info!(url = %canonical_url, "fetching tweet");
        let resp: TweetResponse = http
            .get(format!("https://api.twitter.com/2/tweets/{tweet_id}"))
            .query(&[
                ("media.fields", "type,variants"),
                ("expansions", "attachments.media_keys,author_id"),
                ("user.fields", "username"),
            ])
            .bearer_auth(&self.config.bearer_token)
            .send()
            .await?
            .json()
            .await?;

        let includes = resp.includes.unwrap_or_default();
        let author = includes.users.first().map(|u| u.username.clone());
        let caption = resp.data.and_then(|d| d.text);

        let mut result = Vec::new();
        for media in includes.media.iter().filter(|m| m.media_type == "video") {
            let Some(url) = pick_variant(&media.variants) else { continue };
            result.push(Media::Video(Video {
                caption: caption.clone(),
                thumbnail_url: media.preview_image_url.clone(),
                author: author.clone(),
                ..Video::new(ExtractorKind::Twitter, canonical_url.clone(), url)
            }));
        }
        Ok(cache.store(result).await)
    }
}

// Variants carry bit rates, not byte sizes, so the pick is unbounded: the
// highest bit rate wins regardless of the request ceiling.
fn pick_variant(variants: &[TweetVariant]) -> Option<String> {
    let renditions: Vec<Rendition> = variants
        .iter()
        .filter_map(|v| {
            let url = v.url.as_ref()?;
            Some(Rendition::new(url.clone(), v.bit_rate.unwrap_or(0.0)))
        })
        .collect();
    select_best(&renditions, f64::INFINITY).map(str::to_string)
}

#[derive(Debug, Default, Deserialize)]
struct TweetResponse {
    #[serde(default)]
    data: Option<TweetData>,
    #[serde(default)]
    includes: Option<TweetIncludes>,
}

#[derive(Debug, Default, Deserialize)]
struct TweetData {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TweetIncludes {
    #[serde(default)]
    media: Vec<TweetMedia>,
    #[serde(default)]
    users: Vec<TweetUser>,
}

#[derive(Debug, Default, Deserialize)]
struct TweetMedia {
    #[serde(default, rename = "type")]
    media_type: String,
    #[serde(default)]
    preview_image_url: Option<String>,
    #[serde(default)]
    variants: Vec<TweetVariant>,
}

#[derive(Debug, Default, Deserialize)]
struct TweetVariant {
    #[serde(default)]
    bit_rate: Option<f64>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TweetUser {
    #[serde(default)]
    username: String,
}
