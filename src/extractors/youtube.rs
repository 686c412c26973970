use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::cache::{CacheLookup, MediaCache};
use crate::config::YouTubeConfig;
use crate::context::RequestContext;
use crate::extractors::Extractor;
use crate::media::{ExtractorKind, Media, Video};
use crate::router::RouteMatch;
use crate::selector::{select_best, Rendition};

const PLAYER_API: &str = "https://www.youtube.com/youtubei/v1/player";

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // https://www.youtube.com/watch?v=TCrP1SE2DkY
        // https://youtu.be/TCrP1SE2DkY
        Regex::new(r"^(?:https?://)?(?:(?:www\.)?youtube\.com/watch\?v=|youtu\.be/)(?P<id>[\w-]+)")
            .expect("youtube watch pattern"),
        // https://youtube.com/shorts/hBOLCcvbGHM
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/shorts/(?P<id>[\w-]+)")
            .expect("youtube shorts pattern"),
    ]
});

pub struct YouTubeExtractor {
    _config: YouTubeConfig,
}

impl YouTubeExtractor {
    pub fn new(config: YouTubeConfig) -> Self {
        Self { _config: config }
    }

    async fn fetch_player(&self, http: &reqwest::Client, video_id: &str) -> Result<PlayerResponse> {
        // the android client returns progressive streams with direct URLs
        let body = json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "19.09.37",
                    "androidSdkVersion": 30,
                }
            },
            "videoId": video_id,
        });
        let resp = http.post(PLAYER_API).json(&body).send().await?.json().await?;
        Ok(resp)
    }
}

#[async_trait]
impl Extractor for YouTubeExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::YouTube
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
        let Some(video_id) = hit.group("id") else { return Ok(Vec::new()) };

        let canonical_url = format!("https://youtube.com/watch?v={video_id}");

        if let CacheLookup::Hit(items) = cache.lookup(&canonical_url).await {
            return Ok(items);
        }

        info!(url = %canonical_url, "fetching player data");
        let player = self.fetch_player(http, video_id).await?;
        let formats = player
            .streaming_data
            .map(|s| s.formats)
            .unwrap_or_default();

        let Some(chosen) = pick_format(&formats, ctx.max_size) else {
            info!(url = %canonical_url, "no progressive stream within the size ceiling");
            return Ok(Vec::new());
        };
        let max_quality_url = pick_format(&formats, f64::INFINITY)
            .and_then(|f| f.url.clone());

        let details = player.video_details.unwrap_or_default();
        let video = Video {
            caption: details.title.clone(),
            author: details.author.clone(),
            thumbnail_url: details
                .thumbnail
                .and_then(|t| t.thumbnails.into_iter().last())
                .map(|t| t.url),
            duration: details.length_seconds.as_deref().and_then(|s| s.parse().ok()),
            width: chosen.width,
            height: chosen.height,
            mime_type: chosen
                .mime_type
                .as_deref()
                .and_then(|m| m.split(';').next())
                .unwrap_or("video/mp4")
                .to_string(),
            max_quality_url,
            ..Video::new(
                ExtractorKind::YouTube,
                canonical_url,
                chosen.url.clone().unwrap_or_default(),
            )
        };
        Ok(cache.store(vec![Media::Video(video)]).await)
    }
}

/// Largest progressive MP4 stream that fits under the ceiling. Adaptive
/// (video-only) streams live elsewhere in the payload and are ignored.
fn pick_format(formats: &[StreamFormat], max_size: f64) -> Option<&StreamFormat> {
    let renditions: Vec<Rendition> = formats
        .iter()
        .filter_map(|f| {
            if !f.mime_type.as_deref().unwrap_or_default().starts_with("video/mp4") {
                return None;
            }
            let url = f.url.as_ref()?;
            let size: f64 = f.content_length.as_ref()?.parse().ok()?;
            Some(Rendition::new(url.clone(), size))
        })
        .collect();
    let url = select_best(&renditions, max_size)?;
    formats.iter().find(|f| f.url.as_deref() == Some(url))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    video_details: Option<VideoDetails>,
    #[serde(default)]
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    length_seconds: Option<String>,
    #[serde(default)]
    thumbnail: Option<ThumbnailList>,
}

#[derive(Debug, Default, Deserialize)]
struct ThumbnailList {
    #[serde(default)]
    thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnail {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<StreamFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamFormat {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    content_length: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}
