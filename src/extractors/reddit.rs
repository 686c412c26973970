use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::cache::{CacheLookup, MediaCache};
use crate::config::RedditConfig;
use crate::context::RequestContext;
use crate::extractors::Extractor;
use crate::media::{ExtractorKind, Media, Video};
use crate::router::RouteMatch;

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // redd.it/2gmzqe
        Regex::new(r"^(?:https?://)?(?:www\.)?redd\.it/(?P<id>\w+)").expect("redd.it pattern"),
        // reddit.com/comments/2gmzqe/
        // www.reddit.com/r/redditdev/comments/2gmzqe/praw_https/
        // www.reddit.com/gallery/2gmzqe
        Regex::new(r"^(?:https?://)?(?:www\.)?reddit\.com/(?P<link>[\w/]+)").expect("reddit.com pattern"),
    ]
});

pub struct RedditExtractor {
    config: RedditConfig,
}

impl RedditExtractor {
    pub fn new(config: RedditConfig) -> Self {
        Self { config }
    }

    async fn comment(&self, http: &reqwest::Client, comment_id: &str) -> Result<Option<Submission>> {
        let listings: Vec<Listing> = http
            .get(format!("https://api.reddit.com/comments/{comment_id}"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(reqwest::header::USER_AGENT, &self.config.user_agent)
            .send()
            .await?
            .json()
            .await?;
        Ok(listings
            .into_iter()
            .next()
            .and_then(|l| l.data.children.into_iter().next())
            .map(|c| c.data))
    }
}

#[async_trait]
impl Extractor for RedditExtractor {
    fn kind(&self) -> ExtractorKind {
        ExtractorKind::Reddit
    }

    fn patterns(&self) -> &[Regex] {
        &PATTERNS
    }

    fn enabled(&self) -> bool {
        !self.config.user_agent.is_empty()
            && !self.config.client_id.is_empty()
            && !self.config.client_secret.is_empty()
    }

    async fn extract(
        &self,
        http: &reqwest::Client,
        hit: &RouteMatch,
        cache: &MediaCache,
        _ctx: &RequestContext,
    ) -> Result<Vec<Media>> {
        let comment_id = match hit.group("id") {
            Some(id) => id.to_string(),
            None => {
                let Some(link) = hit.group("link") else { return Ok(Vec::new()) };
                match submission_id_from_url(&format!("https://reddit.com/{link}")) {
                    Some(id) => id,
                    None => return Ok(Vec::new()),
                }
            }
        };

        let canonical_url = format!("https://redd.it/{comment_id}");

        if let CacheLookup::Hit(items) = cache.lookup(&canonical_url).await {
            return Ok(items);
        }

        info!(url = %canonical_url, "fetching submission");
        let Some(submission) = self.comment(http, &comment_id).await? else {
            return Ok(Vec::new());
        };

        let Some(video_url) = submission
            .media
            .as_ref()
            .and_then(|m| m.reddit_video.as_ref())
            .map(|v| v.fallback_url.trim_end_matches("?source=fallback").to_string())
            .filter(|u| !u.is_empty())
        else {
            info!(url = %canonical_url, "no video in submission");
            return Ok(Vec::new());
        };

        let mut thumbnail_url = submission.thumbnail.clone();
        if let Some(preview) = &submission.preview {
            if preview.enabled {
                if let Some(source) = preview.images.first().map(|i| &i.source) {
                    thumbnail_url = Some(source.url.clone());
                }
            }
        }

        let author = submission.author.clone().unwrap_or_default();
        let subreddit = submission.subreddit.clone().unwrap_or_default();

        // TODO: fetch the separate DASH audio track and emit it alongside the video
        let video = Video {
            caption: submission.title.clone(),
            thumbnail_url,
            author: submission.author.clone(),
            extra_description: format!("by u/{author} in r/{subreddit}"),
            ..Video::new(ExtractorKind::Reddit, canonical_url, video_url)
        };
        Ok(cache.store(vec![Media::Video(video)]).await)
    }
}

/// Digs the submission id out of a full reddit.com path. Subreddit landing
/// pages and bare `/comments` paths carry no submission and yield `None`.
fn submission_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str()?;
    let parts: Vec<&str> = parsed
        .path()
        .trim_end_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let submission_id = if !parts.contains(&"comments") && !parts.contains(&"gallery") {
        if parts.contains(&"r") {
            // subreddit page, not a submission
            return None;
        }
        (*parts.last()?).to_string()
    } else if let Some(idx) = parts.iter().position(|p| *p == "gallery") {
        (*parts.get(idx + 1)?).to_string()
    } else if parts.last() == Some(&"comments") {
        // submission id not present
        return None;
    } else {
        let idx = parts.iter().position(|p| *p == "comments")?;
        (*parts.get(idx + 1)?).to_string()
    };

    if submission_id.is_empty() || !submission_id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(submission_id)
}

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Default, Deserialize)]
struct Child {
    #[serde(default)]
    data: Submission,
}

#[derive(Debug, Default, Deserialize)]
struct Submission {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    media: Option<SubmissionMedia>,
    #[serde(default)]
    preview: Option<Preview>,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionMedia {
    #[serde(default)]
    reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Default, Deserialize)]
struct RedditVideo {
    #[serde(default)]
    fallback_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct Preview {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    images: Vec<PreviewImage>,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewImage {
    #[serde(default)]
    source: PreviewSource,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewSource {
    #[serde(default)]
    url: String,
}
