use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

// Mobile app user agent; the feed endpoint rejects browser UAs.
pub(crate) const TIKTOK_USER_AGENT: &str =
    "com.ss.android.ugc.trill/494+Mozilla/5.0+(Linux;+Android+12;+2112123G+Build/SKQ1.211006.001;+wv)\
     +AppleWebKit/537.36+(KHTML,+like+Gecko)+Version/4.0+Chrome/107.0.5304.105+Mobile+Safari/537.36";

pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.114 Safari/537.36";

const REDDIT_USER_AGENT: &str = "medley video downloader";
const INSTAGRAM_SAAS_API: &str = "https://api.lamadava.com";

/// Top-level configuration. Extractor sections are optional; a missing
/// section means that platform is not configured at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub cache_ttl_secs: Option<i64>,
    #[serde(default)]
    pub extractors: ExtractorsConfig,
}

impl Config {
    /// Reads a TOML config file. With no path, tries `MEDLEY_CONFIG`, then
    /// falls back to an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var("MEDLEY_CONFIG") {
                Ok(p) if !p.trim().is_empty() => p.into(),
                _ => return Ok(Self::default()),
            },
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config file: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file: {}", path.display()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractorsConfig {
    #[serde(default)]
    pub tiktok: Option<TikTokConfig>,
    #[serde(default)]
    pub twitter: Option<TwitterConfig>,
    #[serde(default)]
    pub youtube: Option<YouTubeConfig>,
    #[serde(default)]
    pub reddit: Option<RedditConfig>,
    #[serde(default)]
    pub instagram: Option<InstagramConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TikTokConfig {
    #[serde(default = "default_tiktok_user_agent")]
    pub user_agent: String,
}

impl Default for TikTokConfig {
    fn default() -> Self {
        Self { user_agent: default_tiktok_user_agent() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwitterConfig {
    /// Bearer token for the Twitter API v2.
    #[serde(default)]
    pub bearer_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct YouTubeConfig {}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_reddit_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: default_reddit_user_agent(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstagramConfig {
    /// Set this to enable the SaaS fallback when the public endpoint balks.
    #[serde(default)]
    pub saas_token: Option<String>,
    #[serde(default = "default_instagram_saas_api")]
    pub saas_api: String,
    #[serde(default = "default_browser_user_agent")]
    pub user_agent: String,
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            saas_token: None,
            saas_api: default_instagram_saas_api(),
            user_agent: default_browser_user_agent(),
        }
    }
}

fn default_tiktok_user_agent() -> String { TIKTOK_USER_AGENT.to_string() }
fn default_reddit_user_agent() -> String { REDDIT_USER_AGENT.to_string() }
fn default_instagram_saas_api() -> String { INSTAGRAM_SAAS_API.to_string() }
fn default_browser_user_agent() -> String { BROWSER_USER_AGENT.to_string() }

/// One configuration field, declared statically per extractor type so the
/// combined schema never needs a live instance.
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
}

impl FieldSpec {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "type": self.kind,
            "description": self.description,
            "required": self.required,
            "default": self.default,
        })
    }
}

pub(crate) const TIKTOK_FIELDS: &[FieldSpec] = &[FieldSpec {
    name: "user_agent",
    kind: "string",
    description: "User agent sent to the TikTok feed API",
    required: false,
    default: Some(TIKTOK_USER_AGENT),
}];

pub(crate) const TWITTER_FIELDS: &[FieldSpec] = &[FieldSpec {
    name: "bearer_token",
    kind: "string",
    description: "Bearer token for the Twitter API",
    required: true,
    default: None,
}];

pub(crate) const YOUTUBE_FIELDS: &[FieldSpec] = &[];

pub(crate) const REDDIT_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "user_agent",
        kind: "string",
        description: "User agent for the Reddit API",
        required: false,
        default: Some(REDDIT_USER_AGENT),
    },
    FieldSpec {
        name: "client_id",
        kind: "string",
        description: "Client ID for the Reddit API",
        required: true,
        default: None,
    },
    FieldSpec {
        name: "client_secret",
        kind: "string",
        description: "Client secret for the Reddit API",
        required: true,
        default: None,
    },
];

pub(crate) const INSTAGRAM_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "saas_token",
        kind: "string",
        description: "Set this to enable the Instagram SaaS fallback",
        required: false,
        default: None,
    },
    FieldSpec {
        name: "saas_api",
        kind: "string",
        description: "Base URL of the Instagram SaaS API",
        required: false,
        default: Some(INSTAGRAM_SAAS_API),
    },
    FieldSpec {
        name: "user_agent",
        kind: "string",
        description: "User agent for Instagram requests",
        required: false,
        default: Some(BROWSER_USER_AGENT),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_stay_unconfigured() {
        let cfg: Config = toml::from_str(
            r#"
            [extractors.tiktok]

            [extractors.twitter]
            bearer_token = "tok"
            "#,
        )
        .unwrap();
        assert!(cfg.extractors.tiktok.is_some());
        assert_eq!(cfg.extractors.twitter.as_ref().unwrap().bearer_token, "tok");
        assert!(cfg.extractors.reddit.is_none());
        assert!(cfg.extractors.youtube.is_none());
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg: Config = toml::from_str("[extractors.reddit]\nclient_id = \"id\"\n").unwrap();
        let reddit = cfg.extractors.reddit.unwrap();
        assert_eq!(reddit.user_agent, REDDIT_USER_AGENT);
        assert_eq!(reddit.client_id, "id");
        assert!(reddit.client_secret.is_empty());
    }
}
