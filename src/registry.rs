use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{self, ExtractorsConfig, FieldSpec};
use crate::extractors::{
    Extractor, InstagramExtractor, RedditExtractor, TikTokExtractor, TwitterExtractor,
    YouTubeExtractor,
};
use crate::media::ExtractorKind;

/// One row of the registration table: everything known about a platform
/// without instantiating it. Adding a platform means adding a row.
struct Registration {
    kind: ExtractorKind,
    key: &'static str,
    fields: &'static [FieldSpec],
    build: fn(&ExtractorsConfig) -> Result<Option<Arc<dyn Extractor>>>,
}

// Routing iterates extractors in this order.
static REGISTRATIONS: &[Registration] = &[
    Registration {
        kind: ExtractorKind::TikTok,
        key: "tiktok",
        fields: config::TIKTOK_FIELDS,
        build: build_tiktok,
    },
    Registration {
        kind: ExtractorKind::Twitter,
        key: "twitter",
        fields: config::TWITTER_FIELDS,
        build: build_twitter,
    },
    Registration {
        kind: ExtractorKind::YouTube,
        key: "youtube",
        fields: config::YOUTUBE_FIELDS,
        build: build_youtube,
    },
    Registration {
        kind: ExtractorKind::Reddit,
        key: "reddit",
        fields: config::REDDIT_FIELDS,
        build: build_reddit,
    },
    Registration {
        kind: ExtractorKind::Instagram,
        key: "instagram",
        fields: config::INSTAGRAM_FIELDS,
        build: build_instagram,
    },
];

fn build_tiktok(cfg: &ExtractorsConfig) -> Result<Option<Arc<dyn Extractor>>> {
    cfg.tiktok
        .clone()
        .map(|c| TikTokExtractor::new(c).map(|e| Arc::new(e) as Arc<dyn Extractor>))
        .transpose()
}

fn build_twitter(cfg: &ExtractorsConfig) -> Result<Option<Arc<dyn Extractor>>> {
    Ok(cfg
        .twitter
        .clone()
        .map(|c| Arc::new(TwitterExtractor::new(c)) as Arc<dyn Extractor>))
}

fn build_youtube(cfg: &ExtractorsConfig) -> Result<Option<Arc<dyn Extractor>>> {
    Ok(cfg
        .youtube
        .clone()
        .map(|c| Arc::new(YouTubeExtractor::new(c)) as Arc<dyn Extractor>))
}

fn build_reddit(cfg: &ExtractorsConfig) -> Result<Option<Arc<dyn Extractor>>> {
    Ok(cfg
        .reddit
        .clone()
        .map(|c| Arc::new(RedditExtractor::new(c)) as Arc<dyn Extractor>))
}

fn build_instagram(cfg: &ExtractorsConfig) -> Result<Option<Arc<dyn Extractor>>> {
    Ok(cfg
        .instagram
        .clone()
        .map(|c| Arc::new(InstagramExtractor::new(c)) as Arc<dyn Extractor>))
}

/// Holds the extractors that were actually configured, in registration order.
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Instantiates every platform whose config section is present. A
    /// constructor failure skips that platform instead of failing startup.
    pub fn from_config(cfg: &ExtractorsConfig) -> Self {
        let mut extractors = Vec::new();
        for reg in REGISTRATIONS {
            match (reg.build)(cfg) {
                Ok(Some(extractor)) => {
                    debug!(kind = %reg.kind, "configured extractor");
                    extractors.push(extractor);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(kind = %reg.kind, error = format!("{e:#}"), "failed to construct extractor, skipping");
                }
            }
        }
        Self { extractors }
    }

    pub fn extractors(&self) -> &[Arc<dyn Extractor>] {
        &self.extractors
    }

    /// Configured extractors whose required credentials are present.
    pub fn enabled(&self) -> Vec<Arc<dyn Extractor>> {
        self.extractors.iter().filter(|e| e.enabled()).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Usability per configured extractor. Platforms that were never
    /// configured are absent, distinct from "configured but disabled".
    pub fn supported(&self) -> BTreeMap<ExtractorKind, bool> {
        self.extractors.iter().map(|e| (e.kind(), e.enabled())).collect()
    }

    /// Combined configuration schema of every known platform, configured or
    /// not. Static data only; no live instance is consulted.
    pub fn schema() -> Value {
        let mut root = Map::new();
        for reg in REGISTRATIONS {
            let mut fields = Map::new();
            for field in reg.fields {
                fields.insert(field.name.to_string(), field.to_json());
            }
            root.insert(reg.key.to_string(), Value::Object(fields));
        }
        Value::Object(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RedditConfig, TikTokConfig, TwitterConfig};

    #[test]
    fn unconfigured_platforms_are_absent_from_supported() {
        let cfg = ExtractorsConfig {
            tiktok: Some(TikTokConfig::default()),
            ..Default::default()
        };
        let registry = ExtractorRegistry::from_config(&cfg);
        let supported = registry.supported();
        assert_eq!(supported.get(&ExtractorKind::TikTok), Some(&true));
        assert!(!supported.contains_key(&ExtractorKind::Twitter));
        assert!(!supported.contains_key(&ExtractorKind::Reddit));
    }

    #[test]
    fn missing_credentials_disable_without_removing() {
        let cfg = ExtractorsConfig {
            twitter: Some(TwitterConfig::default()), // no bearer token
            reddit: Some(RedditConfig { client_id: "id".into(), ..Default::default() }),
            ..Default::default()
        };
        let registry = ExtractorRegistry::from_config(&cfg);
        let supported = registry.supported();
        assert_eq!(supported.get(&ExtractorKind::Twitter), Some(&false));
        assert_eq!(supported.get(&ExtractorKind::Reddit), Some(&false));
        // disabled extractors never reach routing
        assert!(registry.enabled().is_empty());
    }

    #[test]
    fn empty_config_builds_an_empty_registry() {
        let registry = ExtractorRegistry::from_config(&ExtractorsConfig::default());
        assert!(registry.is_empty());
        assert!(registry.supported().is_empty());
    }

    #[test]
    fn schema_covers_every_known_platform() {
        let schema = ExtractorRegistry::schema();
        let root = schema.as_object().unwrap();
        for key in ["tiktok", "twitter", "youtube", "reddit", "instagram"] {
            assert!(root.contains_key(key), "missing schema for {key}");
        }
        let token = &root["twitter"]["bearer_token"];
        assert_eq!(token["required"], true);
        assert_eq!(token["type"], "string");
        let ua = &root["reddit"]["user_agent"];
        assert_eq!(ua["required"], false);
        assert!(ua["default"].is_string());
    }
}
