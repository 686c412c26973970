use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Platform tag carried by every media item and reported by `supported()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExtractorKind {
    TikTok,
    Twitter,
    YouTube,
    Reddit,
    Instagram,
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::TikTok => "TikTok",
            ExtractorKind::Twitter => "Twitter",
            ExtractorKind::YouTube => "YouTube",
            ExtractorKind::Reddit => "Reddit",
            ExtractorKind::Instagram => "Instagram",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub kind: ExtractorKind,
    pub original_url: String,
    pub url: String,
    pub max_quality_url: Option<String>,
    pub caption: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub extra_description: String,
    pub language: Option<String>,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<u32>, // seconds
}

impl Video {
    pub fn new(kind: ExtractorKind, original_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind,
            original_url: original_url.into(),
            url: url.into(),
            max_quality_url: None,
            caption: None,
            thumbnail_url: None,
            author: None,
            extra_description: String::new(),
            language: None,
            mime_type: "video/mp4".to_string(),
            width: None,
            height: None,
            duration: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub kind: ExtractorKind,
    pub original_url: String,
    pub url: String,
    pub max_quality_url: Option<String>,
    pub caption: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub extra_description: String,
    pub language: Option<String>,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Image {
    pub fn new(kind: ExtractorKind, original_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind,
            original_url: original_url.into(),
            url: url.into(),
            max_quality_url: None,
            caption: None,
            thumbnail_url: None,
            author: None,
            extra_description: String::new(),
            language: None,
            mime_type: "image/jpeg".to_string(),
            width: None,
            height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audio {
    pub kind: ExtractorKind,
    pub original_url: String,
    pub url: String,
    pub caption: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub extra_description: String,
    pub language: Option<String>,
    pub mime_type: String,
}

impl Audio {
    pub fn new(kind: ExtractorKind, original_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind,
            original_url: original_url.into(),
            url: url.into(),
            caption: None,
            thumbnail_url: None,
            author: None,
            extra_description: String::new(),
            language: None,
            mime_type: "audio/mpeg".to_string(),
        }
    }
}

/// One resolved media item. Never mutated after an extractor constructs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "media_type", rename_all = "snake_case")]
pub enum Media {
    Video(Video),
    Image(Image),
    Audio(Audio),
}

impl Media {
    pub fn kind(&self) -> ExtractorKind {
        match self {
            Media::Video(v) => v.kind,
            Media::Image(i) => i.kind,
            Media::Audio(a) => a.kind,
        }
    }

    /// Canonical identity of the item; also the cache key of its group.
    pub fn original_url(&self) -> &str {
        match self {
            Media::Video(v) => &v.original_url,
            Media::Image(i) => &i.original_url,
            Media::Audio(a) => &a.original_url,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Media::Video(v) => &v.url,
            Media::Image(i) => &i.url,
            Media::Audio(a) => &a.url,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Media::Video(v) => &v.mime_type,
            Media::Image(i) => &i.mime_type,
            Media::Audio(a) => &a.mime_type,
        }
    }
}

// Two items with the same original URL are the same logical media, even when
// resolved URLs differ across refetches.
impl PartialEq for Media {
    fn eq(&self, other: &Self) -> bool {
        self.original_url() == other.original_url()
    }
}

impl Eq for Media {}

impl Hash for Media {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.original_url().hash(state);
    }
}

/// Per-variant sequences with insertion order preserved. This is both the
/// merged result of a resolution and the cache record payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedMedia {
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub audios: Vec<Audio>,
}

impl GroupedMedia {
    pub fn from_items(items: Vec<Media>) -> Self {
        let mut group = Self::default();
        for item in items {
            match item {
                Media::Video(v) => group.videos.push(v),
                Media::Image(i) => group.images.push(i),
                Media::Audio(a) => group.audios.push(a),
            }
        }
        group
    }

    pub fn flat(&self) -> Vec<Media> {
        let mut items = Vec::with_capacity(self.len());
        items.extend(self.audios.iter().cloned().map(Media::Audio));
        items.extend(self.images.iter().cloned().map(Media::Image));
        items.extend(self.videos.iter().cloned().map(Media::Video));
        items
    }

    /// Element-wise concatenation, left to right. Associative.
    pub fn merge(mut self, other: Self) -> Self {
        self.videos.extend(other.videos);
        self.images.extend(other.images);
        self.audios.extend(other.audios);
        self
    }

    pub fn len(&self) -> usize {
        self.videos.len() + self.images.len() + self.audios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty() && self.images.is_empty() && self.audios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(original: &str, url: &str) -> Media {
        Media::Video(Video::new(ExtractorKind::TikTok, original, url))
    }

    fn image(original: &str, url: &str) -> Media {
        Media::Image(Image::new(ExtractorKind::Reddit, original, url))
    }

    #[test]
    fn identity_is_original_url_only() {
        let a = video("https://www.tiktok.com/@foo/video/1", "https://cdn.example/a.mp4");
        let b = video("https://www.tiktok.com/@foo/video/1", "https://cdn.example/b.mp4");
        let c = video("https://www.tiktok.com/@foo/video/2", "https://cdn.example/a.mp4");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn merge_is_associative() {
        let a = GroupedMedia::from_items(vec![video("u1", "r1"), image("u2", "r2")]);
        let b = GroupedMedia::from_items(vec![video("u3", "r3")]);
        let c = GroupedMedia::from_items(vec![image("u4", "r4"), video("u5", "r5")]);

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(left, right);
    }

    #[test]
    fn merge_preserves_insertion_order() {
        let a = GroupedMedia::from_items(vec![video("u1", "r1")]);
        let b = GroupedMedia::from_items(vec![video("u2", "r2")]);
        let merged = a.merge(b);
        let urls: Vec<&str> = merged.videos.iter().map(|v| v.original_url.as_str()).collect();
        assert_eq!(urls, vec!["u1", "u2"]);
    }

    #[test]
    fn empty_group_is_falsy() {
        let group = GroupedMedia::default();
        assert!(group.is_empty());
        assert_eq!(group.len(), 0);

        let group = GroupedMedia::from_items(vec![image("u", "r")]);
        assert!(!group.is_empty());
        assert_eq!(group.len(), 1);
    }
}
