// src/model.rs
// Domain types shared across the pipeline, store, and dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Feed,
    SocialAccount,
    Website,
}

/// Kind-specific source state, persisted as a tagged blob at the storage
/// boundary. Only social accounts carry a forward cursor; feeds rely on the
/// dedup ledger alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDetails {
    Feed,
    Website,
    SocialAccount {
        account_id: Option<String>,
        display_name: Option<String>,
        handle: Option<String>,
        avatar_url: Option<String>,
        bio: Option<String>,
        /// Newest provider post id seen; next cycle fetches only newer posts.
        last_post_id: Option<String>,
    },
}

impl SourceDetails {
    pub fn empty_for(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Feed => SourceDetails::Feed,
            SourceKind::Website => SourceDetails::Website,
            SourceKind::SocialAccount => SourceDetails::SocialAccount {
                account_id: None,
                display_name: None,
                handle: None,
                avatar_url: None,
                bio: None,
                last_post_id: None,
            },
        }
    }

    pub fn last_post_id(&self) -> Option<&str> {
        match self {
            SourceDetails::SocialAccount { last_post_id, .. } => last_post_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub kind: SourceKind,
    /// Feed URL, page URL, or social handle depending on kind.
    pub locator: String,
    pub active: bool,
    /// Must be > 0.
    pub check_interval_secs: u64,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub details: SourceDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Viewed,
    Saved,
    Published,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub source_id: Uuid,
    /// Source-scoped dedup key: guid, permalink, or provider post id.
    pub external_id: String,
    pub content: String,
    pub author_name: String,
    pub author_handle: String,
    pub author_avatar: Option<String>,
    pub permalink: String,
    pub status: AlertStatus,
    pub is_read: bool,
    pub is_pinned: bool,
    pub detected_at: DateTime<Utc>,
    pub posted_at: DateTime<Utc>,
}

/// Insert shape for an alert; the store assigns id and detected_at.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub source_id: Uuid,
    pub external_id: String,
    pub content: String,
    pub author_name: String,
    pub author_handle: String,
    pub author_avatar: Option<String>,
    pub permalink: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Gif,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub kind: MediaKind,
    pub original_url: String,
    pub thumbnail: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub alert_id: Uuid,
    pub kind: MediaKind,
    pub original_url: String,
    pub thumbnail: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<u32>,
}

/// Classify an attachment from its URL and declared MIME type (or provider
/// `medium` hint). Anything unrecognized counts as an image.
pub fn classify_media(url: &str, mime: Option<&str>) -> MediaKind {
    let lower_url = url.to_ascii_lowercase();
    let lower_mime = mime.map(|m| m.to_ascii_lowercase()).unwrap_or_default();

    if lower_url.ends_with(".gif") || lower_mime.contains("gif") {
        return MediaKind::Gif;
    }
    if lower_mime.contains("video")
        || lower_url.ends_with(".mp4")
        || lower_url.ends_with(".webm")
        || lower_url.ends_with(".mov")
    {
        return MediaKind::Video;
    }
    MediaKind::Image
}

/// Opportunistically scraped product fields. Every field is validated
/// independently before being attached; invalid matches are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub price: Option<String>,
    pub release_date: Option<String>,
    pub sku: Option<String>,
    pub colorway: Option<String>,
    pub brand: Option<String>,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.release_date.is_none()
            && self.sku.is_none()
            && self.colorway.is_none()
            && self.brand.is_none()
    }
}

/// In-memory item produced by extraction, prior to dedup and persistence.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    pub external_id: String,
    pub content: String,
    pub author_name: String,
    pub author_handle: String,
    pub author_avatar: Option<String>,
    pub permalink: String,
    pub posted_at: DateTime<Utc>,
    pub media: Vec<CandidateMedia>,
    pub metadata: Option<PageMetadata>,
}

#[derive(Debug, Clone)]
pub struct CandidateMedia {
    pub kind: MediaKind,
    pub url: String,
    pub thumbnail: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<u32>,
}

impl CandidateMedia {
    pub fn image(url: String) -> Self {
        Self {
            kind: MediaKind::Image,
            url,
            thumbnail: None,
            width: None,
            height: None,
            duration_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub endpoint: String,
    pub keys: PushKeys,
}

/// Membership row linking a push subscription's owner to an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub organization_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_classification_prefers_gif_then_video() {
        assert_eq!(classify_media("https://x/a.gif", None), MediaKind::Gif);
        assert_eq!(
            classify_media("https://x/clip", Some("image/gif")),
            MediaKind::Gif
        );
        assert_eq!(classify_media("https://x/a.mp4", None), MediaKind::Video);
        assert_eq!(
            classify_media("https://x/stream", Some("video/mp4")),
            MediaKind::Video
        );
        assert_eq!(classify_media("https://x/a.jpg", None), MediaKind::Image);
        assert_eq!(classify_media("https://x/opaque", None), MediaKind::Image);
    }

    #[test]
    fn details_round_trip_as_tagged_blob() {
        let details = SourceDetails::SocialAccount {
            account_id: Some("12345".into()),
            display_name: Some("Acme".into()),
            handle: Some("acme".into()),
            avatar_url: None,
            bio: None,
            last_post_id: Some("9001".into()),
        };
        let blob = serde_json::to_string(&details).unwrap();
        assert!(blob.contains("\"kind\":\"social_account\""));
        let back: SourceDetails = serde_json::from_str(&blob).unwrap();
        assert_eq!(back, details);
        assert_eq!(back.last_post_id(), Some("9001"));
    }
}
