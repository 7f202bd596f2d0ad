// src/extract/social.rs
// Authenticated provider API client for social-account sources. The trait is
// the seam; the HTTP implementation talks to a v2-style endpoint and only
// requests original posts (no reshares or replies).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ExtractError;
use crate::model::MediaKind;

#[derive(Debug, Clone)]
pub struct AccountProfile {
    pub id: String,
    pub name: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub media: Vec<PostMedia>,
}

#[derive(Debug, Clone)]
pub struct PostMedia {
    pub kind: MediaKind,
    pub url: Option<String>,
    pub preview_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_ms: Option<u64>,
}

#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn resolve_account(&self, handle: &str) -> Result<AccountProfile, ExtractError>;

    /// Newest-first original posts, bounded by `since_id` when present.
    async fn recent_original_posts(
        &self,
        account_id: &str,
        since_id: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Post>, ExtractError>;
}

pub struct HttpSocialClient {
    client: reqwest::Client,
    api_base: String,
    bearer_token: String,
}

impl HttpSocialClient {
    pub fn new(api_base: String, bearer_token: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base,
            bearer_token,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
    ) -> Result<T, ExtractError> {
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(query)
            .send()
            .await
            .map_err(|e| ExtractError::Fetch(format!("provider api: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ExtractError::Auth(format!("provider returned {status}")));
        }
        if status.as_u16() == 429 {
            let reset_at = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(900));
            return Err(ExtractError::RateLimited { reset_at });
        }
        if !status.is_success() {
            return Err(ExtractError::Fetch(format!("provider returned {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ExtractError::Parse(format!("provider json: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    name: String,
    username: String,
    profile_image_url: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimelineEnvelope {
    #[serde(default)]
    data: Vec<TweetData>,
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
    text: String,
    created_at: Option<String>,
    attachments: Option<Attachments>,
}

#[derive(Debug, Deserialize)]
struct Attachments {
    #[serde(default)]
    media_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    media: Vec<IncludedMedia>,
}

#[derive(Debug, Deserialize)]
struct IncludedMedia {
    media_key: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
    preview_image_url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration_ms: Option<u64>,
}

fn provider_media_kind(kind: Option<&str>) -> MediaKind {
    match kind {
        Some("video") => MediaKind::Video,
        Some("animated_gif") => MediaKind::Gif,
        _ => MediaKind::Image,
    }
}

#[async_trait]
impl SocialApi for HttpSocialClient {
    async fn resolve_account(&self, handle: &str) -> Result<AccountProfile, ExtractError> {
        let url = format!("{}/2/users/by/username/{handle}", self.api_base);
        let envelope: UserEnvelope = self
            .get_json(
                url,
                &[(
                    "user.fields",
                    "profile_image_url,name,description".to_string(),
                )],
            )
            .await?;

        let user = envelope
            .data
            .ok_or_else(|| ExtractError::Fetch(format!("account @{handle} not found")))?;
        Ok(AccountProfile {
            id: user.id,
            name: user.name,
            username: user.username,
            avatar_url: user.profile_image_url,
            bio: user.description,
        })
    }

    async fn recent_original_posts(
        &self,
        account_id: &str,
        since_id: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Post>, ExtractError> {
        let url = format!("{}/2/users/{account_id}/tweets", self.api_base);
        let mut query: Vec<(&str, String)> = vec![
            ("max_results", max_results.to_string()),
            ("exclude", "retweets,replies".to_string()),
            ("tweet.fields", "created_at,attachments".to_string()),
            (
                "media.fields",
                "url,preview_image_url,type,width,height,duration_ms".to_string(),
            ),
            ("expansions", "attachments.media_keys".to_string()),
        ];
        if let Some(since) = since_id {
            query.push(("since_id", since.to_string()));
        }

        let envelope: TimelineEnvelope = self.get_json(url, &query).await?;

        let included = envelope.includes.map(|i| i.media).unwrap_or_default();
        let posts = envelope
            .data
            .into_iter()
            .map(|tweet| {
                let media = tweet
                    .attachments
                    .map(|a| a.media_keys)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|key| included.iter().find(|m| m.media_key == key))
                    .map(|m| PostMedia {
                        kind: provider_media_kind(m.kind.as_deref()),
                        url: m.url.clone(),
                        preview_url: m.preview_image_url.clone(),
                        width: m.width,
                        height: m.height,
                        duration_ms: m.duration_ms,
                    })
                    .collect();

                Post {
                    id: tweet.id,
                    text: tweet.text,
                    created_at: tweet
                        .created_at
                        .as_deref()
                        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                        .map(|dt| dt.with_timezone(&Utc)),
                    media,
                }
            })
            .collect();

        Ok(posts)
    }
}

/// Provider avatars come back in a small rendition; swap in the large one.
pub fn upscale_avatar(url: &str) -> String {
    url.replace("_normal", "_400x400")
}

/// Handles are stored with or without the leading @.
pub fn clean_handle(handle: &str) -> &str {
    handle.trim().trim_start_matches('@')
}
