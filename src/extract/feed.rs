// src/extract/feed.rs
// RSS feed parsing into candidate items. quick-xml + serde structs over the
// document; media comes from enclosures, media-rss elements, and the encoded
// body, in that priority order.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};
use url::Url;

use crate::error::ExtractError;
use crate::extract::page::{clean_text, decode_entities};
use crate::model::{classify_media, CandidateItem, CandidateMedia, MediaKind, Source};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    image: Option<ChannelImage>,
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct ChannelImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    // quick-xml's serde deserializer matches on local names with the
    // namespace prefix stripped, so `content:encoded` arrives as `encoded`,
    // `media:content` as `content`, and `media:thumbnail` as `thumbnail`.
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "enclosure", default)]
    enclosures: Vec<Enclosure>,
    #[serde(rename = "content", default)]
    media_content: Vec<MediaRef>,
    #[serde(rename = "thumbnail", default)]
    media_thumbnail: Vec<MediaRef>,
}

#[derive(Debug, Deserialize)]
struct Guid {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaRef {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
    #[serde(rename = "@medium")]
    medium: Option<String>,
}

static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).unwrap());

/// Loose named entities that break strict XML parsing; scrubbed before the
/// document is handed to quick-xml.
fn scrub_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// First non-empty of guid, link, title. The chain is a total order, so two
/// items only collide when the feed itself repeats an identifier.
fn external_id_of(item: &Item) -> Option<String> {
    item.guid
        .as_ref()
        .and_then(|g| g.value.as_deref())
        .or(item.link.as_deref())
        .or(item.title.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Attachments in priority order: image enclosures, media:content,
/// media:thumbnail, then the first <img> in the encoded body. Document order
/// is preserved within each category; exact-URL duplicates collapse.
fn extract_item_media(item: &Item) -> Vec<CandidateMedia> {
    let mut media: Vec<CandidateMedia> = Vec::new();
    let mut push = |url: &str, kind: MediaKind| {
        if !url.is_empty() && !media.iter().any(|m| m.url == url) {
            media.push(CandidateMedia {
                kind,
                url: url.to_string(),
                thumbnail: None,
                width: None,
                height: None,
                duration_secs: None,
            });
        }
    };

    for enclosure in &item.enclosures {
        let is_image = enclosure
            .mime
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().starts_with("image"));
        if let (Some(url), true) = (enclosure.url.as_deref(), is_image) {
            push(url, classify_media(url, enclosure.mime.as_deref()));
        }
    }

    for mc in &item.media_content {
        if let Some(url) = mc.url.as_deref() {
            let hint = mc.mime.as_deref().or(mc.medium.as_deref());
            push(url, classify_media(url, hint));
        }
    }

    for thumb in &item.media_thumbnail {
        if let Some(url) = thumb.url.as_deref() {
            push(url, MediaKind::Image);
        }
    }

    let body = item
        .content_encoded
        .as_deref()
        .or(item.description.as_deref())
        .unwrap_or_default();
    if let Some(caps) = RE_IMG_SRC.captures(body) {
        let url = caps[1].to_string();
        push(&url, classify_media(&url, None));
    }

    media
}

/// Parse a fetched feed document into candidate items, newest-first up to
/// `items_cap`.
pub fn parse_feed(
    body: &str,
    source: &Source,
    items_cap: usize,
) -> Result<Vec<CandidateItem>, ExtractError> {
    let scrubbed = scrub_entities_for_xml(body);
    let rss: Rss =
        from_str(&scrubbed).map_err(|e| ExtractError::Parse(format!("feed xml: {e}")))?;

    let channel_title = rss
        .channel
        .title
        .as_deref()
        .map(decode_entities)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| source.name.clone());
    let channel_avatar = rss.channel.image.and_then(|img| img.url);
    let feed_host = host_of(&source.locator);

    let mut items = Vec::new();
    for item in rss.channel.items.into_iter().take(items_cap) {
        let Some(external_id) = external_id_of(&item) else {
            continue;
        };

        let snippet = item
            .description
            .as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .or_else(|| item.title.as_deref().map(decode_entities))
            .unwrap_or_default();

        let media = extract_item_media(&item);
        let posted_at = item
            .pub_date
            .as_deref()
            .and_then(parse_rfc2822)
            .unwrap_or_else(Utc::now);

        items.push(CandidateItem {
            external_id,
            content: snippet,
            author_name: channel_title.clone(),
            author_handle: feed_host.clone(),
            author_avatar: channel_avatar.clone(),
            permalink: item.link.unwrap_or_else(|| source.locator.clone()),
            posted_at,
            media,
            metadata: None,
        });
    }

    Ok(items)
}
