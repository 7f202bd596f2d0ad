// src/extract/images.rs
// Image URL heuristics shared by the feed and page extractors.

use std::collections::HashSet;

use url::Url;

/// Markers for non-content images: tracking pixels, chrome, share badges,
/// analytics/ad hosts.
const EXCLUDE_MARKERS: &[&str] = &[
    "pixel",
    "track",
    "beacon",
    "1x1",
    "spacer",
    "logo",
    "icon",
    "favicon",
    "avatar",
    "emoji",
    "button",
    "badge",
    "share",
    "social",
    "google-analytics",
    "facebook.com/tr",
    "doubleclick",
];

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif"];

/// Path/host segments that mark a hosted content image even without a file
/// extension.
const MEDIA_HOST_MARKERS: &[&str] = &[
    "cloudinary",
    "imgix",
    "wp-content",
    "uploads",
    "images",
    "media",
    "cdn",
];

/// Accept a URL as a content image: not excluded by marker, and either a
/// recognized image extension or a recognized media/CDN path segment.
pub fn is_content_image_url(url: &str) -> bool {
    let low = url.to_ascii_lowercase();
    if EXCLUDE_MARKERS.iter().any(|m| low.contains(m)) {
        return false;
    }
    let has_extension = IMAGE_EXTENSIONS.iter().any(|ext| low.contains(ext));
    let on_media_host = MEDIA_HOST_MARKERS.iter().any(|m| low.contains(m));
    has_extension || on_media_host
}

/// Dedup key collapsing differently-sized renditions of the same asset:
/// host + path with query parameters stripped.
pub fn rendition_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!(
            "{}{}",
            parsed.host_str().unwrap_or_default(),
            parsed.path()
        ),
        Err(_) => url.to_string(),
    }
}

/// Resolve protocol-relative and root-relative image references against the
/// page URL. Returns None when the reference cannot be made absolute.
pub fn absolutize(raw: &str, page_url: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("//") {
        return Some(format!("https:{raw}"));
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    let base = Url::parse(page_url).ok()?;
    base.join(raw).ok().map(|u| u.to_string())
}

/// Accumulates content-image URLs in first-seen order, deduplicated by
/// rendition key, up to a cap.
pub struct ImageCollector {
    seen: HashSet<String>,
    urls: Vec<String>,
    cap: usize,
}

impl ImageCollector {
    pub fn new(cap: usize) -> Self {
        Self {
            seen: HashSet::new(),
            urls: Vec::new(),
            cap,
        }
    }

    pub fn add(&mut self, url: &str) {
        if self.urls.len() >= self.cap || !is_content_image_url(url) {
            return;
        }
        let key = rendition_key(url);
        if self.seen.insert(key) {
            self.urls.push(url.to_string());
        }
    }

    pub fn add_resolved(&mut self, raw: &str, page_url: &str) {
        if let Some(url) = absolutize(raw, page_url) {
            self.add(&url);
        }
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}
