// src/extract/page.rs
// HTML page scraping for sources without a usable structured feed, and for
// enriching feed items with full article content. Pure functions over the
// fetched document; the HTTP call lives in the extractor.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::images::ImageCollector;
use crate::extract::page_meta::extract_metadata;
use crate::model::PageMetadata;

#[derive(Debug, Clone, Default)]
pub struct PageData {
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub metadata: PageMetadata,
}

impl PageData {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.content.is_empty() && self.images.is_empty()
    }
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// Meta tags appear with property/name before or after content; one pattern
// per ordering, filtered by key.
static RE_META_KEY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+(?:property|name)=["']([^"']+)["'][^>]+content=["']([^"']+)["']"#)
        .unwrap()
});
static RE_META_CONTENT_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+content=["']([^"']+)["'][^>]+(?:property|name)=["']([^"']+)["']"#)
        .unwrap()
});

static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").unwrap());
static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());

static RE_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<article[^>]*>(.*?)</article>").unwrap());
static RE_MAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<main[^>]*>(.*?)</main>").unwrap());
static RE_CONTENT_DIV: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<div[^>]+class=["'][^"']*(?:post-content|article-content|entry-content|content-body|article-body)[^"']*["'][^>]*>(.*?)</div>"#,
    )
    .unwrap()
});

static RE_P: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());
static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).unwrap());
static RE_SRCSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)srcset=["']([^"']+)["']"#).unwrap());

/// Decode HTML entities (numeric, hex, and named) and trim.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).trim().to_string()
}

/// Strip tags, decode entities, and collapse whitespace.
pub fn clean_text(fragment: &str) -> String {
    let stripped = RE_TAGS.replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

fn meta_content(html: &str, key: &str) -> Option<String> {
    for caps in RE_META_KEY_FIRST.captures_iter(html) {
        if caps[1].eq_ignore_ascii_case(key) {
            return Some(caps[2].to_string());
        }
    }
    for caps in RE_META_CONTENT_FIRST.captures_iter(html) {
        if caps[2].eq_ignore_ascii_case(key) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Title priority: og:title, then <title>, then the first <h1>.
fn extract_title(html: &str) -> String {
    if let Some(title) = meta_content(html, "og:title") {
        return decode_entities(&title);
    }
    if let Some(caps) = RE_TITLE.captures(html) {
        return decode_entities(&caps[1]);
    }
    if let Some(caps) = RE_H1.captures(html) {
        return clean_text(&caps[1]);
    }
    String::new()
}

/// The best-matching content container: a known content-class div wins over
/// <article>, which wins over <main>.
fn content_container<'a>(html: &'a str) -> &'a str {
    if let Some(caps) = RE_CONTENT_DIV.captures(html) {
        return caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    }
    if let Some(caps) = RE_ARTICLE.captures(html) {
        return caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    }
    if let Some(caps) = RE_MAIN.captures(html) {
        return caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    }
    ""
}

/// Body priority: og:description, overridden by the first five substantial
/// paragraphs (> 20 chars after tag stripping) from the content container.
fn extract_body(html: &str, container: &str) -> String {
    let mut content = meta_content(html, "og:description")
        .map(|d| decode_entities(&d))
        .unwrap_or_default();

    let paragraphs: Vec<String> = RE_P
        .captures_iter(container)
        .filter_map(|caps| {
            let text = clean_text(&caps[1]);
            (text.chars().count() > 20).then_some(text)
        })
        .take(5)
        .collect();

    if !paragraphs.is_empty() {
        content = paragraphs.join("\n\n");
    }
    content
}

fn extract_images(html: &str, container: &str, page_url: &str, cap: usize) -> Vec<String> {
    let mut collector = ImageCollector::new(cap);

    if let Some(og) = meta_content(html, "og:image") {
        collector.add_resolved(&og, page_url);
    }
    if let Some(tw) = meta_content(html, "twitter:image") {
        collector.add_resolved(&tw, page_url);
    }
    for caps in RE_IMG_SRC.captures_iter(container) {
        collector.add_resolved(&caps[1], page_url);
    }
    for caps in RE_SRCSET.captures_iter(container) {
        for entry in caps[1].split(',') {
            if let Some(url) = entry.trim().split_whitespace().next() {
                collector.add_resolved(url, page_url);
            }
        }
    }

    collector.into_urls()
}

/// Scrape a fetched HTML document into title, body, images, and optional
/// product metadata.
pub fn scrape(html: &str, page_url: &str, images_cap: usize) -> PageData {
    let container = content_container(html);
    PageData {
        title: extract_title(html),
        content: extract_body(html, container),
        images: extract_images(html, container, page_url, images_cap),
        metadata: extract_metadata(html),
    }
}

/// Assemble the persisted alert content: title, a validated metadata line,
/// then the cleaned body, separated by blank lines.
pub fn format_content(title: &str, body: &str, metadata: &PageMetadata) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !title.is_empty() {
        parts.push(title.to_string());
    }

    let mut meta_parts: Vec<String> = Vec::new();
    if let Some(sku) = &metadata.sku {
        meta_parts.push(format!("SKU: {sku}"));
    }
    if let Some(price) = &metadata.price {
        meta_parts.push(format!("Price: {price}"));
    }
    if let Some(date) = &metadata.release_date {
        meta_parts.push(format!("Release: {date}"));
    }
    if let Some(colorway) = &metadata.colorway {
        meta_parts.push(format!("Colorway: {colorway}"));
    }
    if !meta_parts.is_empty() {
        parts.push(meta_parts.join(" | "));
    }

    if body.chars().count() > 50 {
        let cleaned = RE_WS.replace_all(body, " ").trim().to_string();
        if cleaned.chars().count() > 50 {
            parts.push(cleaned);
        }
    }

    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_falls_back_from_og_to_title_to_h1() {
        let with_og = r#"<meta property="og:title" content="OG &amp; Title"/><title>Doc</title>"#;
        assert_eq!(extract_title(with_og), "OG & Title");

        let with_title = "<title>Doc Title</title><h1>Heading</h1>";
        assert_eq!(extract_title(with_title), "Doc Title");

        let with_h1 = "<h1>Only <em>Heading</em></h1>";
        assert_eq!(extract_title(with_h1), "Only Heading");
    }

    #[test]
    fn reversed_meta_attribute_order_is_matched() {
        let html = r#"<meta content="Reversed" property="og:title"/>"#;
        assert_eq!(extract_title(html), "Reversed");
    }

    #[test]
    fn short_paragraphs_are_skipped() {
        let html = r#"<article><p>tiny</p><p>This paragraph is long enough to qualify.</p></article>"#;
        let container = content_container(html);
        let body = extract_body(html, container);
        assert_eq!(body, "This paragraph is long enough to qualify.");
    }

    #[test]
    fn content_div_beats_article() {
        let html = r#"
            <article><p>Article paragraph that is definitely long enough.</p></article>
            <div class="entry-content"><p>Div paragraph that is definitely long enough.</p></div>
        "#;
        let body = extract_body(html, content_container(html));
        assert_eq!(body, "Div paragraph that is definitely long enough.");
    }

    #[test]
    fn format_content_includes_validated_metadata_line() {
        let meta = PageMetadata {
            price: Some("$190".into()),
            sku: Some("DZ5485-612".into()),
            ..Default::default()
        };
        let body = "A body long enough to be included in the formatted output text.";
        let out = format_content("Jordan 1 High", body, &meta);
        assert!(out.starts_with("Jordan 1 High\n\nSKU: DZ5485-612 | Price: $190\n\n"));
    }
}
