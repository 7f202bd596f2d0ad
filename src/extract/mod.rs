// src/extract/mod.rs
// Turns a source into candidate items: feed parse, page scrape, or provider
// API, depending on the source kind.

pub mod feed;
pub mod images;
pub mod page;
pub mod page_meta;
pub mod social;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use url::Url;

use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::model::{CandidateItem, CandidateMedia, Source, SourceDetails, SourceKind};
use crate::extract::social::{clean_handle, upscale_avatar, SocialApi};

/// Extraction output: the candidates plus, for cursor-carrying sources, the
/// refreshed details to persist after a successful run.
pub struct Extraction {
    pub items: Vec<CandidateItem>,
    pub details: Option<SourceDetails>,
}

impl Extraction {
    fn items_only(items: Vec<CandidateItem>) -> Self {
        Self {
            items,
            details: None,
        }
    }
}

pub struct Extractor {
    http: reqwest::Client,
    social: Option<Arc<dyn SocialApi>>,
    feed_items_cap: usize,
    page_images_cap: usize,
    social_web_base: String,
}

impl Extractor {
    pub fn new(cfg: &AppConfig, social: Option<Arc<dyn SocialApi>>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            social,
            feed_items_cap: cfg.feed_items_cap,
            page_images_cap: cfg.page_images_cap,
            social_web_base: cfg.social_web_base.clone(),
        })
    }

    pub async fn extract(&self, source: &Source) -> Result<Extraction, ExtractError> {
        match source.kind {
            SourceKind::Feed => {
                let body = self.fetch_text(&source.locator).await?;
                let items = feed::parse_feed(&body, source, self.feed_items_cap)?;
                Ok(Extraction::items_only(items))
            }
            SourceKind::Website => self.extract_website(source).await,
            SourceKind::SocialAccount => self.extract_social(source).await,
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ExtractError> {
        let response = self
            .http
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| ExtractError::Fetch(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Fetch(format!("GET {url}: HTTP {status}")));
        }
        response
            .text()
            .await
            .map_err(|e| ExtractError::Fetch(format!("GET {url} body: {e}")))
    }

    /// Website sources publish a feed more often than not; when the locator
    /// parses as one, each item's permalink is scraped for full content and
    /// extra images. Otherwise the locator itself is scraped as one item.
    async fn extract_website(&self, source: &Source) -> Result<Extraction, ExtractError> {
        let body = self.fetch_text(&source.locator).await?;

        match feed::parse_feed(&body, source, self.feed_items_cap) {
            Ok(mut items) => {
                for item in &mut items {
                    self.enrich_from_page(item).await;
                }
                Ok(Extraction::items_only(items))
            }
            Err(ExtractError::Parse(_)) => {
                let item = self.scrape_single_page(source, &body)?;
                Ok(Extraction::items_only(vec![item]))
            }
            Err(other) => Err(other),
        }
    }

    /// Best effort: a failed page fetch leaves the feed-derived item intact.
    async fn enrich_from_page(&self, item: &mut CandidateItem) {
        let page_html = match self.fetch_text(&item.permalink).await {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(permalink = %item.permalink, error = %e, "page enrichment skipped");
                return;
            }
        };

        let page = page::scrape(&page_html, &item.permalink, self.page_images_cap);
        if page.is_empty() {
            return;
        }

        let title = if page.title.is_empty() {
            item.content.clone()
        } else {
            page.title.clone()
        };
        let formatted = page::format_content(&title, &page.content, &page.metadata);
        if !formatted.is_empty() {
            item.content = formatted;
        }
        if !page.metadata.is_empty() {
            item.metadata = Some(page.metadata.clone());
        }

        for url in page.images {
            if item.media.len() >= self.page_images_cap {
                break;
            }
            if !item.media.iter().any(|m| m.url == url) {
                item.media.push(CandidateMedia::image(url));
            }
        }
        item.media.truncate(self.page_images_cap);
    }

    fn scrape_single_page(
        &self,
        source: &Source,
        html: &str,
    ) -> Result<CandidateItem, ExtractError> {
        let page = page::scrape(html, &source.locator, self.page_images_cap);
        if page.is_empty() {
            return Err(ExtractError::Parse(format!(
                "no feed and no scrapable content at {}",
                source.locator
            )));
        }

        let host = Url::parse(&source.locator)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let content = page::format_content(&page.title, &page.content, &page.metadata);

        Ok(CandidateItem {
            // The page URL is the only stable identity a scraped page has.
            external_id: source.locator.clone(),
            content,
            author_name: source.name.clone(),
            author_handle: host,
            author_avatar: None,
            permalink: source.locator.clone(),
            posted_at: Utc::now(),
            media: page.images.into_iter().map(CandidateMedia::image).collect(),
            metadata: (!page.metadata.is_empty()).then_some(page.metadata),
        })
    }

    async fn extract_social(&self, source: &Source) -> Result<Extraction, ExtractError> {
        let Some(api) = &self.social else {
            return Err(ExtractError::Auth(
                "no provider credentials configured".to_string(),
            ));
        };

        let handle = clean_handle(&source.locator);
        let profile = api.resolve_account(handle).await?;
        let since_id = source.details.last_post_id().map(str::to_string);

        let posts = api
            .recent_original_posts(&profile.id, since_id.as_deref(), 10)
            .await?;

        // Posts arrive newest-first; the first id becomes the next cursor.
        let next_cursor = posts.first().map(|p| p.id.clone()).or(since_id);
        let avatar = profile.avatar_url.as_deref().map(upscale_avatar);

        let items = posts
            .into_iter()
            .map(|post| {
                let media = post
                    .media
                    .into_iter()
                    .filter_map(|m| {
                        let url = m.url.clone().or_else(|| m.preview_url.clone())?;
                        Some(CandidateMedia {
                            kind: m.kind,
                            url,
                            thumbnail: m.preview_url,
                            width: m.width,
                            height: m.height,
                            duration_secs: m.duration_ms.map(|ms| ((ms + 500) / 1000) as u32),
                        })
                    })
                    .collect();

                CandidateItem {
                    external_id: post.id.clone(),
                    content: post.text,
                    author_name: profile.name.clone(),
                    author_handle: format!("@{}", profile.username),
                    author_avatar: avatar.clone(),
                    permalink: format!(
                        "{}/{}/status/{}",
                        self.social_web_base, profile.username, post.id
                    ),
                    posted_at: post.created_at.unwrap_or_else(Utc::now),
                    media,
                    metadata: None,
                }
            })
            .collect();

        Ok(Extraction {
            items,
            details: Some(SourceDetails::SocialAccount {
                account_id: Some(profile.id),
                display_name: Some(profile.name),
                handle: Some(profile.username),
                avatar_url: avatar,
                bio: profile.bio,
                last_post_id: next_cursor,
            }),
        })
    }
}
