// tests/social_ingest.rs
// Social-account ingestion against a scripted provider: cursor advance,
// profile refresh, and the per-organization call budget.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use feedwatch::config::AppConfig;
use feedwatch::error::ExtractError;
use feedwatch::extract::social::{AccountProfile, Post, SocialApi};
use feedwatch::extract::Extractor;
use feedwatch::model::{Source, SourceDetails, SourceKind};
use feedwatch::pipeline::Pipeline;
use feedwatch::queue::MemoryQueue;
use feedwatch::ratelimit::{MemoryCounters, RateLimiter};
use feedwatch::store::{MemoryStore, Store};

struct ScriptedProvider {
    posts: Vec<Post>,
    seen_since: Mutex<Vec<Option<String>>>,
}

impl ScriptedProvider {
    fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            seen_since: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SocialApi for ScriptedProvider {
    async fn resolve_account(&self, handle: &str) -> Result<AccountProfile, ExtractError> {
        Ok(AccountProfile {
            id: "42".into(),
            name: "Acme Sneakers".into(),
            username: handle.to_string(),
            avatar_url: Some("https://img.example.com/u/42_normal.jpg".into()),
            bio: Some("Releases and restocks".into()),
        })
    }

    async fn recent_original_posts(
        &self,
        _account_id: &str,
        since_id: Option<&str>,
        _max_results: usize,
    ) -> Result<Vec<Post>, ExtractError> {
        self.seen_since
            .lock()
            .await
            .push(since_id.map(str::to_string));
        // Newest-first, bounded by the cursor the caller hands us.
        Ok(self
            .posts
            .iter()
            .filter(|p| since_id.is_none_or(|since| p.id.as_str() > since))
            .cloned()
            .collect())
    }
}

fn post(id: &str, text: &str) -> Post {
    Post {
        id: id.into(),
        text: text.into(),
        created_at: Some(Utc::now()),
        media: Vec::new(),
    }
}

fn social_source() -> Source {
    Source {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        name: "Acme".into(),
        kind: SourceKind::SocialAccount,
        locator: "@acme".into(),
        active: true,
        check_interval_secs: 300,
        last_checked_at: None,
        last_error: None,
        details: SourceDetails::empty_for(SourceKind::SocialAccount),
    }
}

fn build_pipeline(
    store: &Arc<MemoryStore>,
    provider: Arc<ScriptedProvider>,
    cfg: &AppConfig,
) -> Pipeline {
    let extractor = Extractor::new(cfg, Some(provider)).unwrap();
    let limiter = Arc::new(RateLimiter::new(Box::new(MemoryCounters::new())));
    let (queue, _rx) = MemoryQueue::new();
    let store_dyn: Arc<dyn Store> = Arc::clone(store) as Arc<dyn Store>;
    Pipeline::new(store_dyn, extractor, limiter, Arc::new(queue), cfg)
}

#[tokio::test]
async fn cursor_advances_to_newest_post() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(vec![
        post("1005", "restock live"),
        post("1003", "first look"),
    ]));
    let source = social_source();
    store.insert_source(source.clone()).await;
    let pipeline = build_pipeline(&store, Arc::clone(&provider), &AppConfig::default());

    let first = pipeline.run(source.id).await;
    assert_eq!(first.new_alerts, 2);

    let refreshed = store.source(source.id).await.unwrap();
    assert_eq!(refreshed.details.last_post_id(), Some("1005"));
    match &refreshed.details {
        SourceDetails::SocialAccount {
            display_name,
            handle,
            avatar_url,
            ..
        } => {
            assert_eq!(display_name.as_deref(), Some("Acme Sneakers"));
            assert_eq!(handle.as_deref(), Some("acme"));
            // The stored avatar is the large rendition.
            assert_eq!(
                avatar_url.as_deref(),
                Some("https://img.example.com/u/42_400x400.jpg")
            );
        }
        other => panic!("expected social details, got {other:?}"),
    }

    // Second cycle passes the cursor; nothing newer exists.
    let second = pipeline.run(source.id).await;
    assert_eq!(second.new_alerts, 0);
    let since = provider.seen_since.lock().await;
    assert_eq!(since.as_slice(), [None, Some("1005".to_string())]);
}

#[tokio::test]
async fn empty_timeline_keeps_the_existing_cursor() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(vec![post("1001", "old news")]));
    let mut source = social_source();
    source.details = SourceDetails::SocialAccount {
        account_id: Some("42".into()),
        display_name: None,
        handle: None,
        avatar_url: None,
        bio: None,
        last_post_id: Some("1001".into()),
    };
    store.insert_source(source.clone()).await;
    let pipeline = build_pipeline(&store, provider, &AppConfig::default());

    let result = pipeline.run(source.id).await;
    assert_eq!(result.new_alerts, 0);

    let refreshed = store.source(source.id).await.unwrap();
    assert_eq!(refreshed.details.last_post_id(), Some("1001"));
}

#[tokio::test]
async fn exhausted_provider_budget_fails_the_run_as_retryable() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(ScriptedProvider::new(vec![post("1001", "hello")]));
    let source = social_source();
    store.insert_source(source.clone()).await;

    let cfg = AppConfig {
        social_rate_limit: 1,
        ..AppConfig::default()
    };
    let pipeline = build_pipeline(&store, provider, &cfg);

    assert_eq!(pipeline.run(source.id).await.new_alerts, 1);

    // The single-call budget is spent; the next run is denied before the
    // provider is touched and the denial lands on the source.
    let denied = pipeline.run(source.id).await;
    assert_eq!(denied.new_alerts, 0);
    assert!(denied.error.is_some());

    let row = store.source(source.id).await.unwrap();
    assert!(row.last_error.is_some());
    assert!(row.active, "a rate-limited source stays schedulable");
}

#[tokio::test]
async fn missing_credentials_record_an_auth_error() {
    let store = Arc::new(MemoryStore::new());
    let source = social_source();
    store.insert_source(source.clone()).await;

    let cfg = AppConfig::default();
    let extractor = Extractor::new(&cfg, None).unwrap();
    let limiter = Arc::new(RateLimiter::new(Box::new(MemoryCounters::new())));
    let (queue, _rx) = MemoryQueue::new();
    let store_dyn: Arc<dyn Store> = Arc::clone(&store) as Arc<dyn Store>;
    let pipeline = Pipeline::new(store_dyn, extractor, limiter, Arc::new(queue), &cfg);

    let result = pipeline.run(source.id).await;
    assert_eq!(result.new_alerts, 0);
    assert!(result.error.is_some());
}
