// tests/website_scrape.rs
// Website-source ingestion when the locator serves plain HTML instead of a
// feed: the page itself becomes a single candidate keyed by its URL.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use uuid::Uuid;

use feedwatch::config::AppConfig;
use feedwatch::extract::Extractor;
use feedwatch::model::{MediaKind, Source, SourceDetails, SourceKind};
use feedwatch::pipeline::Pipeline;
use feedwatch::queue::MemoryQueue;
use feedwatch::ratelimit::{MemoryCounters, RateLimiter};
use feedwatch::store::{MemoryStore, Store};

const PAGE: &str = r#"<!doctype html>
<html>
<head>
  <title>Acme Kicks</title>
  <meta property="og:title" content="Air Max Release"/>
  <meta property="og:description" content="Full look at the upcoming release."/>
  <meta property="og:image" content="/uploads/2024/hero.jpg"/>
</head>
<body>
  <img src="https://tracker.example.com/pixel.gif" width="1" height="1"/>
  <article>
    <p>The retail price is set at $150 for the full-size run.</p>
    <p>Style code FZ1234-001 shows up on the box label in early photos.</p>
    <img src="/uploads/2024/side-profile.jpg"/>
    <img src="/uploads/2024/hero.jpg?w=1200"/>
  </article>
</body>
</html>"#;

async fn serve_page(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
            });
        }
    });
    format!("http://{addr}/releases/air-max")
}

fn website_source(locator: String) -> Source {
    Source {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        name: "Acme Kicks".into(),
        kind: SourceKind::Website,
        locator,
        active: true,
        check_interval_secs: 300,
        last_checked_at: None,
        last_error: None,
        details: SourceDetails::Website,
    }
}

fn build_pipeline(store: &Arc<MemoryStore>) -> Pipeline {
    let cfg = AppConfig::default();
    let extractor = Extractor::new(&cfg, None).unwrap();
    let limiter = Arc::new(RateLimiter::new(Box::new(MemoryCounters::new())));
    let (queue, _rx) = MemoryQueue::new();
    let store_dyn: Arc<dyn Store> = Arc::clone(store) as Arc<dyn Store>;
    Pipeline::new(store_dyn, extractor, limiter, Arc::new(queue), &cfg)
}

#[tokio::test]
async fn non_feed_page_ingests_as_a_single_keyed_item() {
    let store = Arc::new(MemoryStore::new());
    let source = website_source(serve_page(PAGE).await);
    store.insert_source(source.clone()).await;
    let pipeline = build_pipeline(&store);

    let first = pipeline.run(source.id).await;
    assert_eq!(first.new_alerts, 1);
    assert!(first.error.is_none());

    let alerts = store.alerts_for_source(source.id).await;
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    // The page URL is the dedup key, so a later fetch of the same page is a
    // no-op.
    assert_eq!(alert.external_id, source.locator);
    assert!(alert.content.starts_with("Air Max Release"));
    assert!(alert.content.contains("SKU: FZ1234-001"));
    assert!(alert.content.contains("Price: $150"));

    let media = store.media_for_alert(alert.id).await;
    let urls: Vec<&str> = media.iter().map(|m| m.original_url.as_str()).collect();
    // Tracking pixel excluded; the og:image and its query-string rendition
    // collapse to one entry.
    assert!(!urls.iter().any(|u| u.contains("pixel.gif")));
    assert_eq!(
        urls.iter().filter(|u| u.contains("hero.jpg")).count(),
        1,
        "renditions of the same image collapse"
    );
    assert!(urls.iter().any(|u| u.contains("side-profile.jpg")));
    assert!(media.iter().all(|m| m.kind == MediaKind::Image));

    let second = pipeline.run(source.id).await;
    assert_eq!(second.new_alerts, 0);
}
