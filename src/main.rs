//! Feedwatch binary entrypoint.
//! Boots the monitoring engine: scheduler, worker pool, and notification
//! dispatcher, wired over the in-process store and queue.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedwatch::config::AppConfig;
use feedwatch::extract::social::{HttpSocialClient, SocialApi};
use feedwatch::extract::Extractor;
use feedwatch::notify::push::HttpPushSender;
use feedwatch::notify::Dispatcher;
use feedwatch::pipeline::Pipeline;
use feedwatch::queue::MemoryQueue;
use feedwatch::ratelimit::{CounterStore, MemoryCounters, RateLimiter, RedisCounters};
use feedwatch::scheduler::{run_scheduler, InFlight};
use feedwatch::store::{MemoryStore, Store};
use feedwatch::worker::{run_workers, WorkerLimits};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feedwatch=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env();
    tracing::info!(
        tick_secs = cfg.tick_secs,
        feed_workers = cfg.feed_workers,
        api_workers = cfg.api_workers,
        notify_workers = cfg.notify_workers,
        "starting feedwatch"
    );

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let counters: Box<dyn CounterStore> = match &cfg.redis_url {
        Some(url) => match RedisCounters::new(url) {
            Ok(counters) => {
                tracing::info!("rate-limit counters backed by redis");
                Box::new(counters)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable; using in-process counters");
                Box::new(MemoryCounters::new())
            }
        },
        None => {
            tracing::info!("no REDIS_URL; using in-process rate-limit counters");
            Box::new(MemoryCounters::new())
        }
    };
    let limiter = Arc::new(RateLimiter::new(counters));

    let social: Option<Arc<dyn SocialApi>> = match &cfg.social_bearer_token {
        Some(token) => {
            let client = HttpSocialClient::new(
                cfg.social_api_base.clone(),
                token.clone(),
                Duration::from_secs(cfg.fetch_timeout_secs),
            )?;
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("no SOCIAL_BEARER_TOKEN; social sources will record an auth error");
            None
        }
    };

    let extractor = Extractor::new(&cfg, social)?;

    let (queue, rx) = MemoryQueue::new();
    let queue: Arc<dyn feedwatch::queue::JobQueue> = Arc::new(queue);

    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&store),
        extractor,
        Arc::clone(&limiter),
        Arc::clone(&queue),
        &cfg,
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&store),
        Arc::new(HttpPushSender::new()),
    ));

    let in_flight = InFlight::new();
    let limits = WorkerLimits {
        feed: cfg.feed_workers,
        api: cfg.api_workers,
        notify: cfg.notify_workers,
    };

    let workers = tokio::spawn(run_workers(
        pipeline,
        dispatcher,
        in_flight.clone(),
        rx,
        limits,
    ));
    let scheduler = tokio::spawn(run_scheduler(
        Arc::clone(&store),
        Arc::clone(&queue),
        in_flight,
        Duration::from_secs(cfg.tick_secs),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received; stopping");

    scheduler.abort();
    workers.abort();
    Ok(())
}
