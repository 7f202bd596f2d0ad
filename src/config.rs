// src/config.rs
// All environment reads happen here, once, at process start. Components take
// what they need by value or reference; nothing reads the environment later.

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Scheduler poll cadence.
    pub tick_secs: u64,
    /// Bound on every outbound fetch (feeds, pages, provider API).
    pub fetch_timeout_secs: u64,
    /// Newest feed items considered per cycle.
    pub feed_items_cap: usize,
    /// Images kept per extracted item.
    pub page_images_cap: usize,
    /// Client identification header for feed/page fetches.
    pub user_agent: String,

    /// Shared counter store for rate-limit windows; in-process fallback when
    /// absent.
    pub redis_url: Option<String>,

    /// Provider API credentials/endpoints. Social sources are skipped when
    /// the token is missing.
    pub social_bearer_token: Option<String>,
    pub social_api_base: String,
    pub social_web_base: String,
    /// Provider calls allowed per window, per organization.
    pub social_rate_limit: u64,
    pub social_rate_window_secs: u64,

    /// Worker concurrency caps per job kind.
    pub feed_workers: usize,
    pub api_workers: usize,
    pub notify_workers: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            tick_secs: env_u64("SCHEDULER_TICK_SECS", 60),
            fetch_timeout_secs: env_u64("FETCH_TIMEOUT_SECS", 15),
            feed_items_cap: env_usize("FEED_ITEMS_CAP", 15),
            page_images_cap: env_usize("PAGE_IMAGES_CAP", 10),
            user_agent: env_opt("FETCH_USER_AGENT").unwrap_or_else(|| {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string()
            }),
            redis_url: env_opt("REDIS_URL"),
            social_bearer_token: env_opt("SOCIAL_BEARER_TOKEN"),
            social_api_base: env_opt("SOCIAL_API_BASE")
                .unwrap_or_else(|| "https://api.twitter.com".to_string()),
            social_web_base: env_opt("SOCIAL_WEB_BASE")
                .unwrap_or_else(|| "https://twitter.com".to_string()),
            social_rate_limit: env_u64("SOCIAL_RATE_LIMIT", 450),
            social_rate_window_secs: env_u64("SOCIAL_RATE_WINDOW_SECS", 900),
            feed_workers: env_usize("FEED_WORKERS", 5),
            api_workers: env_usize("API_WORKERS", 2),
            notify_workers: env_usize("NOTIFY_WORKERS", 10),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Defaults only; does not consult the environment.
        Self {
            tick_secs: 60,
            fetch_timeout_secs: 15,
            feed_items_cap: 15,
            page_images_cap: 10,
            user_agent: "feedwatch/0.1".to_string(),
            redis_url: None,
            social_bearer_token: None,
            social_api_base: "https://api.twitter.com".to_string(),
            social_web_base: "https://twitter.com".to_string(),
            social_rate_limit: 450,
            social_rate_window_secs: 900,
            feed_workers: 5,
            api_workers: 2,
            notify_workers: 10,
        }
    }
}
