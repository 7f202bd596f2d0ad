// src/ratelimit.rs
// Fixed-window rate limiting over a pluggable counter store. The window is
// floor(now / window_secs); a counter per (key, window) is incremented
// atomically and compared to the limit. A shared redis backend keeps the
// budget global across workers; the in-process fallback has identical
// semantics for single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Windowed counter capability. `incr_window` must be atomic at the backend
/// and return the post-increment count; the counter expires `ttl_secs` after
/// its first increment.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr_window(&self, bucket: &str, ttl_secs: i64) -> anyhow::Result<u64>;
}

pub struct RedisCounters {
    client: redis::Client,
}

impl RedisCounters {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounters {
    async fn incr_window(&self, bucket: &str, ttl_secs: i64) -> anyhow::Result<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let count: u64 = conn.incr(bucket, 1u64).await?;
        if count == 1 {
            let _: bool = conn.expire(bucket, ttl_secs).await?;
        }
        Ok(count)
    }
}

#[derive(Default)]
pub struct MemoryCounters {
    counters: Mutex<HashMap<String, (u64, i64)>>,
}

impl MemoryCounters {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounters {
    async fn incr_window(&self, bucket: &str, ttl_secs: i64) -> anyhow::Result<u64> {
        let now = Utc::now().timestamp();
        let mut counters = self.counters.lock().await;
        counters.retain(|_, (_, expiry)| *expiry > now);
        let entry = counters
            .entry(bucket.to_string())
            .or_insert((0, now + ttl_secs));
        entry.0 += 1;
        Ok(entry.0)
    }
}

pub struct RateLimiter {
    counters: Box<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(counters: Box<dyn CounterStore>) -> Self {
        Self { counters }
    }

    pub async fn check_and_consume(
        &self,
        key: &str,
        limit: u64,
        window_secs: u64,
    ) -> RateDecision {
        self.check_and_consume_at(key, limit, window_secs, Utc::now().timestamp())
            .await
    }

    /// Explicit-clock variant; the public entry point passes the wall clock.
    pub async fn check_and_consume_at(
        &self,
        key: &str,
        limit: u64,
        window_secs: u64,
        now_unix: i64,
    ) -> RateDecision {
        let window_secs = window_secs.max(1) as i64;
        let window = now_unix.div_euclid(window_secs);
        let reset_unix = (window + 1) * window_secs;
        let reset_at = DateTime::<Utc>::from_timestamp(reset_unix, 0).unwrap_or_else(Utc::now);
        let bucket = format!("rate:{key}:{window}");

        match self.counters.incr_window(&bucket, window_secs).await {
            Ok(count) => RateDecision {
                allowed: count <= limit,
                remaining: limit.saturating_sub(count),
                reset_at,
            },
            Err(e) => {
                // Counter store unreachable: let the call through rather than
                // stall every source behind a broken backend.
                tracing::warn!(key, error = %e, "rate-limit counter store failed; allowing");
                RateDecision {
                    allowed: true,
                    remaining: 0,
                    reset_at,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limit_plus_one_is_denied_within_window() {
        let limiter = RateLimiter::new(Box::new(MemoryCounters::new()));
        let now = 1_700_000_000;
        for i in 0..5 {
            let d = limiter.check_and_consume_at("k", 5, 60, now + i).await;
            assert!(d.allowed, "call {i} should be allowed");
        }
        let denied = limiter.check_and_consume_at("k", 5, 60, now + 5).await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }

    #[tokio::test]
    async fn next_window_resets_the_budget() {
        let limiter = RateLimiter::new(Box::new(MemoryCounters::new()));
        let now = 1_700_000_000;
        let window_secs = 60;
        for _ in 0..6 {
            limiter.check_and_consume_at("k", 5, window_secs, now).await;
        }
        let denied = limiter.check_and_consume_at("k", 5, window_secs, now).await;
        assert!(!denied.allowed);

        let after_reset = denied.reset_at.timestamp();
        let allowed = limiter
            .check_and_consume_at("k", 5, window_secs, after_reset)
            .await;
        assert!(allowed.allowed);
    }

    #[tokio::test]
    async fn reset_at_is_the_window_boundary() {
        let limiter = RateLimiter::new(Box::new(MemoryCounters::new()));
        let now = 1_700_000_030; // 30s into a 60s window
        let d = limiter.check_and_consume_at("k", 5, 60, now).await;
        assert_eq!(d.reset_at.timestamp(), 1_700_000_040);
    }

    #[tokio::test]
    async fn keys_do_not_share_budgets() {
        let limiter = RateLimiter::new(Box::new(MemoryCounters::new()));
        let now = 1_700_000_000;
        for _ in 0..3 {
            limiter.check_and_consume_at("a", 2, 60, now).await;
        }
        let other = limiter.check_and_consume_at("b", 2, 60, now).await;
        assert!(other.allowed);
    }
}
