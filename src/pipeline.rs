// src/pipeline.rs
// Per-source ingestion run: extract, filter through the dedup ledger, persist
// alerts and media, enqueue notification jobs, and record source health.
// Failures here are absorbed and written onto the source; they never stop
// other sources from being processed.

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, describe_counter, gauge};
use once_cell::sync::OnceCell;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dedup::DedupLedger;
use crate::error::{ExtractError, StoreError};
use crate::extract::Extractor;
use crate::model::{NewAlert, NewMedia, Source, SourceKind};
use crate::queue::{Job, JobQueue};
use crate::ratelimit::RateLimiter;
use crate::store::Store;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Ingestion runs started.");
        describe_counter!("ingest_new_alerts_total", "Alerts persisted across all runs.");
        describe_counter!(
            "ingest_source_errors_total",
            "Runs that ended with a recorded source error."
        );
        describe_counter!(
            "ingest_item_skips_total",
            "Candidate items skipped (dedup or per-item insert failure)."
        );
    });
}

#[derive(Debug, Default)]
pub struct IngestResult {
    pub new_alerts: usize,
    pub error: Option<String>,
}

pub struct Pipeline {
    store: Arc<dyn Store>,
    extractor: Extractor,
    limiter: Arc<RateLimiter>,
    queue: Arc<dyn JobQueue>,
    social_rate_limit: u64,
    social_rate_window_secs: u64,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        extractor: Extractor,
        limiter: Arc<RateLimiter>,
        queue: Arc<dyn JobQueue>,
        cfg: &AppConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            store,
            extractor,
            limiter,
            queue,
            social_rate_limit: cfg.social_rate_limit,
            social_rate_window_secs: cfg.social_rate_window_secs,
        }
    }

    pub async fn run(&self, source_id: Uuid) -> IngestResult {
        let source = match self.store.source(source_id).await {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(%source_id, error = %e, "source lookup failed; skipping run");
                return IngestResult::default();
            }
        };

        // Deactivation takes effect at scheduling time; a source that went
        // inactive before its job ran is skipped without touching its state.
        if !source.active {
            tracing::debug!(source = %source.name, "source inactive; skipping");
            return IngestResult::default();
        }

        counter!("ingest_runs_total").increment(1);
        tracing::info!(source = %source.name, kind = ?source.kind, "ingestion run started");

        if let Err(denied) = self.consume_provider_budget(&source).await {
            return self.record_failure(&source, denied.to_string()).await;
        }

        let extraction = match self.extractor.extract(&source).await {
            Ok(extraction) => extraction,
            Err(e) => return self.record_failure(&source, e.to_string()).await,
        };

        let mut ledger = match DedupLedger::load(&self.store, source.id).await {
            Ok(ledger) => ledger,
            Err(e) => {
                return self
                    .record_failure(&source, format!("ledger load: {e}"))
                    .await
            }
        };
        if ledger.is_empty() {
            tracing::debug!(source = %source.name, "no ingestion history; first run for this source");
        }

        let mut new_alerts = 0usize;
        for item in extraction.items {
            if !ledger.is_new(&item.external_id) {
                counter!("ingest_item_skips_total").increment(1);
                continue;
            }
            ledger.mark_seen(item.external_id.clone());

            let alert = match self
                .store
                .insert_alert(NewAlert {
                    source_id: source.id,
                    external_id: item.external_id.clone(),
                    content: item.content,
                    author_name: item.author_name,
                    author_handle: item.author_handle,
                    author_avatar: item.author_avatar,
                    permalink: item.permalink,
                    posted_at: item.posted_at,
                })
                .await
            {
                Ok(alert) => alert,
                Err(StoreError::DuplicateAlert) => {
                    // A concurrent cycle got there first; the constraint did
                    // its job.
                    tracing::debug!(external_id = %item.external_id, "duplicate absorbed by storage constraint");
                    counter!("ingest_item_skips_total").increment(1);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(external_id = %item.external_id, error = %e, "alert insert failed; item skipped");
                    counter!("ingest_item_skips_total").increment(1);
                    continue;
                }
            };

            // Media loss is non-fatal: the alert stands even if its rows
            // only partially land.
            if !item.media.is_empty() {
                let rows: Vec<NewMedia> = item
                    .media
                    .into_iter()
                    .map(|m| NewMedia {
                        alert_id: alert.id,
                        kind: m.kind,
                        original_url: m.url,
                        thumbnail: m.thumbnail,
                        width: m.width,
                        height: m.height,
                        duration_secs: m.duration_secs,
                    })
                    .collect();
                if let Err(e) = self.store.insert_media(rows).await {
                    tracing::warn!(alert_id = %alert.id, error = %e, "media insert failed; alert kept");
                }
            }

            // Fire-and-forget: the run's success does not depend on dispatch.
            if let Err(e) = self
                .queue
                .enqueue(Job::Notify {
                    alert_id: alert.id,
                    organization_id: source.organization_id,
                })
                .await
            {
                tracing::warn!(alert_id = %alert.id, error = %e, "notification enqueue failed");
            }

            new_alerts += 1;
        }

        if let Some(details) = extraction.details {
            if let Err(e) = self.store.update_source_details(source.id, details).await {
                tracing::warn!(source = %source.name, error = %e, "details update failed");
            }
        }

        if let Err(e) = self
            .store
            .update_source_check(source.id, Utc::now(), None)
            .await
        {
            tracing::warn!(source = %source.name, error = %e, "source check update failed");
        }

        counter!("ingest_new_alerts_total").increment(new_alerts as u64);
        gauge!("ingest_last_run_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(source = %source.name, new_alerts, known = ledger.len(), "ingestion run finished");

        IngestResult {
            new_alerts,
            error: None,
        }
    }

    /// Social sources draw from a per-organization provider budget before any
    /// API call is made. Denial is retryable; the next cycle is the retry.
    async fn consume_provider_budget(&self, source: &Source) -> Result<(), ExtractError> {
        if source.kind != SourceKind::SocialAccount {
            return Ok(());
        }
        let key = format!("social:posts:{}", source.organization_id);
        let decision = self
            .limiter
            .check_and_consume(&key, self.social_rate_limit, self.social_rate_window_secs)
            .await;
        if decision.allowed {
            Ok(())
        } else {
            Err(ExtractError::RateLimited {
                reset_at: decision.reset_at,
            })
        }
    }

    /// Record the failure on the source and leave it schedulable: the next
    /// cycle retries naturally, bounded by the check interval.
    async fn record_failure(&self, source: &Source, message: String) -> IngestResult {
        tracing::warn!(source = %source.name, error = %message, "ingestion run failed");
        counter!("ingest_source_errors_total").increment(1);

        if let Err(e) = self
            .store
            .update_source_check(source.id, Utc::now(), Some(message.clone()))
            .await
        {
            tracing::warn!(source = %source.name, error = %e, "failed to record source error");
        }

        IngestResult {
            new_alerts: 0,
            error: Some(message),
        }
    }
}
