// src/worker.rs
// Job consumer loop. Each job kind runs under its own concurrency cap so a
// burst of feed fetches cannot starve notification dispatch, and the
// provider API never sees more than a couple of concurrent calls.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::notify::Dispatcher;
use crate::pipeline::Pipeline;
use crate::queue::Job;
use crate::scheduler::InFlight;

#[derive(Debug, Clone, Copy)]
pub struct WorkerLimits {
    pub feed: usize,
    pub api: usize,
    pub notify: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            feed: 5,
            api: 2,
            notify: 10,
        }
    }
}

/// Consume jobs until the queue side is dropped. Every job is spawned
/// immediately and waits for its kind's permit inside its own task, so a
/// saturated pool delays only jobs of that kind, never the jobs queued behind
/// them. Job failures are logged and absorbed; a bad job must never take the
/// loop down.
pub async fn run_workers(
    pipeline: Arc<Pipeline>,
    dispatcher: Arc<Dispatcher>,
    in_flight: InFlight,
    mut rx: mpsc::UnboundedReceiver<Job>,
    limits: WorkerLimits,
) {
    let feed_slots = Arc::new(Semaphore::new(limits.feed.max(1)));
    let api_slots = Arc::new(Semaphore::new(limits.api.max(1)));
    let notify_slots = Arc::new(Semaphore::new(limits.notify.max(1)));

    tracing::info!(
        feed = limits.feed,
        api = limits.api,
        notify = limits.notify,
        "worker loop started"
    );

    while let Some(job) = rx.recv().await {
        let slots = match &job {
            Job::FeedFetch { .. } => Arc::clone(&feed_slots),
            Job::ApiFetch { .. } => Arc::clone(&api_slots),
            Job::Notify { .. } => Arc::clone(&notify_slots),
        };

        let pipeline = Arc::clone(&pipeline);
        let dispatcher = Arc::clone(&dispatcher);
        let in_flight = in_flight.clone();

        tokio::spawn(async move {
            let Ok(_permit) = slots.acquire_owned().await else {
                return; // semaphore closed; shutting down
            };
            match job {
                Job::FeedFetch { source_id } | Job::ApiFetch { source_id } => {
                    // Released when the task ends, panics included; a stuck
                    // in-flight entry would bar the source from scheduling
                    // forever.
                    let _running = in_flight.release_on_drop(source_id);
                    let result = pipeline.run(source_id).await;
                    if let Some(error) = result.error {
                        tracing::debug!(%source_id, error, "ingestion job ended with source error");
                    }
                }
                Job::Notify {
                    alert_id,
                    organization_id,
                } => {
                    let outcome = dispatcher.dispatch(alert_id, organization_id).await;
                    tracing::debug!(
                        %alert_id,
                        succeeded = outcome.succeeded,
                        failed = outcome.failed,
                        removed = outcome.removed,
                        "notification job finished"
                    );
                }
            }
        });
    }

    tracing::info!("worker loop stopped");
}
