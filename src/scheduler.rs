// src/scheduler.rs
// Decides which sources are due and enqueues their fetch jobs. Per-source
// execution is serialized through the shared in-flight set: a source whose
// previous run has not finished is skipped for this tick.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Source, SourceKind};
use crate::queue::{Job, JobQueue};
use crate::store::Store;

/// A source is due when it has never been checked or its interval has fully
/// elapsed. Inactive sources are filtered out before this is consulted.
pub fn is_due(source: &Source, now: DateTime<Utc>) -> bool {
    match source.last_checked_at {
        None => true,
        Some(last) => {
            let interval = chrono::Duration::seconds(source.check_interval_secs.max(1) as i64);
            now >= last + interval
        }
    }
}

/// Sources with a run in flight. Marked by the scheduler before enqueue,
/// released by the worker when the run completes (success or failure).
#[derive(Clone, Default)]
pub struct InFlight {
    running: Arc<Mutex<HashSet<Uuid>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the source already has a run in flight.
    pub fn try_begin(&self, source_id: Uuid) -> bool {
        self.running
            .lock()
            .expect("in-flight lock poisoned")
            .insert(source_id)
    }

    pub fn finish(&self, source_id: Uuid) {
        self.running
            .lock()
            .expect("in-flight lock poisoned")
            .remove(&source_id);
    }

    /// Guard variant of `finish`: the entry is released when the guard drops,
    /// which covers a panicking job as well as a returning one.
    pub fn release_on_drop(&self, source_id: Uuid) -> InFlightGuard {
        InFlightGuard {
            running: Arc::clone(&self.running),
            source_id,
        }
    }
}

#[must_use = "dropping the guard releases the in-flight entry"]
pub struct InFlightGuard {
    running: Arc<Mutex<HashSet<Uuid>>>,
    source_id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // No expect here: drop may run during unwinding.
        if let Ok(mut running) = self.running.lock() {
            running.remove(&self.source_id);
        }
    }
}

fn job_for(source: &Source) -> Job {
    match source.kind {
        SourceKind::Feed | SourceKind::Website => Job::FeedFetch {
            source_id: source.id,
        },
        SourceKind::SocialAccount => Job::ApiFetch {
            source_id: source.id,
        },
    }
}

/// One scheduling pass: evaluate all active sources and enqueue the due ones
/// that are not already running. Returns how many jobs were enqueued.
pub async fn schedule_due_sources(
    store: &Arc<dyn Store>,
    queue: &Arc<dyn JobQueue>,
    in_flight: &InFlight,
    now: DateTime<Utc>,
) -> usize {
    let sources = match store.active_sources().await {
        Ok(sources) => sources,
        Err(e) => {
            tracing::warn!(error = %e, "scheduler could not list sources");
            return 0;
        }
    };

    let mut enqueued = 0;
    for source in sources {
        if !is_due(&source, now) {
            continue;
        }
        if !in_flight.try_begin(source.id) {
            tracing::debug!(source = %source.name, "previous run still in flight; skipping tick");
            continue;
        }
        if let Err(e) = queue.enqueue(job_for(&source)).await {
            in_flight.finish(source.id);
            tracing::warn!(source = %source.name, error = %e, "enqueue failed");
            continue;
        }
        enqueued += 1;
    }
    enqueued
}

/// Scheduler loop: fixed cadence, skipping missed ticks rather than bursting.
pub async fn run_scheduler(
    store: Arc<dyn Store>,
    queue: Arc<dyn JobQueue>,
    in_flight: InFlight,
    tick: Duration,
) {
    let mut timer = tokio::time::interval(tick);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        let enqueued = schedule_due_sources(&store, &queue, &in_flight, Utc::now()).await;
        if enqueued > 0 {
            tracing::info!(enqueued, "scheduling tick dispatched jobs");
        } else {
            tracing::trace!("scheduling tick: nothing due");
        }
    }
}
