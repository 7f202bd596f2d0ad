// src/queue.rs
// Job kinds and the queue capability boundary. The in-process queue is a
// plain channel; a durable broker can stand behind the same trait with
// at-least-once delivery, since the dedup ledger and the storage uniqueness
// constraint absorb duplicate deliveries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    FeedFetch { source_id: Uuid },
    ApiFetch { source_id: Uuid },
    Notify { alert_id: Uuid, organization_id: Uuid },
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: Job) -> anyhow::Result<()>;
}

pub struct MemoryQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl MemoryQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: Job) -> anyhow::Result<()> {
        self.tx
            .send(job)
            .map_err(|_| anyhow::anyhow!("job queue receiver dropped"))
    }
}
