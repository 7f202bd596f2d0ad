// src/store/mod.rs
// Persistence capability boundary. The core only needs atomic single-row
// inserts, the (source_id, external_id) uniqueness constraint on alerts, and
// simple equality queries; anything implementing `Store` can back it.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Alert, NewAlert, NewMedia, PushSubscription, Source, SourceDetails};

pub use memory::MemoryStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn active_sources(&self) -> Result<Vec<Source>, StoreError>;

    async fn source(&self, id: Uuid) -> Result<Source, StoreError>;

    /// Called after every check attempt, success or failure.
    async fn update_source_check(
        &self,
        id: Uuid,
        checked_at: DateTime<Utc>,
        last_error: Option<String>,
    ) -> Result<(), StoreError>;

    async fn update_source_details(
        &self,
        id: Uuid,
        details: SourceDetails,
    ) -> Result<(), StoreError>;

    /// Inserting a duplicate (source_id, external_id) pair must fail with
    /// `StoreError::DuplicateAlert`, never silently overwrite.
    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    async fn alert(&self, id: Uuid) -> Result<Alert, StoreError>;

    /// Dedup ledger snapshot: every external id already ingested for the
    /// source. Loaded once per ingestion run, not per item.
    async fn external_ids_for_source(&self, source_id: Uuid) -> Result<HashSet<String>, StoreError>;

    /// Best effort, row by row; returns how many rows were written.
    async fn insert_media(&self, rows: Vec<NewMedia>) -> Result<usize, StoreError>;

    /// Subscriptions joined through profiles to the organization.
    async fn subscriptions_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<PushSubscription>, StoreError>;

    async fn delete_subscription(&self, id: Uuid) -> Result<(), StoreError>;
}
