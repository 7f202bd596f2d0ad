// src/store/memory.rs
// In-memory store used by single-process deployments and tests. Enforces the
// same (source_id, external_id) uniqueness a relational backend would.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    Alert, AlertStatus, Media, NewAlert, NewMedia, Profile, PushSubscription, Source, SourceDetails,
};
use crate::store::Store;

#[derive(Default)]
struct Inner {
    sources: HashMap<Uuid, Source>,
    alerts: HashMap<Uuid, Alert>,
    /// Uniqueness index over (source_id, external_id).
    alert_keys: HashSet<(Uuid, String)>,
    media: HashMap<Uuid, Media>,
    subscriptions: HashMap<Uuid, PushSubscription>,
    profiles: HashMap<Uuid, Profile>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_source(&self, source: Source) {
        let mut inner = self.inner.write().await;
        inner.sources.insert(source.id, source);
    }

    pub async fn insert_profile(&self, profile: Profile) {
        let mut inner = self.inner.write().await;
        inner.profiles.insert(profile.id, profile);
    }

    pub async fn insert_subscription(&self, sub: PushSubscription) {
        let mut inner = self.inner.write().await;
        inner.subscriptions.insert(sub.id, sub);
    }

    pub async fn alerts_for_source(&self, source_id: Uuid) -> Vec<Alert> {
        let inner = self.inner.read().await;
        let mut alerts: Vec<Alert> = inner
            .alerts
            .values()
            .filter(|a| a.source_id == source_id)
            .cloned()
            .collect();
        alerts.sort_by_key(|a| a.detected_at);
        alerts
    }

    pub async fn media_for_alert(&self, alert_id: Uuid) -> Vec<Media> {
        let inner = self.inner.read().await;
        inner
            .media
            .values()
            .filter(|m| m.alert_id == alert_id)
            .cloned()
            .collect()
    }

    pub async fn subscription_count(&self) -> usize {
        self.inner.read().await.subscriptions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn active_sources(&self) -> Result<Vec<Source>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sources
            .values()
            .filter(|s| s.active)
            .cloned()
            .collect())
    }

    async fn source(&self, id: Uuid) -> Result<Source, StoreError> {
        let inner = self.inner.read().await;
        inner
            .sources
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("source"))
    }

    async fn update_source_check(
        &self,
        id: Uuid,
        checked_at: DateTime<Utc>,
        last_error: Option<String>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let source = inner
            .sources
            .get_mut(&id)
            .ok_or(StoreError::NotFound("source"))?;
        source.last_checked_at = Some(checked_at);
        source.last_error = last_error;
        Ok(())
    }

    async fn update_source_details(
        &self,
        id: Uuid,
        details: SourceDetails,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let source = inner
            .sources
            .get_mut(&id)
            .ok_or(StoreError::NotFound("source"))?;
        source.details = details;
        Ok(())
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let mut inner = self.inner.write().await;
        let key = (alert.source_id, alert.external_id.clone());
        if !inner.alert_keys.insert(key) {
            return Err(StoreError::DuplicateAlert);
        }
        let row = Alert {
            id: Uuid::new_v4(),
            source_id: alert.source_id,
            external_id: alert.external_id,
            content: alert.content,
            author_name: alert.author_name,
            author_handle: alert.author_handle,
            author_avatar: alert.author_avatar,
            permalink: alert.permalink,
            status: AlertStatus::New,
            is_read: false,
            is_pinned: false,
            detected_at: Utc::now(),
            posted_at: alert.posted_at,
        };
        inner.alerts.insert(row.id, row.clone());
        Ok(row)
    }

    async fn alert(&self, id: Uuid) -> Result<Alert, StoreError> {
        let inner = self.inner.read().await;
        inner
            .alerts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("alert"))
    }

    async fn external_ids_for_source(
        &self,
        source_id: Uuid,
    ) -> Result<HashSet<String>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .alert_keys
            .iter()
            .filter(|(sid, _)| *sid == source_id)
            .map(|(_, eid)| eid.clone())
            .collect())
    }

    async fn insert_media(&self, rows: Vec<NewMedia>) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let mut written = 0;
        for row in rows {
            let media = Media {
                id: Uuid::new_v4(),
                alert_id: row.alert_id,
                kind: row.kind,
                original_url: row.original_url,
                thumbnail: row.thumbnail,
                width: row.width,
                height: row.height,
                duration_secs: row.duration_secs,
            };
            inner.media.insert(media.id, media);
            written += 1;
        }
        Ok(written)
    }

    async fn subscriptions_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<PushSubscription>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .values()
            .filter(|sub| {
                inner
                    .profiles
                    .get(&sub.profile_id)
                    .is_some_and(|p| p.organization_id == organization_id)
            })
            .cloned()
            .collect())
    }

    async fn delete_subscription(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.subscriptions.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PushKeys, SourceKind};

    fn sample_source() -> Source {
        Source {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Example".into(),
            kind: SourceKind::Feed,
            locator: "https://example.com/feed.xml".into(),
            active: true,
            check_interval_secs: 300,
            last_checked_at: None,
            last_error: None,
            details: SourceDetails::Feed,
        }
    }

    #[tokio::test]
    async fn duplicate_alert_key_is_rejected() {
        let store = MemoryStore::new();
        let source = sample_source();
        let new = NewAlert {
            source_id: source.id,
            external_id: "guid-1".into(),
            content: "hello".into(),
            author_name: "Example".into(),
            author_handle: "example.com".into(),
            author_avatar: None,
            permalink: "https://example.com/1".into(),
            posted_at: Utc::now(),
        };
        store.insert_source(source).await;
        store.insert_alert(new.clone()).await.unwrap();
        let err = store.insert_alert(new).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateAlert));
    }

    #[tokio::test]
    async fn subscriptions_resolve_through_profile_membership() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let other_org = Uuid::new_v4();

        let member = Profile {
            id: Uuid::new_v4(),
            organization_id: org,
        };
        let outsider = Profile {
            id: Uuid::new_v4(),
            organization_id: other_org,
        };
        store.insert_profile(member.clone()).await;
        store.insert_profile(outsider.clone()).await;

        for profile in [&member, &outsider] {
            store
                .insert_subscription(PushSubscription {
                    id: Uuid::new_v4(),
                    profile_id: profile.id,
                    endpoint: "https://push.example/ep".into(),
                    keys: PushKeys {
                        p256dh: "pk".into(),
                        auth: "a".into(),
                    },
                })
                .await;
        }

        let subs = store.subscriptions_for_organization(org).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].profile_id, member.id);
    }
}
