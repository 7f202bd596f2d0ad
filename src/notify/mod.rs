// src/notify/mod.rs
// Notification fan-out for new alerts. Every subscription is pushed to
// independently and concurrently; one endpoint's failure never blocks the
// rest, and the dispatcher never raises past its caller.

pub mod push;

use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use uuid::Uuid;

use crate::model::PushSubscription;
use crate::notify::push::{PushError, PushPayload, PushSender};
use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchResult {
    pub succeeded: usize,
    pub failed: usize,
    /// Subscriptions the provider reported gone; deleted as a side effect.
    pub removed: usize,
}

pub struct Dispatcher {
    store: Arc<dyn Store>,
    sender: Arc<dyn PushSender>,
}

enum SendOutcome {
    Delivered,
    Gone(Uuid),
    Failed,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, sender: Arc<dyn PushSender>) -> Self {
        Self { store, sender }
    }

    pub async fn dispatch(&self, alert_id: Uuid, organization_id: Uuid) -> DispatchResult {
        let alert = match self.store.alert(alert_id).await {
            Ok(alert) => alert,
            Err(e) => {
                tracing::warn!(%alert_id, error = %e, "alert not found for dispatch");
                return DispatchResult::default();
            }
        };

        let source_name = match self.store.source(alert.source_id).await {
            Ok(source) => source.name,
            Err(_) => alert.author_name.clone(),
        };

        let subscriptions = match self
            .store
            .subscriptions_for_organization(organization_id)
            .await
        {
            Ok(subs) => subs,
            Err(e) => {
                tracing::warn!(%organization_id, error = %e, "subscription lookup failed");
                return DispatchResult::default();
            }
        };
        if subscriptions.is_empty() {
            tracing::debug!(%organization_id, "no push subscriptions; nothing to dispatch");
            return DispatchResult::default();
        }

        let payload = PushPayload::new_alert(&source_name, &alert.content, alert.id);

        let sends = subscriptions.iter().map(|sub| self.send_one(sub, &payload));
        let outcomes = join_all(sends).await;

        let mut result = DispatchResult::default();
        for outcome in outcomes {
            match outcome {
                SendOutcome::Delivered => result.succeeded += 1,
                SendOutcome::Gone(sub_id) => {
                    if let Err(e) = self.store.delete_subscription(sub_id).await {
                        tracing::warn!(subscription = %sub_id, error = %e, "failed to delete gone subscription");
                    }
                    result.removed += 1;
                }
                SendOutcome::Failed => result.failed += 1,
            }
        }

        counter!("notify_sent_total").increment(result.succeeded as u64);
        counter!("notify_failed_total").increment(result.failed as u64);
        counter!("notify_pruned_total").increment(result.removed as u64);
        tracing::info!(
            %alert_id,
            succeeded = result.succeeded,
            failed = result.failed,
            removed = result.removed,
            "dispatch complete"
        );

        result
    }

    async fn send_one(&self, subscription: &PushSubscription, payload: &PushPayload) -> SendOutcome {
        match self.sender.send(subscription, payload).await {
            Ok(()) => SendOutcome::Delivered,
            Err(PushError::Gone) => {
                tracing::info!(subscription = %subscription.id, "subscription gone; pruning");
                SendOutcome::Gone(subscription.id)
            }
            Err(e) => {
                // Left intact; the next dispatch attempt may succeed.
                tracing::warn!(subscription = %subscription.id, error = %e, "push delivery failed");
                SendOutcome::Failed
            }
        }
    }
}
