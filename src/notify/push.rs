// src/notify/push.rs
// Push delivery boundary: one send primitive per subscription, with
// "subscription gone" as a distinguishable outcome.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::model::PushSubscription;

#[derive(Debug, Error)]
pub enum PushError {
    /// The delivery provider reports the subscription permanently gone; the
    /// caller should delete it.
    #[error("subscription gone")]
    Gone,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PushAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushData {
    #[serde(rename = "alertId")]
    pub alert_id: Uuid,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub data: PushData,
    pub actions: Vec<PushAction>,
}

impl PushPayload {
    pub fn new_alert(source_name: &str, content: &str, alert_id: Uuid) -> Self {
        Self {
            title: format!("New alert - {source_name}"),
            body: truncate(content, 100),
            icon: "/icons/icon-192x192.png".to_string(),
            badge: "/icons/badge-72x72.png".to_string(),
            tag: format!("alert-{alert_id}"),
            data: PushData {
                alert_id,
                url: format!("/feed?highlight={alert_id}"),
            },
            actions: vec![
                PushAction {
                    action: "view".to_string(),
                    title: "View".to_string(),
                },
                PushAction {
                    action: "dismiss".to_string(),
                    title: "Dismiss".to_string(),
                },
            ],
        }
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError>;
}

pub struct HttpPushSender {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPushSender {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

impl Default for HttpPushSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError> {
        let response = self
            .client
            .post(&subscription.endpoint)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| PushError::Delivery(format!("push request: {e}")))?;

        let status = response.status();
        match status.as_u16() {
            404 | 410 => Err(PushError::Gone),
            _ if status.is_success() => Ok(()),
            code => Err(PushError::Delivery(format!("push endpoint HTTP {code}"))),
        }
    }
}
