use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
    All,
}

impl ChangeEvent {
    pub fn matches(&self, delivered: ChangeEvent) -> bool {
        *self == ChangeEvent::All || *self == delivered
    }
}

/// Row-level change notification, shaped identically in both hosting modes
/// so handlers never learn which transport delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePayload {
    pub resource: String,
    pub event: ChangeEvent,
    /// The filter expression the change matched, when the publisher
    /// evaluated one (e.g. `tenant_id=eq.grand-plaza`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub row: serde_json::Value,
}

pub type ChangeSink = Arc<dyn Fn(&ChangePayload) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Push-channel transport. The registry owns all subscription lifecycle;
/// `subscriber_count` exists so cleanup can be asserted.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn subscribe(
        &self,
        channel_name: &str,
        sink: ChangeSink,
    ) -> Result<SubscriptionId, AppError>;

    /// Unsubscribing an unknown id is a no-op.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), AppError>;

    fn subscriber_count(&self, channel_name: &str) -> usize;
}
