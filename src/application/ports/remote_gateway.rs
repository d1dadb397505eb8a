use crate::domain::value_objects::{ActionId, ActionKind, ActionPayload, TenantId};
use async_trait::async_trait;
use thiserror::Error;

/// Failure taxonomy of the remote system. Transient failures are queued or
/// retried; the rest surface immediately and are never enqueued.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote call timed out")]
    Timeout,

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Remote temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Remote rejected the payload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Timeout | RemoteError::Network(_) | RemoteError::Unavailable(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteWriteRequest {
    pub action_id: ActionId,
    pub tenant_id: TenantId,
    pub kind: ActionKind,
    pub payload: ActionPayload,
}

/// One remote operation per [`ActionKind`], used identically by the online
/// dispatch path and queued replay so the remote system cannot tell them
/// apart beyond the idempotency key.
///
/// Assumed contract: the remote side deduplicates by `action_id` and
/// answers a repeat delivery with a no-op success. The timeout-falls-back-
/// to-queue behavior of the dispatcher is only safe under that contract.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn execute(&self, request: RemoteWriteRequest)
        -> Result<serde_json::Value, RemoteError>;
}
