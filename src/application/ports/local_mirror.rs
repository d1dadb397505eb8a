use crate::domain::entities::WriteOperation;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Local copy of remote data sufficient to serve writes while offline.
/// Present only in the embedded runtime; the hosted web context has none
/// and queues without a local data effect.
#[async_trait]
pub trait LocalMirror: Send + Sync {
    /// Applies the operation against the mirror and returns the data the
    /// caller would have received from the remote system.
    async fn apply(&self, op: &WriteOperation) -> Result<serde_json::Value, AppError>;
}
