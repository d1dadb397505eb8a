use crate::domain::entities::TenantSession;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Persistence of the single local session. `save` replaces any previous
/// row; a corrupted row surfaces as an error and is treated by the session
/// manager as "no session".
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<TenantSession>, AppError>;
    async fn save(&self, session: &TenantSession) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}
