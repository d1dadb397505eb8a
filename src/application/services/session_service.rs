use crate::application::ports::session_store::SessionStore;
use crate::domain::entities::TenantSession;
use crate::domain::value_objects::{StaffRole, TenantId};
use crate::shared::error::AppError;
use chrono::Utc;
use std::sync::{Arc, Mutex, RwLock};

pub type SessionListener = Arc<dyn Fn(Option<&TenantSession>) + Send + Sync>;

/// Handle returned by [`SessionService::subscribe`]; pass it back to
/// `unsubscribe` to stop receiving notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSubscription {
    id: u64,
}

/// Single source of truth for the active tenant/user/role binding on this
/// device. Only this service mutates session state; every other component
/// reads it and treats "no valid session" as a disabled state.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<TenantSession>>,
    listeners: Mutex<Vec<(u64, SessionListener)>>,
    next_listener_id: Mutex<u64>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: Mutex::new(0),
        }
    }

    /// Restores a previously persisted session if it is still valid.
    ///
    /// An expired or corrupted persisted session fails closed: the stale
    /// row is cleared, the caller gets `None`, and no error escapes.
    pub async fn restore(&self) -> Option<TenantSession> {
        let loaded = match self.store.load().await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(
                    target: "session",
                    error = %err,
                    "failed to load persisted session; treating as signed out"
                );
                None
            }
        };

        let restored = match loaded {
            Some(session) if session.is_valid_at(Utc::now()) => Some(session),
            Some(expired) => {
                tracing::info!(
                    target: "session",
                    tenant = %expired.tenant_id,
                    "persisted session expired; clearing"
                );
                if let Err(err) = self.store.clear().await {
                    tracing::warn!(target: "session", error = %err, "failed to clear stale session");
                }
                None
            }
            None => None,
        };

        self.set_current(restored.clone());
        restored
    }

    /// Persists and caches a new session (local sign-in).
    pub async fn begin(&self, session: TenantSession) -> Result<(), AppError> {
        self.store.save(&session).await?;
        tracing::info!(
            target: "session",
            tenant = %session.tenant_id,
            user = %session.user_id,
            role = %session.role,
            "session started"
        );
        self.set_current(Some(session));
        Ok(())
    }

    /// Clears the persisted and cached session (sign-out).
    pub async fn end(&self) -> Result<(), AppError> {
        self.store.clear().await?;
        self.set_current(None);
        Ok(())
    }

    pub fn subscribe(&self, listener: SessionListener) -> SessionSubscription {
        let mut next_id = self.next_listener_id.lock().unwrap();
        let id = *next_id;
        *next_id += 1;
        drop(next_id);

        self.listeners.lock().unwrap().push((id, listener));
        SessionSubscription { id }
    }

    /// No-op if the subscription was already removed.
    pub fn unsubscribe(&self, subscription: &SessionSubscription) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|(id, _)| *id != subscription.id);
    }

    pub fn current(&self) -> Option<TenantSession> {
        self.current.read().unwrap().clone()
    }

    pub fn is_session_valid(&self) -> bool {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.is_valid_at(Utc::now()))
            .unwrap_or(false)
    }

    pub fn has_role(&self, role: &StaffRole) -> bool {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.has_role(role))
            .unwrap_or(false)
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.tenant_id.clone())
    }

    /// The tenant of the current valid session, or `None` when components
    /// should run disabled.
    pub fn active_tenant(&self) -> Option<TenantId> {
        let guard = self.current.read().unwrap();
        guard
            .as_ref()
            .filter(|s| s.is_valid_at(Utc::now()))
            .map(|s| s.tenant_id.clone())
    }

    fn set_current(&self, session: Option<TenantSession>) {
        *self.current.write().unwrap() = session;
        self.notify();
    }

    fn notify(&self) {
        let listeners: Vec<SessionListener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        // Clone out of the lock: a listener may re-enter a mutating path.
        let current = self.current.read().unwrap().clone();
        for listener in listeners {
            listener(current.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct InMemorySessionStore {
        session: Mutex<Option<TenantSession>>,
        fail_load: bool,
    }

    #[async_trait]
    impl SessionStore for InMemorySessionStore {
        async fn load(&self) -> Result<Option<TenantSession>, AppError> {
            if self.fail_load {
                return Err(AppError::Storage("corrupted session row".into()));
            }
            Ok(self.session.lock().unwrap().clone())
        }

        async fn save(&self, session: &TenantSession) -> Result<(), AppError> {
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<(), AppError> {
            *self.session.lock().unwrap() = None;
            Ok(())
        }
    }

    fn session_expiring_in(minutes: i64) -> TenantSession {
        let now = Utc::now();
        TenantSession::new(
            TenantId::new("grand-plaza".into()).unwrap(),
            "staff-7".into(),
            StaffRole::FrontDesk,
            now,
            now + Duration::minutes(minutes),
        )
    }

    #[tokio::test]
    async fn restore_returns_valid_persisted_session() {
        let store = Arc::new(InMemorySessionStore::default());
        *store.session.lock().unwrap() = Some(session_expiring_in(30));

        let service = SessionService::new(store);
        let restored = service.restore().await;

        assert!(restored.is_some());
        assert!(service.is_session_valid());
        assert_eq!(
            service.tenant_id().map(|t| t.as_str().to_string()),
            Some("grand-plaza".to_string())
        );
    }

    #[tokio::test]
    async fn restore_clears_expired_session() {
        let store = Arc::new(InMemorySessionStore::default());
        *store.session.lock().unwrap() = Some(session_expiring_in(-5));

        let service = SessionService::new(store.clone());
        assert!(service.restore().await.is_none());
        assert!(!service.is_session_valid());
        assert!(store.session.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_fails_closed_on_storage_error() {
        let store = Arc::new(InMemorySessionStore {
            fail_load: true,
            ..Default::default()
        });

        let service = SessionService::new(store);
        assert!(service.restore().await.is_none());
        assert!(!service.is_session_valid());
    }

    #[tokio::test]
    async fn subscribers_are_notified_and_unsubscribed() {
        let store = Arc::new(InMemorySessionStore::default());
        let service = SessionService::new(store);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscription = service.subscribe(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        service.begin(session_expiring_in(30)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        service.unsubscribe(&subscription);
        service.end().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn listeners_run_with_the_session_lock_released() {
        let store = Arc::new(InMemorySessionStore::default());
        let service = Arc::new(SessionService::new(store));

        let checked = Arc::new(AtomicUsize::new(0));
        let counter = checked.clone();
        let svc = service.clone();
        service.subscribe(Arc::new(move |_| {
            // A listener re-entering a mutating path needs the write lock;
            // it must not still be blocked by the notifying reader.
            assert!(svc.current.try_write().is_ok());
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        service.begin(session_expiring_in(30)).await.unwrap();
        service.end().await.unwrap();
        assert_eq!(checked.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn has_role_checks_cached_role() {
        let store = Arc::new(InMemorySessionStore::default());
        let service = SessionService::new(store);
        service.begin(session_expiring_in(30)).await.unwrap();

        assert!(service.has_role(&StaffRole::FrontDesk));
        assert!(!service.has_role(&StaffRole::Manager));
    }
}
