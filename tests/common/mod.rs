#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;

use innkeep_sync::application::ports::remote_gateway::{
    RemoteError, RemoteGateway, RemoteWriteRequest,
};
use innkeep_sync::domain::entities::{TenantSession, WriteOperation};
use innkeep_sync::domain::value_objects::{
    ActionId, ActionKind, ActionPayload, StaffRole, TenantId,
};
use innkeep_sync::infrastructure::connectivity::ConnectivityMonitor;
use innkeep_sync::shared::config::AppConfig;
use innkeep_sync::{SyncContext, SyncContextBuilder};

/// Remote fake that records every accepted write, de-duplicates on the
/// idempotency key, and can be told to fail or delay specific actions.
pub struct RecordingRemote {
    inner: Mutex<RemoteState>,
}

struct RemoteState {
    applied: Vec<RemoteWriteRequest>,
    seen: HashSet<String>,
    deliveries: HashMap<String, usize>,
    fail_transient: HashSet<String>,
    reject: HashSet<String>,
    delays: Vec<(String, Duration)>,
}

impl RecordingRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(RemoteState {
                applied: Vec::new(),
                seen: HashSet::new(),
                deliveries: HashMap::new(),
                fail_transient: HashSet::new(),
                reject: HashSet::new(),
                delays: Vec::new(),
            }),
        })
    }

    /// The next delivery of `action_id` fails with a transient error.
    pub fn fail_once(&self, action_id: &ActionId) {
        self.inner
            .lock()
            .unwrap()
            .fail_transient
            .insert(action_id.as_str().to_string());
    }

    /// Every delivery of `action_id` is rejected as invalid.
    pub fn reject(&self, action_id: &ActionId) {
        self.inner
            .lock()
            .unwrap()
            .reject
            .insert(action_id.as_str().to_string());
    }

    pub fn delay(&self, action_id: &ActionId, delay: Duration) {
        self.inner
            .lock()
            .unwrap()
            .delays
            .push((action_id.as_str().to_string(), delay));
    }

    /// Action ids applied exactly once, in arrival order.
    pub fn applied_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .applied
            .iter()
            .map(|r| r.action_id.as_str().to_string())
            .collect()
    }

    pub fn applied_count(&self) -> usize {
        self.inner.lock().unwrap().applied.len()
    }

    /// Total deliveries attempted for `action_id`, successful or not.
    pub fn attempts(&self, action_id: &ActionId) -> usize {
        self.inner
            .lock()
            .unwrap()
            .deliveries
            .get(action_id.as_str())
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl RemoteGateway for RecordingRemote {
    async fn execute(
        &self,
        request: RemoteWriteRequest,
    ) -> Result<serde_json::Value, RemoteError> {
        let key = request.action_id.as_str().to_string();

        let delay = {
            let state = self.inner.lock().unwrap();
            state
                .delays
                .iter()
                .find(|(id, _)| id == &key)
                .map(|(_, d)| *d)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.lock().unwrap();
        *state.deliveries.entry(key.clone()).or_insert(0) += 1;
        if state.reject.contains(&key) {
            return Err(RemoteError::Rejected {
                status: 422,
                message: "validation failed".to_string(),
            });
        }
        if state.fail_transient.remove(&key) {
            return Err(RemoteError::Unavailable("simulated outage".to_string()));
        }
        // Repeat delivery of an already-applied action is acknowledged
        // without a second side effect.
        if state.seen.insert(key) {
            state.applied.push(request);
        }
        Ok(json!({ "status": "accepted" }))
    }
}

/// Mirror fake standing in for an embedded local projection: echoes the
/// operation payload back tagged as locally produced.
pub struct EchoMirror;

#[async_trait]
impl innkeep_sync::application::ports::local_mirror::LocalMirror for EchoMirror {
    async fn apply(
        &self,
        op: &WriteOperation,
    ) -> Result<serde_json::Value, innkeep_sync::shared::error::AppError> {
        let mut data = op.payload.as_json().clone();
        if let Some(map) = data.as_object_mut() {
            map.insert("mirrored".to_string(), json!(true));
        }
        Ok(data)
    }
}

pub struct TestHarness {
    pub ctx: SyncContext,
    pub remote: Arc<RecordingRemote>,
    pub connectivity: Arc<ConnectivityMonitor>,
}

/// In-memory context with auto-sync disabled so tests drive every drain
/// explicitly.
pub async fn harness() -> TestHarness {
    harness_with_config(|cfg| {
        cfg.sync.auto_sync = false;
    })
    .await
}

/// Context with an [`EchoMirror`] installed, matching an embedded host.
pub async fn harness_with_mirror() -> TestHarness {
    build_harness(
        |cfg| {
            cfg.sync.auto_sync = false;
        },
        Some(Arc::new(EchoMirror)),
    )
    .await
}

pub async fn harness_with_config<F>(adjust: F) -> TestHarness
where
    F: FnOnce(&mut AppConfig),
{
    build_harness(adjust, None).await
}

async fn build_harness<F>(
    adjust: F,
    mirror: Option<Arc<dyn innkeep_sync::application::ports::local_mirror::LocalMirror>>,
) -> TestHarness
where
    F: FnOnce(&mut AppConfig),
{
    let mut config = AppConfig::default();
    config.sync.remote_timeout_ms = 500;
    adjust(&mut config);

    let remote = RecordingRemote::new();
    let connectivity = Arc::new(ConnectivityMonitor::new(true));

    let mut builder = SyncContextBuilder::new(config)
        .in_memory()
        .with_gateway(remote.clone())
        .with_connectivity(connectivity.clone());
    if let Some(mirror) = mirror {
        builder = builder.with_mirror(mirror);
    }
    let ctx = builder.build().await.expect("context builds");

    TestHarness {
        ctx,
        remote,
        connectivity,
    }
}

pub fn tenant() -> TenantId {
    TenantId::new("hotel-aurora".to_string()).unwrap()
}

pub fn session_for(tenant_id: &TenantId) -> TenantSession {
    let now = Utc::now();
    TenantSession::new(
        tenant_id.clone(),
        "front-desk-1".to_string(),
        StaffRole::FrontDesk,
        now,
        now + ChronoDuration::hours(8),
    )
}

pub async fn sign_in(harness: &TestHarness) -> TenantId {
    let tenant_id = tenant();
    harness
        .ctx
        .session
        .begin(session_for(&tenant_id))
        .await
        .expect("session begins");
    tenant_id
}

pub fn booking_op() -> WriteOperation {
    WriteOperation::new(
        ActionId::generate(),
        ActionKind::Booking,
        ActionPayload::new(json!({
            "booking_id": "bk-2201",
            "room": "204",
            "nights": 2
        }))
        .unwrap(),
    )
}

pub fn charge_op(folio_id: &str, request_id: &str, amount_minor: i64) -> WriteOperation {
    WriteOperation::new(
        ActionId::generate(),
        ActionKind::FolioCharge,
        ActionPayload::new(json!({
            "folio_id": folio_id,
            "booking_id": "bk-2201",
            "request_id": request_id,
            "amount_minor": amount_minor,
            "description": "Minibar",
            "department": "F&B",
            "actor": "front-desk-1"
        }))
        .unwrap(),
    )
}

pub fn void_op(folio_id: &str, request_id: &str, reference: &str, amount_minor: i64) -> WriteOperation {
    WriteOperation::new(
        ActionId::generate(),
        ActionKind::FolioVoid,
        ActionPayload::new(json!({
            "folio_id": folio_id,
            "booking_id": "bk-2201",
            "request_id": request_id,
            "reference_request_id": reference,
            "amount_minor": amount_minor,
            "void_reason": "posted twice"
        }))
        .unwrap(),
    )
}
