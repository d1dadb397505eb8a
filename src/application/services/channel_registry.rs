use crate::application::ports::channel_transport::{
    ChangeEvent, ChangePayload, ChannelTransport, SubscriptionId,
};
use crate::application::services::session_service::SessionService;
use crate::shared::config::RealtimeMode;
use crate::shared::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

pub type ChangeHandler = Arc<dyn Fn(&ChangePayload) + Send + Sync>;
pub type SubscribedCallback = Arc<dyn Fn() + Send + Sync>;

/// What a caller wants to be told about: one event kind on one resource,
/// optionally narrowed by a filter expression.
#[derive(Clone)]
pub struct ChangeSpec {
    pub event: ChangeEvent,
    pub resource: String,
    pub filter: Option<String>,
    pub handler: ChangeHandler,
}

impl ChangeSpec {
    fn matches(&self, payload: &ChangePayload) -> bool {
        self.event.matches(payload.event)
            && self.resource == payload.resource
            && (self.filter.is_none() || self.filter == payload.filter)
    }
}

pub struct ChannelRegistration {
    pub channel_name: String,
    pub change_specs: Vec<ChangeSpec>,
    pub on_subscribed: Option<SubscribedCallback>,
}

/// Registration handle. A disabled handle (no valid session at register
/// time) carries no id; unregistering it is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    id: Option<u64>,
}

impl ChannelHandle {
    fn active(id: u64) -> Self {
        Self { id: Some(id) }
    }

    fn disabled() -> Self {
        Self { id: None }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }
}

struct ManagedChannel {
    subscription: SubscriptionId,
    member_count: usize,
}

struct RegistrationEntry {
    channel_name: String,
    /// Set in direct mode, where each registration owns its subscription.
    own_subscription: Option<SubscriptionId>,
}

#[derive(Default)]
struct RegistryState {
    next_id: u64,
    registrations: HashMap<u64, RegistrationEntry>,
    channels: HashMap<String, ManagedChannel>,
}

type RouteTable = Arc<StdMutex<HashMap<String, Vec<(u64, Arc<Vec<ChangeSpec>>)>>>>;

/// One registration call regardless of host. In managed mode (embedded
/// runtime) exactly one underlying transport subscription exists per
/// distinct channel name, multiplexed across registrations; in direct
/// mode (hosted web) each registration owns its own. Handlers receive the
/// same payload shape either way and never learn which mode is active.
pub struct ChannelRegistry {
    transport: Arc<dyn ChannelTransport>,
    session: Arc<SessionService>,
    mode: RealtimeMode,
    state: Mutex<RegistryState>,
    routes: RouteTable,
}

impl ChannelRegistry {
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        session: Arc<SessionService>,
        mode: RealtimeMode,
    ) -> Self {
        Self {
            transport,
            session,
            mode,
            state: Mutex::new(RegistryState::default()),
            routes: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    pub async fn register_channel(
        &self,
        registration: ChannelRegistration,
    ) -> Result<ChannelHandle, AppError> {
        if self.session.active_tenant().is_none() {
            tracing::debug!(
                target: "realtime",
                channel = registration.channel_name,
                "no valid session; returning disabled handle"
            );
            return Ok(ChannelHandle::disabled());
        }

        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;

        let channel_name = registration.channel_name.clone();
        let specs = Arc::new(registration.change_specs);

        match self.mode {
            RealtimeMode::Managed => {
                {
                    let mut routes = self.routes.lock().unwrap();
                    routes
                        .entry(channel_name.clone())
                        .or_default()
                        .push((id, specs));
                }

                if let Some(channel) = state.channels.get_mut(&channel_name) {
                    channel.member_count += 1;
                } else {
                    let sink = managed_sink(self.routes.clone(), channel_name.clone());
                    let subscription =
                        match self.transport.subscribe(&channel_name, sink).await {
                            Ok(subscription) => subscription,
                            Err(err) => {
                                self.remove_route(&channel_name, id);
                                return Err(err);
                            }
                        };
                    state.channels.insert(
                        channel_name.clone(),
                        ManagedChannel {
                            subscription,
                            member_count: 1,
                        },
                    );
                }

                state.registrations.insert(
                    id,
                    RegistrationEntry {
                        channel_name,
                        own_subscription: None,
                    },
                );
            }
            RealtimeMode::Direct => {
                let sink_specs = specs.clone();
                let subscription = self
                    .transport
                    .subscribe(
                        &channel_name,
                        Arc::new(move |payload: &ChangePayload| {
                            for spec in sink_specs.iter() {
                                if spec.matches(payload) {
                                    (spec.handler)(payload);
                                }
                            }
                        }),
                    )
                    .await?;

                state.registrations.insert(
                    id,
                    RegistrationEntry {
                        channel_name,
                        own_subscription: Some(subscription),
                    },
                );
            }
        }
        drop(state);

        if let Some(callback) = registration.on_subscribed {
            callback();
        }

        Ok(ChannelHandle::active(id))
    }

    /// Fully releases the underlying subscription. Calling it twice, or on
    /// an already released or disabled handle, is a no-op.
    pub async fn unregister_channel(&self, handle: &ChannelHandle) -> Result<(), AppError> {
        let Some(id) = handle.id else {
            return Ok(());
        };

        let mut state = self.state.lock().await;
        let Some(entry) = state.registrations.remove(&id) else {
            return Ok(());
        };

        match entry.own_subscription {
            Some(subscription) => {
                drop(state);
                self.transport.unsubscribe(subscription).await?;
            }
            None => {
                self.remove_route(&entry.channel_name, id);
                let release = match state.channels.get_mut(&entry.channel_name) {
                    Some(channel) => {
                        channel.member_count -= 1;
                        if channel.member_count == 0 {
                            let subscription = channel.subscription;
                            state.channels.remove(&entry.channel_name);
                            Some(subscription)
                        } else {
                            None
                        }
                    }
                    None => None,
                };
                drop(state);
                if let Some(subscription) = release {
                    self.transport.unsubscribe(subscription).await?;
                }
            }
        }

        Ok(())
    }

    fn remove_route(&self, channel_name: &str, id: u64) {
        let mut routes = self.routes.lock().unwrap();
        if let Some(entries) = routes.get_mut(channel_name) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                routes.remove(channel_name);
            }
        }
    }
}

/// Shared sink for one managed channel: fans a delivered payload out to
/// every registration currently routed to it. Handlers run outside the
/// route lock so a handler may register or unregister.
fn managed_sink(
    routes: RouteTable,
    channel_name: String,
) -> Arc<dyn Fn(&ChangePayload) + Send + Sync> {
    Arc::new(move |payload: &ChangePayload| {
        let spec_sets: Vec<Arc<Vec<ChangeSpec>>> = {
            let routes = routes.lock().unwrap();
            routes
                .get(&channel_name)
                .map(|entries| entries.iter().map(|(_, specs)| specs.clone()).collect())
                .unwrap_or_default()
        };
        for specs in spec_sets {
            for spec in specs.iter() {
                if spec.matches(payload) {
                    (spec.handler)(payload);
                }
            }
        }
    })
}
