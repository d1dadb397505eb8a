use crate::application::ports::channel_transport::{
    ChangePayload, ChangeSink, ChannelTransport, SubscriptionId,
};
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

struct HubState {
    next_id: u64,
    /// subscription id -> (channel name, sink)
    subscribers: HashMap<u64, (String, ChangeSink)>,
}

/// In-process pub/sub transport. The embedded runtime publishes local
/// change events into it; tests use it to assert subscription lifecycle.
pub struct InMemoryChannelHub {
    state: Mutex<HubState>,
}

impl InMemoryChannelHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState {
                next_id: 0,
                subscribers: HashMap::new(),
            }),
        }
    }

    /// Delivers a payload to every sink subscribed to `channel_name`.
    pub fn publish(&self, channel_name: &str, payload: &ChangePayload) {
        let sinks: Vec<ChangeSink> = {
            let state = self.state.lock().unwrap();
            state
                .subscribers
                .values()
                .filter(|(name, _)| name == channel_name)
                .map(|(_, sink)| sink.clone())
                .collect()
        };
        for sink in sinks {
            sink(payload);
        }
    }
}

impl Default for InMemoryChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelTransport for InMemoryChannelHub {
    async fn subscribe(
        &self,
        channel_name: &str,
        sink: ChangeSink,
    ) -> Result<SubscriptionId, AppError> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state
            .subscribers
            .insert(id, (channel_name.to_string(), sink));
        Ok(SubscriptionId(id))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), AppError> {
        self.state.lock().unwrap().subscribers.remove(&id.0);
        Ok(())
    }

    fn subscriber_count(&self, channel_name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .subscribers
            .values()
            .filter(|(name, _)| name == channel_name)
            .count()
    }
}
