use crate::hub::Hub;
use async_trait::async_trait;
use openpenpal_letters::EventPublisher;
use openpenpal_models::realtime::{RealtimePayload, RoomId};
use std::sync::Arc;

/// Adapts the hub to the narrow `EventPublisher` interface `openpenpal-letters`
/// depends on, so that crate never links against this one directly.
pub struct HubEventPublisher {
    hub: Arc<Hub>,
}

impl HubEventPublisher {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl EventPublisher for HubEventPublisher {
    async fn publish(&self, room: RoomId, payload: RealtimePayload) {
        self.hub.publish(room, payload).await;
    }
}
