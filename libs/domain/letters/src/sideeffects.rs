use async_trait::async_trait;
use openpenpal_models::credit::{IdempotencyKey, OutboundNotification};
use openpenpal_models::realtime::{RealtimePayload, RoomId};

/// Rewards credits for a triggering event. Implemented by
/// `openpenpal-credit` at the composition root; kept narrow here so this
/// crate has no dependency on the ledger's persistence (spec §9: wire
/// cross-aggregate side effects through narrow interfaces to avoid a
/// cyclic dependency between letters and credit).
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Returns `true` if a new credit was recorded, `false` if the key was
    /// already seen (spec §4.8 idempotency).
    async fn reward(&self, key: IdempotencyKey, amount: i64) -> bool;
}

/// Publishes a realtime event to a room. Implemented by
/// `openpenpal-realtime`'s hub.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, room: RoomId, payload: RealtimePayload);
}

/// Best-effort notification dispatch; failures are logged, never
/// propagated to the triggering transaction (spec §4.8).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: OutboundNotification);
}
