use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Names a realtime fanout room (spec §4.7): `letter:{id}`, `user:{id}`,
/// `courier:{id}`, or the fixed `admin:broadcast`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn letter(id: Uuid) -> Self {
        Self(format!("letter:{id}"))
    }

    pub fn user(id: Uuid) -> Self {
        Self(format!("user:{id}"))
    }

    pub fn courier(id: Uuid) -> Self {
        Self(format!("courier:{id}"))
    }

    pub fn admin_broadcast() -> Self {
        Self("admin:broadcast".to_string())
    }
}

/// A server-published event (spec §4.7/§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimePayload {
    LetterStatusUpdate {
        letter_id: Uuid,
        status: String,
    },
    BarcodeStatusUpdate {
        code: String,
        status: String,
        operator_id: Uuid,
    },
    NotificationNew {
        title: String,
        body: String,
    },
    CourierTaskAssigned {
        task_id: Uuid,
        courier_id: Uuid,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    pub payload: RealtimePayload,
    pub timestamp: DateTime<Utc>,
}
