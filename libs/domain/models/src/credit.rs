use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The idempotency key for every credit mutation and notification dispatch
/// (spec §4.8/glossary): duplicates sharing this triple are silently
/// ignored rather than reapplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub user_id: Uuid,
    pub reason_code: String,
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reason_code: String,
    pub reference_id: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub reference_id: String,
}
