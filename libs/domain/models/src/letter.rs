use crate::opcode::OpCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterStatus {
    Draft,
    Generated,
    Collected,
    InTransit,
    Delivered,
    Read,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterVisibility {
    Private,
    Public,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Letter {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub style: String,
    pub status: LetterStatus,
    pub visibility: LetterVisibility,
    pub like_count: u64,
    pub sender_opcode: Option<OpCode>,
    pub recipient_opcode: Option<OpCode>,
    pub created_at: DateTime<Utc>,
}

/// Barcode lifecycle state (spec §3). Transitions are enforced by
/// `openpenpal-letters`' allowed-transition table, not by this enum itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeStatus {
    Unactivated,
    Bound,
    InTransit,
    Delivered,
    Cancelled,
    Expired,
}

impl std::fmt::Display for BarcodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BarcodeStatus::Unactivated => "unactivated",
            BarcodeStatus::Bound => "bound",
            BarcodeStatus::InTransit => "in_transit",
            BarcodeStatus::Delivered => "delivered",
            BarcodeStatus::Cancelled => "cancelled",
            BarcodeStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterCode {
    pub code: String,
    pub letter_id: Uuid,
    pub envelope_id: Option<String>,
    pub status: BarcodeStatus,
    pub bound_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub last_scanned_by: Option<Uuid>,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub scan_count: u64,
    pub recipient_opcode: Option<OpCode>,
    pub expires_at: DateTime<Utc>,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLog {
    pub id: Uuid,
    pub letter_id: Uuid,
    pub to_status: BarcodeStatus,
    pub operator_id: Uuid,
    pub location: Option<String>,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// QR payload. Consumers MUST tolerate both this envelope and a bare read
/// URL string (spec §6) — that tolerance lives in the handler that parses
/// an incoming QR scan, not in this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
    pub letter_id: Uuid,
    pub code: String,
    pub read_url: String,
    pub recipient_opcode: Option<String>,
    pub sender_opcode: Option<String>,
    pub scan_timestamp: DateTime<Utc>,
    pub app_info: serde_json::Value,
}
