use crate::opcode::OpCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Courier tier in the four-level hierarchy. `L4` is the top (city), `L1`
/// the bottom (exact delivery point) — numerically the reverse of `level`
/// as an integer, so `CourierLevel::rank()` gives back the spec's
/// `level ∈ {1,2,3,4}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CourierLevel {
    L1,
    L2,
    L3,
    L4,
}

impl CourierLevel {
    pub fn rank(&self) -> u8 {
        match self {
            CourierLevel::L1 => 1,
            CourierLevel::L2 => 2,
            CourierLevel::L3 => 3,
            CourierLevel::L4 => 4,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            1 => Some(CourierLevel::L1),
            2 => Some(CourierLevel::L2),
            3 => Some(CourierLevel::L3),
            4 => Some(CourierLevel::L4),
            _ => None,
        }
    }

    /// Expected managed-prefix length for this level (spec §3/§4.4):
    /// L4 = 0 (global), L3 = 2 (school), L2 = 4 (area), L1 = 6 (exact point).
    pub fn prefix_len(&self) -> usize {
        match self {
            CourierLevel::L4 => 0,
            CourierLevel::L3 => 2,
            CourierLevel::L2 => 4,
            CourierLevel::L1 => 6,
        }
    }

    pub fn parent(&self) -> Option<CourierLevel> {
        match self {
            CourierLevel::L1 => Some(CourierLevel::L2),
            CourierLevel::L2 => Some(CourierLevel::L3),
            CourierLevel::L3 => Some(CourierLevel::L4),
            CourierLevel::L4 => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourierStatus {
    Active,
    Suspended,
    PendingApproval,
    Retired,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierStats {
    pub open_task_count: u32,
    pub completed_task_count: u32,
    pub recent_success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: CourierLevel,
    pub parent_id: Option<Uuid>,
    pub managed_prefixes: HashSet<String>,
    pub status: CourierStatus,
    pub stats: CourierStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Unassigned,
    Assigned,
    Accepted,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierTask {
    pub id: Uuid,
    pub letter_id: Uuid,
    pub recipient_opcode: OpCode,
    pub assigned_courier_id: Option<Uuid>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierUpgradeRequest {
    pub id: Uuid,
    pub courier_id: Uuid,
    pub current_level: CourierLevel,
    pub requested_level: CourierLevel,
    pub reason: String,
    pub evidence: Vec<String>,
    pub status: UpgradeRequestStatus,
    pub reviewer_id: Option<Uuid>,
    pub reviewer_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}
