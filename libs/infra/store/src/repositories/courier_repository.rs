use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use openpenpal_models::courier::{
    Courier, CourierLevel, CourierStats, CourierStatus, CourierTask, CourierUpgradeRequest,
    TaskStatus, UpgradeRequestStatus,
};
use openpenpal_models::opcode::OpCode;
use crate::client::StoreClient;
use sqlx::Row;
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

/// Courier hierarchy and task-assignment persistence (spec C5).
#[derive(Clone)]
pub struct CourierRepository {
    client: StoreClient,
}

impl CourierRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: Uuid) -> Result<Courier, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, level, parent_id, managed_prefixes, status, \
                    open_task_count, completed_task_count, recent_success_rate \
             FROM couriers WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.client.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        row_to_courier(&row)
    }

    pub async fn list_by_level(&self, level: CourierLevel) -> Result<Vec<Courier>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, level, parent_id, managed_prefixes, status, \
                    open_task_count, completed_task_count, recent_success_rate \
             FROM couriers WHERE level = ? AND status = 'active'",
        )
        .bind(level_str(level))
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_courier).collect()
    }

    pub async fn upsert(&self, courier: &Courier) -> Result<(), StoreError> {
        let prefixes = serde_json::to_string(&courier.managed_prefixes)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        sqlx::query(
            "INSERT INTO couriers (id, user_id, level, parent_id, managed_prefixes, status, \
                open_task_count, completed_task_count, recent_success_rate) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                level = excluded.level, \
                parent_id = excluded.parent_id, \
                managed_prefixes = excluded.managed_prefixes, \
                status = excluded.status, \
                open_task_count = excluded.open_task_count, \
                completed_task_count = excluded.completed_task_count, \
                recent_success_rate = excluded.recent_success_rate",
        )
        .bind(courier.id.to_string())
        .bind(courier.user_id.to_string())
        .bind(level_str(courier.level))
        .bind(courier.parent_id.map(|id| id.to_string()))
        .bind(prefixes)
        .bind(status_str(courier.status))
        .bind(courier.stats.open_task_count as i64)
        .bind(courier.stats.completed_task_count as i64)
        .bind(courier.stats.recent_success_rate)
        .execute(self.client.pool())
        .await?;

        Ok(())
    }

    pub async fn insert_task(&self, task: &CourierTask) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO courier_tasks \
                (id, letter_id, recipient_opcode, assigned_courier_id, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(task.letter_id.to_string())
        .bind(task.recipient_opcode.as_str())
        .bind(task.assigned_courier_id.map(|id| id.to_string()))
        .bind(task_status_str(task.status))
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(self.client.pool())
        .await?;

        Ok(())
    }

    pub async fn update_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        assigned_courier_id: Option<Uuid>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE courier_tasks SET status = ?, assigned_courier_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(task_status_str(status))
        .bind(assigned_courier_id.map(|id| id.to_string()))
        .bind(updated_at.to_rfc3339())
        .bind(id.to_string())
        .execute(self.client.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn get_task(&self, id: Uuid) -> Result<CourierTask, StoreError> {
        let row = sqlx::query(
            "SELECT id, letter_id, recipient_opcode, assigned_courier_id, status, created_at, updated_at \
             FROM courier_tasks WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.client.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        row_to_task(&row)
    }

    pub async fn list_upgrade_requests_for_courier(&self, courier_id: Uuid) -> Result<Vec<CourierUpgradeRequest>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, courier_id, current_level, requested_level, reason, evidence, status, \
                    reviewer_id, reviewer_comment, created_at, reviewed_at \
             FROM courier_upgrade_requests WHERE courier_id = ? ORDER BY created_at DESC",
        )
        .bind(courier_id.to_string())
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_upgrade_request).collect()
    }

    pub async fn get_upgrade_request(&self, id: Uuid) -> Result<CourierUpgradeRequest, StoreError> {
        let row = sqlx::query(
            "SELECT id, courier_id, current_level, requested_level, reason, evidence, status, \
                    reviewer_id, reviewer_comment, created_at, reviewed_at \
             FROM courier_upgrade_requests WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.client.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        row_to_upgrade_request(&row)
    }

    pub async fn list_tasks_for_courier(&self, courier_id: Uuid) -> Result<Vec<CourierTask>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, letter_id, recipient_opcode, assigned_courier_id, status, created_at, updated_at \
             FROM courier_tasks WHERE assigned_courier_id = ? ORDER BY created_at DESC",
        )
        .bind(courier_id.to_string())
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_task).collect()
    }

    pub async fn insert_upgrade_request(
        &self,
        request: &CourierUpgradeRequest,
    ) -> Result<(), StoreError> {
        let evidence = serde_json::to_string(&request.evidence)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        sqlx::query(
            "INSERT INTO courier_upgrade_requests \
                (id, courier_id, current_level, requested_level, reason, evidence, status, \
                 reviewer_id, reviewer_comment, created_at, reviewed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.id.to_string())
        .bind(request.courier_id.to_string())
        .bind(level_str(request.current_level))
        .bind(level_str(request.requested_level))
        .bind(&request.reason)
        .bind(evidence)
        .bind(upgrade_status_str(request.status))
        .bind(request.reviewer_id.map(|id| id.to_string()))
        .bind(&request.reviewer_comment)
        .bind(request.created_at.to_rfc3339())
        .bind(request.reviewed_at.map(|t| t.to_rfc3339()))
        .execute(self.client.pool())
        .await?;

        Ok(())
    }

    pub async fn update_upgrade_request(
        &self,
        request: &CourierUpgradeRequest,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE courier_upgrade_requests SET status = ?, reviewer_id = ?, reviewer_comment = ?, \
                reviewed_at = ? WHERE id = ?",
        )
        .bind(upgrade_status_str(request.status))
        .bind(request.reviewer_id.map(|id| id.to_string()))
        .bind(&request.reviewer_comment)
        .bind(request.reviewed_at.map(|t| t.to_rfc3339()))
        .bind(request.id.to_string())
        .execute(self.client.pool())
        .await?;

        Ok(())
    }
}

fn level_str(level: CourierLevel) -> &'static str {
    match level {
        CourierLevel::L1 => "L1",
        CourierLevel::L2 => "L2",
        CourierLevel::L3 => "L3",
        CourierLevel::L4 => "L4",
    }
}

fn level_from_str(s: &str) -> Result<CourierLevel, StoreError> {
    match s {
        "L1" => Ok(CourierLevel::L1),
        "L2" => Ok(CourierLevel::L2),
        "L3" => Ok(CourierLevel::L3),
        "L4" => Ok(CourierLevel::L4),
        other => Err(StoreError::Conflict(format!("unknown courier level {other}"))),
    }
}

fn status_str(status: CourierStatus) -> &'static str {
    match status {
        CourierStatus::Active => "active",
        CourierStatus::Suspended => "suspended",
        CourierStatus::PendingApproval => "pending_approval",
        CourierStatus::Retired => "retired",
    }
}

fn status_from_str(s: &str) -> Result<CourierStatus, StoreError> {
    match s {
        "active" => Ok(CourierStatus::Active),
        "suspended" => Ok(CourierStatus::Suspended),
        "pending_approval" => Ok(CourierStatus::PendingApproval),
        "retired" => Ok(CourierStatus::Retired),
        other => Err(StoreError::Conflict(format!("unknown courier status {other}"))),
    }
}

fn task_status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Unassigned => "unassigned",
        TaskStatus::Assigned => "assigned",
        TaskStatus::Accepted => "accepted",
        TaskStatus::Completed => "completed",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn task_status_from_str(s: &str) -> Result<TaskStatus, StoreError> {
    match s {
        "unassigned" => Ok(TaskStatus::Unassigned),
        "assigned" => Ok(TaskStatus::Assigned),
        "accepted" => Ok(TaskStatus::Accepted),
        "completed" => Ok(TaskStatus::Completed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        other => Err(StoreError::Conflict(format!("unknown task status {other}"))),
    }
}

fn upgrade_status_str(status: UpgradeRequestStatus) -> &'static str {
    match status {
        UpgradeRequestStatus::Pending => "pending",
        UpgradeRequestStatus::Approved => "approved",
        UpgradeRequestStatus::Rejected => "rejected",
    }
}

fn upgrade_status_from_str(s: &str) -> Result<UpgradeRequestStatus, StoreError> {
    match s {
        "pending" => Ok(UpgradeRequestStatus::Pending),
        "approved" => Ok(UpgradeRequestStatus::Approved),
        "rejected" => Ok(UpgradeRequestStatus::Rejected),
        other => Err(StoreError::Conflict(format!("unknown upgrade request status {other}"))),
    }
}

fn row_to_courier(row: &sqlx::any::AnyRow) -> Result<Courier, StoreError> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let level: String = row.try_get("level")?;
    let parent_id: Option<String> = row.try_get("parent_id")?;
    let managed_prefixes: String = row.try_get("managed_prefixes")?;
    let status: String = row.try_get("status")?;

    let prefixes: HashSet<String> = serde_json::from_str(&managed_prefixes)
        .map_err(|e| StoreError::Conflict(e.to_string()))?;

    Ok(Courier {
        id: Uuid::from_str(&id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        user_id: Uuid::from_str(&user_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        level: level_from_str(&level)?,
        parent_id: parent_id
            .map(|p| Uuid::from_str(&p))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        managed_prefixes: prefixes,
        status: status_from_str(&status)?,
        stats: CourierStats {
            open_task_count: row.try_get::<i64, _>("open_task_count")? as u32,
            completed_task_count: row.try_get::<i64, _>("completed_task_count")? as u32,
            recent_success_rate: row.try_get("recent_success_rate")?,
        },
    })
}

fn row_to_task(row: &sqlx::any::AnyRow) -> Result<CourierTask, StoreError> {
    let id: String = row.try_get("id")?;
    let letter_id: String = row.try_get("letter_id")?;
    let recipient_opcode: String = row.try_get("recipient_opcode")?;
    let assigned_courier_id: Option<String> = row.try_get("assigned_courier_id")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(CourierTask {
        id: Uuid::from_str(&id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        letter_id: Uuid::from_str(&letter_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        recipient_opcode: OpCode::parse(&recipient_opcode)
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        assigned_courier_id: assigned_courier_id
            .map(|id| Uuid::from_str(&id))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        status: task_status_from_str(&status)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?
            .with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?
            .with_timezone(&Utc),
    })
}

fn row_to_upgrade_request(row: &sqlx::any::AnyRow) -> Result<CourierUpgradeRequest, StoreError> {
    let id: String = row.try_get("id")?;
    let courier_id: String = row.try_get("courier_id")?;
    let current_level: String = row.try_get("current_level")?;
    let requested_level: String = row.try_get("requested_level")?;
    let evidence: String = row.try_get("evidence")?;
    let status: String = row.try_get("status")?;
    let reviewer_id: Option<String> = row.try_get("reviewer_id")?;
    let created_at: String = row.try_get("created_at")?;
    let reviewed_at: Option<String> = row.try_get("reviewed_at")?;

    Ok(CourierUpgradeRequest {
        id: Uuid::from_str(&id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        courier_id: Uuid::from_str(&courier_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        current_level: level_from_str(&current_level)?,
        requested_level: level_from_str(&requested_level)?,
        reason: row.try_get("reason")?,
        evidence: serde_json::from_str(&evidence).map_err(|e| StoreError::Conflict(e.to_string()))?,
        status: upgrade_status_from_str(&status)?,
        reviewer_id: reviewer_id
            .map(|id| Uuid::from_str(&id))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        reviewer_comment: row.try_get("reviewer_comment")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?
            .with_timezone(&Utc),
        reviewed_at: reviewed_at
            .map(|t| DateTime::parse_from_rfc3339(&t).map(|dt| dt.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
    })
}
