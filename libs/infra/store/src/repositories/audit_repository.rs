use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use openpenpal_models::security::{AuditEvent, AuditResult, AuditSeverity};
use crate::client::StoreClient;
use sqlx::Row;
use uuid::Uuid;

/// Append-only sink for the audit channel drained by the security control
/// plane's background writer (spec C1.4).
#[derive(Clone)]
pub struct AuditRepository {
    client: StoreClient,
}

impl AuditRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn insert(&self, event: &AuditEvent) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_log \
                (request_id, user_id, category, severity, result, resource, action, reason, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(request_id) DO NOTHING",
        )
        .bind(event.request_id.to_string())
        .bind(&event.user_id)
        .bind(&event.category)
        .bind(severity_str(event.severity))
        .bind(result_str(event.result))
        .bind(&event.resource)
        .bind(&event.action)
        .bind(&event.reason)
        .bind(event.timestamp.to_rfc3339())
        .execute(self.client.pool())
        .await?;

        Ok(())
    }

    pub async fn recent_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<AuditEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT request_id, user_id, category, severity, result, resource, action, reason, timestamp \
             FROM audit_log WHERE user_id = ? ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_event).collect()
    }
}

fn severity_str(severity: AuditSeverity) -> &'static str {
    match severity {
        AuditSeverity::Info => "info",
        AuditSeverity::Warning => "warning",
        AuditSeverity::Critical => "critical",
    }
}

fn severity_from_str(s: &str) -> Result<AuditSeverity, StoreError> {
    match s {
        "info" => Ok(AuditSeverity::Info),
        "warning" => Ok(AuditSeverity::Warning),
        "critical" => Ok(AuditSeverity::Critical),
        other => Err(StoreError::Conflict(format!("unknown audit severity {other}"))),
    }
}

fn result_str(result: AuditResult) -> &'static str {
    match result {
        AuditResult::Allowed => "allowed",
        AuditResult::Denied => "denied",
    }
}

fn result_from_str(s: &str) -> Result<AuditResult, StoreError> {
    match s {
        "allowed" => Ok(AuditResult::Allowed),
        "denied" => Ok(AuditResult::Denied),
        other => Err(StoreError::Conflict(format!("unknown audit result {other}"))),
    }
}

fn row_to_event(row: &sqlx::any::AnyRow) -> Result<AuditEvent, StoreError> {
    let request_id: String = row.try_get("request_id")?;
    let severity: String = row.try_get("severity")?;
    let result: String = row.try_get("result")?;
    let timestamp: String = row.try_get("timestamp")?;

    Ok(AuditEvent {
        request_id: Uuid::parse_str(&request_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        user_id: row.try_get("user_id")?,
        category: row.try_get("category")?,
        severity: severity_from_str(&severity)?,
        result: result_from_str(&result)?,
        resource: row.try_get("resource")?,
        action: row.try_get("action")?,
        reason: row.try_get("reason")?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| StoreError::Conflict(e.to_string()))?
            .with_timezone(&Utc),
    })
}
