use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use openpenpal_models::letter::{BarcodeStatus, LetterCode, StatusLog};
use openpenpal_models::opcode::OpCode;
use crate::client::StoreClient;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

/// Barcode lifecycle persistence (spec C6). Callers are responsible for
/// serializing concurrent mutations on the same code — see the per-code
/// striped locking in `openpenpal-letters`; this repository only does CAS
/// on the stored `version` so a lost update surfaces as `StoreError::Conflict`.
#[derive(Clone)]
pub struct BarcodeRepository {
    client: StoreClient,
}

impl BarcodeRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, code: &str) -> Result<LetterCode, StoreError> {
        let row = sqlx::query(
            "SELECT code, letter_id, envelope_id, status, bound_at, delivered_at, \
                    last_scanned_by, last_scanned_at, scan_count, recipient_opcode, expires_at, version \
             FROM letter_codes WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.client.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        row_to_code(&row)
    }

    pub async fn insert(&self, letter_code: &LetterCode) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO letter_codes \
                (code, letter_id, envelope_id, status, bound_at, delivered_at, last_scanned_by, \
                 last_scanned_at, scan_count, recipient_opcode, expires_at, version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(&letter_code.code)
        .bind(letter_code.letter_id.to_string())
        .bind(&letter_code.envelope_id)
        .bind(letter_code.status.to_string())
        .bind(letter_code.bound_at.map(|t| t.to_rfc3339()))
        .bind(letter_code.delivered_at.map(|t| t.to_rfc3339()))
        .bind(letter_code.last_scanned_by.map(|id| id.to_string()))
        .bind(letter_code.last_scanned_at.map(|t| t.to_rfc3339()))
        .bind(letter_code.scan_count as i64)
        .bind(letter_code.recipient_opcode.as_ref().map(|c| c.as_str().to_string()))
        .bind(letter_code.expires_at.to_rfc3339())
        .execute(self.client.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(format!("barcode {} already exists", letter_code.code)))
            }
            Err(e) => Err(StoreError::Query(e)),
        }
    }

    /// Applies a status transition plus scan bookkeeping in one statement,
    /// matching on the current `version` so a concurrent writer loses the
    /// race cleanly instead of silently overwriting the other's update.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_transition(
        &self,
        code: &str,
        expected_version: i64,
        new_status: BarcodeStatus,
        scanned_by: Option<Uuid>,
        scanned_at: Option<DateTime<Utc>>,
        bound_at: Option<DateTime<Utc>>,
        delivered_at: Option<DateTime<Utc>>,
        recipient_opcode: Option<&OpCode>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE letter_codes SET \
                status = ?, \
                last_scanned_by = COALESCE(?, last_scanned_by), \
                last_scanned_at = COALESCE(?, last_scanned_at), \
                scan_count = scan_count + CASE WHEN ? IS NOT NULL THEN 1 ELSE 0 END, \
                bound_at = COALESCE(?, bound_at), \
                delivered_at = COALESCE(?, delivered_at), \
                recipient_opcode = COALESCE(?, recipient_opcode), \
                version = version + 1 \
             WHERE code = ? AND version = ?",
        )
        .bind(new_status.to_string())
        .bind(scanned_by.map(|id| id.to_string()))
        .bind(scanned_at.map(|t| t.to_rfc3339()))
        .bind(scanned_at.map(|t| t.to_rfc3339()))
        .bind(bound_at.map(|t| t.to_rfc3339()))
        .bind(delivered_at.map(|t| t.to_rfc3339()))
        .bind(recipient_opcode.map(|c| c.as_str().to_string()))
        .bind(code)
        .bind(expected_version)
        .execute(self.client.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "barcode {code} was modified concurrently"
            )));
        }
        Ok(())
    }

    pub async fn insert_status_log(&self, log: &StatusLog) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO status_logs (id, letter_id, to_status, operator_id, location, note, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(log.id.to_string())
        .bind(log.letter_id.to_string())
        .bind(log.to_status.to_string())
        .bind(log.operator_id.to_string())
        .bind(&log.location)
        .bind(&log.note)
        .bind(log.timestamp.to_rfc3339())
        .execute(self.client.pool())
        .await?;

        Ok(())
    }

    pub async fn list_status_logs(&self, letter_id: Uuid) -> Result<Vec<StatusLog>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, letter_id, to_status, operator_id, location, note, timestamp \
             FROM status_logs WHERE letter_id = ? ORDER BY timestamp ASC",
        )
        .bind(letter_id.to_string())
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_log).collect()
    }
}

fn status_from_str(s: &str) -> Result<BarcodeStatus, StoreError> {
    match s {
        "unactivated" => Ok(BarcodeStatus::Unactivated),
        "bound" => Ok(BarcodeStatus::Bound),
        "in_transit" => Ok(BarcodeStatus::InTransit),
        "delivered" => Ok(BarcodeStatus::Delivered),
        "cancelled" => Ok(BarcodeStatus::Cancelled),
        "expired" => Ok(BarcodeStatus::Expired),
        other => Err(StoreError::Conflict(format!("unknown barcode status {other}"))),
    }
}

fn parse_dt(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Conflict(e.to_string()))
}

fn row_to_code(row: &sqlx::any::AnyRow) -> Result<LetterCode, StoreError> {
    let letter_id: String = row.try_get("letter_id")?;
    let status: String = row.try_get("status")?;
    let bound_at: Option<String> = row.try_get("bound_at")?;
    let delivered_at: Option<String> = row.try_get("delivered_at")?;
    let last_scanned_by: Option<String> = row.try_get("last_scanned_by")?;
    let last_scanned_at: Option<String> = row.try_get("last_scanned_at")?;
    let recipient_opcode: Option<String> = row.try_get("recipient_opcode")?;
    let expires_at: String = row.try_get("expires_at")?;

    Ok(LetterCode {
        code: row.try_get("code")?,
        letter_id: Uuid::from_str(&letter_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        envelope_id: row.try_get("envelope_id")?,
        status: status_from_str(&status)?,
        bound_at: bound_at.map(|t| parse_dt(&t)).transpose()?,
        delivered_at: delivered_at.map(|t| parse_dt(&t)).transpose()?,
        last_scanned_by: last_scanned_by
            .map(|id| Uuid::from_str(&id))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        last_scanned_at: last_scanned_at.map(|t| parse_dt(&t)).transpose()?,
        scan_count: row.try_get::<i64, _>("scan_count")? as u64,
        recipient_opcode: recipient_opcode
            .map(|c| OpCode::parse(&c))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        expires_at: parse_dt(&expires_at)?,
        version: row.try_get("version")?,
    })
}

fn row_to_log(row: &sqlx::any::AnyRow) -> Result<StatusLog, StoreError> {
    let id: String = row.try_get("id")?;
    let letter_id: String = row.try_get("letter_id")?;
    let to_status: String = row.try_get("to_status")?;
    let operator_id: String = row.try_get("operator_id")?;
    let timestamp: String = row.try_get("timestamp")?;

    Ok(StatusLog {
        id: Uuid::from_str(&id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        letter_id: Uuid::from_str(&letter_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        to_status: status_from_str(&to_status)?,
        operator_id: Uuid::from_str(&operator_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        location: row.try_get("location")?,
        note: row.try_get("note")?,
        timestamp: parse_dt(&timestamp)?,
    })
}
