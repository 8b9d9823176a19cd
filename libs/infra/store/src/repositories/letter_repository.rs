use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use openpenpal_models::letter::{Letter, LetterStatus, LetterVisibility};
use openpenpal_models::opcode::OpCode;
use crate::client::StoreClient;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

/// Letter aggregate persistence (spec C6), excluding the barcode/scan
/// lifecycle which lives in `BarcodeRepository`.
#[derive(Clone)]
pub struct LetterRepository {
    client: StoreClient,
}

impl LetterRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: Uuid) -> Result<Letter, StoreError> {
        let row = sqlx::query(
            "SELECT id, author_id, title, content, style, status, visibility, like_count, \
                    sender_opcode, recipient_opcode, created_at \
             FROM letters WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.client.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        row_to_letter(&row)
    }

    pub async fn insert(&self, letter: &Letter) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO letters \
                (id, author_id, title, content, style, status, visibility, like_count, \
                 sender_opcode, recipient_opcode, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(letter.id.to_string())
        .bind(letter.author_id.to_string())
        .bind(&letter.title)
        .bind(&letter.content)
        .bind(&letter.style)
        .bind(status_str(letter.status))
        .bind(visibility_str(letter.visibility))
        .bind(letter.like_count as i64)
        .bind(letter.sender_opcode.as_ref().map(|c| c.as_str().to_string()))
        .bind(letter.recipient_opcode.as_ref().map(|c| c.as_str().to_string()))
        .bind(letter.created_at.to_rfc3339())
        .execute(self.client.pool())
        .await?;

        Ok(())
    }

    pub async fn update_status(&self, id: Uuid, status: LetterStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE letters SET status = ? WHERE id = ?")
            .bind(status_str(status))
            .bind(id.to_string())
            .execute(self.client.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn increment_like_count(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE letters SET like_count = like_count + 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(self.client.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn list_public(&self, limit: i64, offset: i64) -> Result<Vec<Letter>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, author_id, title, content, style, status, visibility, like_count, \
                    sender_opcode, recipient_opcode, created_at \
             FROM letters WHERE visibility = 'public' ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_letter).collect()
    }

    pub async fn list_by_author(&self, author_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Letter>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, author_id, title, content, style, status, visibility, like_count, \
                    sender_opcode, recipient_opcode, created_at \
             FROM letters WHERE author_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(author_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_letter).collect()
    }
}

fn status_str(status: LetterStatus) -> &'static str {
    match status {
        LetterStatus::Draft => "draft",
        LetterStatus::Generated => "generated",
        LetterStatus::Collected => "collected",
        LetterStatus::InTransit => "in_transit",
        LetterStatus::Delivered => "delivered",
        LetterStatus::Read => "read",
    }
}

fn status_from_str(s: &str) -> Result<LetterStatus, StoreError> {
    match s {
        "draft" => Ok(LetterStatus::Draft),
        "generated" => Ok(LetterStatus::Generated),
        "collected" => Ok(LetterStatus::Collected),
        "in_transit" => Ok(LetterStatus::InTransit),
        "delivered" => Ok(LetterStatus::Delivered),
        "read" => Ok(LetterStatus::Read),
        other => Err(StoreError::Conflict(format!("unknown letter status {other}"))),
    }
}

fn visibility_str(visibility: LetterVisibility) -> &'static str {
    match visibility {
        LetterVisibility::Private => "private",
        LetterVisibility::Public => "public",
    }
}

fn visibility_from_str(s: &str) -> Result<LetterVisibility, StoreError> {
    match s {
        "private" => Ok(LetterVisibility::Private),
        "public" => Ok(LetterVisibility::Public),
        other => Err(StoreError::Conflict(format!("unknown letter visibility {other}"))),
    }
}

fn row_to_letter(row: &sqlx::any::AnyRow) -> Result<Letter, StoreError> {
    let id: String = row.try_get("id")?;
    let author_id: String = row.try_get("author_id")?;
    let status: String = row.try_get("status")?;
    let visibility: String = row.try_get("visibility")?;
    let sender_opcode: Option<String> = row.try_get("sender_opcode")?;
    let recipient_opcode: Option<String> = row.try_get("recipient_opcode")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Letter {
        id: Uuid::from_str(&id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        author_id: Uuid::from_str(&author_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        style: row.try_get("style")?,
        status: status_from_str(&status)?,
        visibility: visibility_from_str(&visibility)?,
        like_count: row.try_get::<i64, _>("like_count")? as u64,
        sender_opcode: sender_opcode
            .map(|c| OpCode::parse(&c))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        recipient_opcode: recipient_opcode
            .map(|c| OpCode::parse(&c))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?
            .with_timezone(&Utc),
    })
}
