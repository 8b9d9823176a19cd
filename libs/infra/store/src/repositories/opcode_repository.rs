use crate::errors::StoreError;
use crate::client::StoreClient;
use openpenpal_models::opcode::{OpCode, OpCodeRecord};
use sqlx::Row;
use tracing::instrument;

/// Directory persistence for `openpenpal-directory` (spec C4).
#[derive(Clone)]
pub struct OpCodeRepository {
    client: StoreClient,
}

impl OpCodeRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, code: &OpCode) -> Result<OpCodeRecord, StoreError> {
        let row = sqlx::query(
            "SELECT code, school_name, area_name, building_type, point_type, is_public \
             FROM opcodes WHERE code = ?",
        )
        .bind(code.as_str())
        .fetch_optional(self.client.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        row_to_record(&row)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, prefix: &str, limit: i64) -> Result<Vec<OpCodeRecord>, StoreError> {
        let pattern = format!("{prefix}%");
        let rows = sqlx::query(
            "SELECT code, school_name, area_name, building_type, point_type, is_public \
             FROM opcodes WHERE code LIKE ? ORDER BY code LIMIT ?",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    #[instrument(skip(self, record))]
    pub async fn upsert(&self, record: &OpCodeRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO opcodes (code, school_name, area_name, building_type, point_type, is_public) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(code) DO UPDATE SET \
                school_name = excluded.school_name, \
                area_name = excluded.area_name, \
                building_type = excluded.building_type, \
                point_type = excluded.point_type, \
                is_public = excluded.is_public",
        )
        .bind(record.code.as_str())
        .bind(&record.school_name)
        .bind(&record.area_name)
        .bind(&record.building_type)
        .bind(&record.point_type)
        .bind(record.is_public)
        .execute(self.client.pool())
        .await?;

        Ok(())
    }
}

fn row_to_record(row: &sqlx::any::AnyRow) -> Result<OpCodeRecord, StoreError> {
    let code_str: String = row.try_get("code")?;
    let code = OpCode::parse(&code_str)
        .map_err(|e| StoreError::Conflict(format!("stored opcode {code_str} is invalid: {e}")))?;

    Ok(OpCodeRecord {
        code,
        school_name: row.try_get("school_name")?,
        area_name: row.try_get("area_name")?,
        building_type: row.try_get("building_type")?,
        point_type: row.try_get("point_type")?,
        is_public: row.try_get("is_public")?,
    })
}
