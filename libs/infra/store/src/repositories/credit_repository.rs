use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use openpenpal_models::credit::CreditTransaction;
use crate::client::StoreClient;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

/// Credit-ledger persistence (spec C8). The `(user_id, reason_code,
/// reference_id)` unique constraint on `credit_transactions` is what makes
/// `record` idempotent — a retried side effect is a duplicate insert, not a
/// double credit.
#[derive(Clone)]
pub struct CreditRepository {
    client: StoreClient,
}

impl CreditRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Returns `Ok(true)` if this call actually recorded a new transaction,
    /// `Ok(false)` if it was a duplicate of an already-applied one.
    pub async fn record(&self, tx: &CreditTransaction) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO credit_transactions (id, user_id, reason_code, reference_id, amount, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(tx.id.to_string())
        .bind(tx.user_id.to_string())
        .bind(&tx.reason_code)
        .bind(&tx.reference_id)
        .bind(tx.amount)
        .bind(tx.created_at.to_rfc3339())
        .execute(self.client.pool())
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(StoreError::Query(e)),
        }
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COALESCE(SUM(amount), 0) AS total FROM credit_transactions WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_one(self.client.pool())
            .await?;

        Ok(row.try_get::<i64, _>("total")?)
    }

    pub async fn history(&self, user_id: Uuid, limit: i64) -> Result<Vec<CreditTransaction>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, reason_code, reference_id, amount, created_at \
             FROM credit_transactions WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(self.client.pool())
        .await?;

        rows.iter().map(row_to_tx).collect()
    }
}

fn row_to_tx(row: &sqlx::any::AnyRow) -> Result<CreditTransaction, StoreError> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(CreditTransaction {
        id: Uuid::from_str(&id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        user_id: Uuid::from_str(&user_id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        reason_code: row.try_get("reason_code")?,
        reference_id: row.try_get("reference_id")?,
        amount: row.try_get("amount")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?
            .with_timezone(&Utc),
    })
}
