use crate::client::StoreClient;
use crate::errors::StoreError;
use chrono::{DateTime, Utc};
use openpenpal_models::user::User;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

/// Account persistence backing `/auth/login` and `/users/me`.
#[derive(Clone)]
pub struct UserRepository {
    client: StoreClient,
}

impl UserRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: Uuid) -> Result<User, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, courier_id, permissions, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.client.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        row_to_user(&row)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, courier_id, permissions, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.client.pool())
        .await?
        .ok_or(StoreError::NotFound)?;

        row_to_user(&row)
    }

    pub async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (id, username, password_hash, courier_id, permissions, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.courier_id.map(|id| id.to_string()))
        .bind(serde_json::to_string(&user.permissions).unwrap_or_else(|_| "[]".into()))
        .bind(user.created_at.to_rfc3339())
        .execute(self.client.pool())
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(format!("username {} already taken", user.username)))
            }
            Err(e) => Err(StoreError::Query(e)),
        }
    }
}

fn row_to_user(row: &sqlx::any::AnyRow) -> Result<User, StoreError> {
    let id: String = row.try_get("id")?;
    let courier_id: Option<String> = row.try_get("courier_id")?;
    let permissions: String = row.try_get("permissions")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(User {
        id: Uuid::from_str(&id).map_err(|e| StoreError::Conflict(e.to_string()))?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        courier_id: courier_id
            .map(|id| Uuid::from_str(&id))
            .transpose()
            .map_err(|e| StoreError::Conflict(e.to_string()))?,
        permissions: serde_json::from_str(&permissions).unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Conflict(e.to_string()))?
            .with_timezone(&Utc),
    })
}
