use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account record backing `/auth/login` and `/users/me` (spec §6). Not
/// part of spec.md §3's component data model — added because the REST
/// surface names login/identity endpoints that need somewhere to read
/// credentials and permissions from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub courier_id: Option<Uuid>,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
}
