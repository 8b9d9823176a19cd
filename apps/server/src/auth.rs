use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use openpenpal_models::error::CoreError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ACCESS_TOKEN_TTL_MINUTES: i64 = 30;
const REFRESH_TOKEN_TTL_DAYS: i64 = 14;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub refresh: bool,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and verifies the bearer tokens consumed by [`crate::middleware::auth_guard`]
/// (spec §6 "Auth headers"). Kept as a trait, per SPEC_FULL §6, so a future
/// asymmetric-key rotation scheme can replace the HS256 implementation
/// without touching call sites.
pub trait TokenVerifier: Send + Sync {
    fn issue_access_token(&self, user_id: Uuid, permissions: &[String]) -> Result<String, CoreError>;
    fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, CoreError>;
    fn verify(&self, token: &str) -> Result<Claims, CoreError>;
}

pub struct JwtVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self { encoding_key: EncodingKey::from_secret(secret.as_bytes()), decoding_key: DecodingKey::from_secret(secret.as_bytes()) }
    }

    fn issue(&self, user_id: Uuid, permissions: Vec<String>, refresh: bool, ttl: Duration) -> Result<String, CoreError> {
        let now = Utc::now();
        let claims = Claims { sub: user_id, permissions, refresh, iat: now.timestamp(), exp: (now + ttl).timestamp() };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| CoreError::Internal(e.to_string()))
    }
}

impl TokenVerifier for JwtVerifier {
    fn issue_access_token(&self, user_id: Uuid, permissions: &[String]) -> Result<String, CoreError> {
        self.issue(user_id, permissions.to_vec(), false, Duration::minutes(ACCESS_TOKEN_TTL_MINUTES))
    }

    fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, CoreError> {
        self.issue(user_id, Vec::new(), true, Duration::days(REFRESH_TOKEN_TTL_DAYS))
    }

    fn verify(&self, token: &str) -> Result<Claims, CoreError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| CoreError::Unauthenticated)
    }
}
