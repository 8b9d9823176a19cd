use std::env;

/// Process configuration, read once at startup (spec §6 "Environment").
/// Deliberately plain `env::var` reads rather than a config crate.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Reserved for a future rate-limit/session backend; unused today since
    /// the workspace has no Redis client dependency (spec §1 Non-goals
    /// excludes swapping the relational store, and nothing here needs a
    /// second store yet).
    pub redis_addr: Option<String>,
    pub test_mode: bool,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| default_database_url());

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using an insecure development default");
            "openpenpal-dev-secret".to_string()
        });

        let redis_addr = env::var("REDIS_ADDR").ok();

        let test_mode = env::var("TEST_MODE").map(|v| v == "true" || v == "1").unwrap_or(false);

        let port = env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);

        Self { database_url, jwt_secret, redis_addr, test_mode, port }
    }
}

/// `DATABASE_TYPE` (spec §6) picks the driver; `sqlx::Any` picks the scheme
/// up from the URL itself, so this only supplies a workable default for
/// local development when neither is set.
fn default_database_url() -> String {
    match env::var("DATABASE_TYPE").as_deref() {
        Ok("postgres") => "postgres://localhost/openpenpal".to_string(),
        _ => "sqlite::memory:".to_string(),
    }
}
