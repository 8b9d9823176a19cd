use thiserror::Error;

/// Errors surfaced by the persistence layer, scoped to the OpenPenPal
/// aggregates.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated: {0}")]
    Conflict(String),
}
