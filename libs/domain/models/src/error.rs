use thiserror::Error;

/// The error taxonomy shared across every component boundary (spec §7).
///
/// Component-local error enums convert into this one at their public
/// surface; nothing downstream of a component needs to know its internal
/// failure shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited")]
    RateLimited,

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("circuit open for service {0}")]
    CircuitOpen(String),

    #[error("upstream timeout")]
    UpstreamTimeout,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status code derived from the error kind (spec §7).
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::Unauthenticated => 401,
            CoreError::Forbidden(_) => 403,
            CoreError::InvalidInput(_) => 400,
            CoreError::NotFound(_) => 404,
            CoreError::Conflict(_) => 409,
            CoreError::RateLimited => 429,
            CoreError::PolicyViolation(_) => 403,
            CoreError::InvalidTransition { .. } => 409,
            CoreError::CircuitOpen(_) => 503,
            CoreError::UpstreamTimeout => 504,
            CoreError::UpstreamUnavailable(_) => 503,
            CoreError::Internal(_) => 500,
        }
    }

    /// Machine-readable kind string used in the error envelope's `error.type`.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Unauthenticated => "Unauthenticated",
            CoreError::Forbidden(_) => "Forbidden",
            CoreError::InvalidInput(_) => "InvalidInput",
            CoreError::NotFound(_) => "NotFound",
            CoreError::Conflict(_) => "Conflict",
            CoreError::RateLimited => "RateLimited",
            CoreError::PolicyViolation(_) => "PolicyViolation",
            CoreError::InvalidTransition { .. } => "InvalidTransition",
            CoreError::CircuitOpen(_) => "CircuitOpen",
            CoreError::UpstreamTimeout => "UpstreamTimeout",
            CoreError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            CoreError::Internal(_) => "Internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_spec_table() {
        assert_eq!(CoreError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(CoreError::CircuitOpen("x".into()).http_status(), 503);
        assert_eq!(CoreError::RateLimited.http_status(), 429);
    }
}
