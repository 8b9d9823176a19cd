use crate::response::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use openpenpal_models::circuit::CallResult;
use openpenpal_models::error::CoreError;
use openpenpal_security::control_plane::AuthorizeRequest;
use openpenpal_security::RequestSignals;
use serde_json::json;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Circuit id the composition root registers for the persistence layer
/// (spec §4.3 C3), the one downstream dependency every protected route
/// shares.
const STORE_CIRCUIT: &str = "store";

/// Identity attached to the request by [`auth_guard`], consumed by handlers
/// through an `Extension<CurrentUser>` extractor.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub permissions: Vec<String>,
}

impl CurrentUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission || p == "admin")
    }
}

/// Rejects every request while the system is in maintenance mode (spec §9's
/// "health guard" perimeter check).
pub async fn health_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Err(reason) = state.is_operational() {
        warn!(reason = %reason, "rejecting request: system under maintenance");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "code": 503, "message": "service under maintenance", "reason": reason })),
        )
            .into_response();
    }
    next.run(req).await
}

/// Verifies the bearer token, runs it through the security control plane
/// (C1), and injects [`CurrentUser`] for downstream handlers (spec §4.1,
/// §6 "Auth headers"). Also enforces the CSRF contract for state-changing
/// requests: a `X-CSRF-Token` header is required unless the caller presents
/// `X-OpenPenPal-Auth: frontend-client` on an already-JWT-validated call.
pub async fn auth_guard(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let authenticated = token.is_some();
    let claims = token.and_then(|t| state.token_verifier.verify(t).ok());

    if authenticated && claims.is_none() {
        return Err(CoreError::Unauthenticated.into());
    }

    if is_state_changing(req.method()) && !csrf_satisfied(&req) {
        return Err(CoreError::Forbidden("missing CSRF token".into()).into());
    }

    let ip_address = client_ip(&req);
    let user_agent = req.headers().get(header::USER_AGENT).and_then(|h| h.to_str().ok()).unwrap_or("unknown").to_string();

    let signals = RequestSignals {
        unrecognized_ip: false,
        failed_login_proximity: 0.0,
        sensitive_op_velocity: 0.0,
        known_bad_geo: false,
        distance_from_usual_location_km: 0.0,
        has_mfa: false,
        device_recognized: authenticated,
        password_only: true,
        request_time: chrono::Utc::now(),
    };

    let resource = req.uri().path().to_string();
    let action = req.method().to_string();

    let authorize_request = AuthorizeRequest {
        user_id: claims.as_ref().map(|c| c.sub.to_string()),
        session_id: None,
        ip_address,
        user_agent,
        resource,
        action,
        authenticated,
        signals,
    };

    let decision = state.control_plane.authorize(authorize_request)?;
    if !decision.allow {
        return Err(CoreError::Forbidden(decision.reason).into());
    }

    if let Some(claims) = claims {
        debug!(user_id = %claims.sub, "request authorized");
        req.extensions_mut().insert(CurrentUser { user_id: claims.sub, permissions: claims.permissions });
    }

    Ok(next.run(req).await)
}

/// Gates every handler call behind the `store` circuit and records the
/// outcome back into the registry so online learning sees real traffic
/// (spec §4.3). A 5xx response counts as a failure; everything else
/// (including 4xx client errors) counts as success.
pub async fn circuit_guard(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    let now_millis = Utc::now().timestamp_millis();
    let (allowed, _) = state.circuit_breakers.is_call_allowed(STORE_CIRCUIT, now_millis);
    if !allowed {
        return Err(CoreError::CircuitOpen(STORE_CIRCUIT.to_string()).into());
    }

    let started = Instant::now();
    let response = next.run(req).await;
    let status = response.status();

    state.circuit_breakers.record_call(
        STORE_CIRCUIT,
        CallResult {
            timestamp_millis: now_millis,
            success: !status.is_server_error(),
            latency_ms: started.elapsed().as_millis() as u64,
            error_class: status.is_server_error().then(|| status.to_string()),
            status_code: Some(status.as_u16()),
        },
        Utc::now().timestamp_millis(),
    );

    Ok(response)
}

fn is_state_changing(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

fn csrf_satisfied(req: &Request) -> bool {
    if req.headers().contains_key("x-csrf-token") {
        return true;
    }
    req.headers().get("x-openpenpal-auth").and_then(|h| h.to_str().ok()) == Some("frontend-client")
        && req.headers().contains_key(header::ORIGIN)
}

fn client_ip(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .unwrap_or("0.0.0.0")
        .trim()
        .to_string()
}
