use crate::handlers::{admin, auth, barcodes, courier, letters, postcode, stream};
use crate::middleware::{auth_guard, circuit_guard, health_guard};
use crate::state::AppState;
use axum::http::{header, Method};
use axum::routing::{get, patch, post};
use axum::{middleware, Router};
use std::time::Duration;
use tower::limit::RateLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the full HTTP router (spec §6). `/health` is unauthenticated;
/// everything under `/api/v1` passes through [`health_guard`] then
/// [`auth_guard`]; `/api/v1/auth/login` is exempt from `auth_guard` since it
/// is how a client obtains its first token.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ORIGIN, "x-csrf-token".parse().unwrap(), "x-openpenpal-auth".parse().unwrap()])
        .max_age(Duration::from_secs(3600));

    let auth_routes = Router::new().route("/login", post(auth::login)).layer(login_rate_limit(&state));

    let protected_routes = Router::new()
        .route("/users/me", get(auth::me))
        .route("/letters", post(letters::create).get(letters::list_mine))
        .route("/letters/public", get(letters::list_public))
        .route("/letters/read/:code", get(letters::read_by_code))
        .route("/letters/read/:code/mark-read", post(letters::mark_read))
        .route("/letters/:id", get(letters::get_one))
        .route("/letters/:id/generate-code", post(letters::generate_code))
        .route("/letters/:id/bind-envelope", post(letters::bind_envelope))
        .route("/barcodes", post(barcodes::create))
        .route("/barcodes/:code/status", patch(barcodes::update_status))
        .route("/postcode/:code", get(postcode::get_opcode))
        .route("/postcode/schools/:school/areas", get(postcode::list_areas))
        .route("/postcode/schools/:school/areas/:area/buildings", get(postcode::list_buildings))
        .route("/postcode/schools/:school/areas/:area/buildings/:building/rooms", get(postcode::list_rooms))
        .route("/courier/tasks", get(courier::list_tasks))
        .route("/courier/tasks/:id/accept", post(courier::accept_task))
        .route("/courier/tasks/:id/complete", post(courier::complete_task))
        .route("/admin/courier/:id/approve", post(admin::approve_courier))
        .route("/admin/courier/:id/reject", post(admin::reject_courier))
        .route("/stream", get(stream::upgrade))
        .layer(middleware::from_fn_with_state(state.clone(), circuit_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard))
        .layer(middleware::from_fn_with_state(state.clone(), health_guard))
        .layer(general_rate_limit(&state));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", Router::new().nest("/auth", auth_routes).merge(protected_routes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rate-limit profile switch (spec §6): wide-open in test mode, strict in
/// production. `tower::limit::RateLimitLayer` enforces a single global
/// bucket rather than a per-client one — acceptable here since the
/// workspace carries no per-IP limiter dependency; a production deployment
/// would front this with a gateway-level limiter.
fn general_rate_limit(state: &AppState) -> RateLimitLayer {
    if state.config.test_mode {
        RateLimitLayer::new(20, Duration::from_secs(1))
    } else {
        RateLimitLayer::new(1, Duration::from_secs(1))
    }
}

fn login_rate_limit(state: &AppState) -> RateLimitLayer {
    if state.config.test_mode {
        RateLimitLayer::new(2, Duration::from_secs(1))
    } else {
        RateLimitLayer::new(1, Duration::from_secs(60))
    }
}
