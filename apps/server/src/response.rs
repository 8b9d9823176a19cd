use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use openpenpal_models::error::CoreError;
use serde::Serialize;
use uuid::Uuid;

/// Pagination block attached to list responses (spec §6 response envelope).
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        let limit_nonzero = limit.max(1);
        let total_pages = ((total as u32) + limit_nonzero - 1) / limit_nonzero;
        Self { page, limit: limit_nonzero, total, total_pages }
    }
}

/// Success envelope (spec §6): `{code: 0, message, data, pagination?, timestamp}`.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { code: 0, message: "ok".into(), data, pagination: None, timestamp: Utc::now() }
    }

    pub fn ok_paginated(data: T, pagination: Pagination) -> Self {
        Self { code: 0, message: "ok".into(), data, pagination: Some(pagination), timestamp: Utc::now() }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Serialize)]
struct ErrorDetail {
    field: Option<String>,
    message: String,
    code: String,
}

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    details: Vec<ErrorDetail>,
}

/// Error envelope (spec §6): `{code, message, error:{type, details}, timestamp}`.
/// Wraps `CoreError`, the single taxonomy every component boundary converts
/// into (spec §7), so every handler can just propagate `?`.
#[derive(Serialize)]
pub struct ApiError {
    code: i32,
    message: String,
    error: ErrorBody,
    timestamp: DateTime<Utc>,
    request_id: Uuid,
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self {
            code: err.http_status() as i32,
            message: err.to_string(),
            error: ErrorBody { kind: err.kind().to_string(), details: Vec::new() },
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
