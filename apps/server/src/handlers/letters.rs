use crate::middleware::CurrentUser;
use crate::response::{ApiError, ApiResponse, ApiResult, Pagination};
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use openpenpal_models::error::CoreError;
use openpenpal_models::letter::{Letter, LetterCode, LetterVisibility};
use serde::Deserialize;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    limit: u32,
}

#[derive(Deserialize)]
pub struct CreateLetterRequest {
    title: String,
    content: String,
    #[serde(default = "default_style")]
    style: String,
    #[serde(default)]
    visibility: VisibilityInput,
}

fn default_style() -> String {
    "default".to_string()
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityInput {
    #[default]
    Private,
    Public,
}

impl From<VisibilityInput> for LetterVisibility {
    fn from(value: VisibilityInput) -> Self {
        match value {
            VisibilityInput::Private => LetterVisibility::Private,
            VisibilityInput::Public => LetterVisibility::Public,
        }
    }
}

/// `POST /letters` (spec §6).
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<CreateLetterRequest>,
) -> ApiResult<Letter> {
    let letter = state
        .letters
        .create_draft(current.user_id, body.title, body.content, body.style, body.visibility.into())
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok(letter))
}

/// `GET /letters` (spec §6): letters authored by the caller.
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<Letter>> {
    let limit = if page.limit == 0 { DEFAULT_PAGE_SIZE } else { page.limit as i64 };
    let offset = page.page as i64 * limit;
    let letters = state.letters.list_by_author(current.user_id, limit, offset).await.map_err(ApiError::from)?;
    let total = letters.len() + offset as usize;
    Ok(ApiResponse::ok_paginated(letters, Pagination::new(page.page, limit as u32, total)))
}

/// `GET /letters/public` (spec §6).
pub async fn list_public(State(state): State<AppState>, Query(page): Query<PageQuery>) -> ApiResult<Vec<Letter>> {
    let limit = if page.limit == 0 { DEFAULT_PAGE_SIZE } else { page.limit as i64 };
    let offset = page.page as i64 * limit;
    let letters = state.letters.list_public(limit, offset).await.map_err(ApiError::from)?;
    let total = letters.len() + offset as usize;
    Ok(ApiResponse::ok_paginated(letters, Pagination::new(page.page, limit as u32, total)))
}

/// `GET /letters/:id` (spec §6).
pub async fn get_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Letter> {
    let letter = state.letters.get_letter(id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(letter))
}

/// `POST /letters/:id/generate-code` (spec §6, §4.6).
pub async fn generate_code(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<LetterCode> {
    let code = state.letters.generate_barcode(id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(code))
}

#[derive(Deserialize)]
pub struct BindEnvelopeRequest {
    recipient_opcode: String,
}

/// `POST /letters/:id/bind-envelope` (spec §6). `:id` here is the barcode
/// code, matching the envelope-binding flow this route names.
pub async fn bind_envelope(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<BindEnvelopeRequest>,
) -> ApiResult<()> {
    let operator_prefixes = operator_managed_prefixes(&state, &current).await?;
    state
        .letters
        .bind_barcode(&code, &body.recipient_opcode, current.user_id, &operator_prefixes)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok(()))
}

/// `GET /letters/read/:code` (spec §6): public barcode status read by the
/// recipient scanning a physical envelope.
pub async fn read_by_code(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<LetterCode> {
    let status = state.letters.get_barcode_status(&code).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(status))
}

/// `POST /letters/read/:code/mark-read` (spec §6, §4.6 `MarkAsRead`).
pub async fn mark_read(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<()> {
    state.letters.mark_as_read(&code, current.user_id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(()))
}

async fn operator_managed_prefixes(state: &AppState, current: &CurrentUser) -> Result<std::collections::HashSet<String>, ApiError> {
    let user = state.users.get(current.user_id).await.map_err(|_| ApiError::from(CoreError::NotFound("user".into())))?;
    let Some(courier_id) = user.courier_id else {
        return Err(CoreError::Forbidden("account is not bound to a courier".into()).into());
    };
    let courier = state.courier_repository.get(courier_id).await.map_err(|_| ApiError::from(CoreError::NotFound("courier".into())))?;
    Ok(courier.managed_prefixes)
}
