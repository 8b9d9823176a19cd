use crate::middleware::CurrentUser;
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::Json;
use openpenpal_models::error::CoreError;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Default)]
pub struct ReviewRequest {
    #[serde(default)]
    comment: Option<String>,
}

async fn reviewer_courier_id(state: &AppState, current: &CurrentUser) -> Result<Uuid, ApiError> {
    let user = state.users.get(current.user_id).await.map_err(|_| ApiError::from(CoreError::NotFound("user".into())))?;
    user.courier_id.ok_or_else(|| CoreError::Forbidden("account is not bound to a courier".into()).into())
}

/// `POST /admin/courier/:id/approve` (spec §6, §4.5 "Promotion flow"). `:id`
/// is the upgrade request id.
pub async fn approve_courier(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<()> {
    let reviewer_id = reviewer_courier_id(&state, &current).await?;
    let reviewer_is_admin = current.has_permission("admin");
    state
        .courier
        .approve_upgrade_request(request_id, reviewer_id, reviewer_is_admin, body.comment)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok(()))
}

/// `POST /admin/courier/:id/reject` (spec §6, §4.5 "Promotion flow").
pub async fn reject_courier(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ReviewRequest>,
) -> ApiResult<()> {
    let reviewer_id = reviewer_courier_id(&state, &current).await?;
    let reviewer_is_admin = current.has_permission("admin");
    state
        .courier
        .reject_upgrade_request(request_id, reviewer_id, reviewer_is_admin, body.comment)
        .await
        .map_err(ApiError::from)?;
    Ok(ApiResponse::ok(()))
}
