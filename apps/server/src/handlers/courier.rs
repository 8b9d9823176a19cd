use crate::middleware::CurrentUser;
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use openpenpal_models::courier::{CourierTask, TaskStatus};
use openpenpal_models::error::CoreError;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct TaskQuery {
    #[serde(default)]
    status: Option<String>,
}

fn parse_status(raw: &str) -> Result<TaskStatus, ApiError> {
    match raw {
        "unassigned" => Ok(TaskStatus::Unassigned),
        "assigned" => Ok(TaskStatus::Assigned),
        "accepted" => Ok(TaskStatus::Accepted),
        "completed" => Ok(TaskStatus::Completed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        other => Err(CoreError::InvalidInput(format!("unknown task status {other}")).into()),
    }
}

async fn current_courier_id(state: &AppState, current: &CurrentUser) -> Result<Uuid, ApiError> {
    let user = state.users.get(current.user_id).await.map_err(|_| ApiError::from(CoreError::NotFound("user".into())))?;
    user.courier_id.ok_or_else(|| CoreError::Forbidden("account is not bound to a courier".into()).into())
}

/// `GET /courier/tasks` (spec §6, §4.5 `ListTasks`).
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Vec<CourierTask>> {
    let courier_id = current_courier_id(&state, &current).await?;
    let status = query.status.map(|s| parse_status(&s)).transpose()?;
    let tasks = state.courier.list_tasks(courier_id, status).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(tasks))
}

/// `POST /courier/tasks/:id/accept` (spec §6, §4.5 `AcceptTask`).
pub async fn accept_task(State(state): State<AppState>, Path(task_id): Path<Uuid>, Extension(current): Extension<CurrentUser>) -> ApiResult<()> {
    let courier_id = current_courier_id(&state, &current).await?;
    state.courier.accept_task(task_id, courier_id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(()))
}

/// `POST /courier/tasks/:id/complete` (spec §6, §4.5 `CompleteTask`).
pub async fn complete_task(State(state): State<AppState>, Path(task_id): Path<Uuid>, Extension(current): Extension<CurrentUser>) -> ApiResult<()> {
    let courier_id = current_courier_id(&state, &current).await?;
    state.courier.complete_task(task_id, courier_id).await.map_err(ApiError::from)?;
    Ok(ApiResponse::ok(()))
}
