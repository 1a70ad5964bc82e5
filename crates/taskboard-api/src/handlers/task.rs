use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use taskboard_core::{Task, TaskPatch};

use crate::{
    error::ApiError,
    extract::{ApiJson, ApiPath, CurrentUser},
    response::ApiResponse,
    state::ApiState,
};

#[derive(Debug, Deserialize)]
pub struct MoveTaskRequest {
    /// Target section; the task stays in its own section when absent.
    pub section_id: Option<Uuid>,
    pub position: i32,
}

pub async fn get_task(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Task>, ApiError> {
    Ok(ApiResponse::ok(state.board.get_task(user.id, task_id).await?))
}

pub async fn update_task(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> Result<ApiResponse<Task>, ApiError> {
    Ok(ApiResponse::ok(state.board.update_task(user.id, task_id, patch).await?))
}

pub async fn delete_task(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<ApiResponse<()>, ApiError> {
    state.board.delete_task(user.id, task_id).await?;
    Ok(ApiResponse::ok(()))
}

pub async fn archive_task(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Task>, ApiError> {
    Ok(ApiResponse::ok(state.board.archive_task(user.id, task_id).await?))
}

pub async fn unarchive_task(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Task>, ApiError> {
    Ok(ApiResponse::ok(state.board.unarchive_task(user.id, task_id).await?))
}

pub async fn move_task(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<MoveTaskRequest>,
) -> Result<ApiResponse<Task>, ApiError> {
    let task = state
        .board
        .move_task(user.id, task_id, payload.section_id, payload.position)
        .await?;
    Ok(ApiResponse::ok(task))
}
