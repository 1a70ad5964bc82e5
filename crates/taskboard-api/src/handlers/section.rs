use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use taskboard_core::{NewTaskInput, Section, Task};

use super::ListParams;
use crate::{
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, CurrentUser},
    response::ApiResponse,
    state::ApiState,
};

#[derive(Debug, Deserialize)]
pub struct RenameSectionRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub position: i32,
}

pub async fn get_section(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(section_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Section>, ApiError> {
    Ok(ApiResponse::ok(state.board.get_section(user.id, section_id).await?))
}

pub async fn rename_section(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(section_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<RenameSectionRequest>,
) -> Result<ApiResponse<Section>, ApiError> {
    let section = state
        .board
        .rename_section(user.id, section_id, &payload.name)
        .await?;
    Ok(ApiResponse::ok(section))
}

pub async fn archive_section(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(section_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Section>, ApiError> {
    Ok(ApiResponse::ok(state.board.archive_section(user.id, section_id).await?))
}

pub async fn unarchive_section(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(section_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Section>, ApiError> {
    Ok(ApiResponse::ok(state.board.unarchive_section(user.id, section_id).await?))
}

pub async fn move_section(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(section_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<PositionRequest>,
) -> Result<ApiResponse<Section>, ApiError> {
    let section = state
        .board
        .move_section(user.id, section_id, payload.position)
        .await?;
    Ok(ApiResponse::ok(section))
}

// Tasks within a section

pub async fn list_tasks(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(section_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<ApiResponse<Vec<Task>>, ApiError> {
    let tasks = state
        .board
        .list_tasks(user.id, section_id, params.include_archived)
        .await?;
    Ok(ApiResponse::ok(tasks))
}

pub async fn create_task(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(section_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<NewTaskInput>,
) -> Result<ApiResponse<Task>, ApiError> {
    let task = state.board.create_task(user.id, section_id, input).await?;
    Ok(ApiResponse::created(task))
}
