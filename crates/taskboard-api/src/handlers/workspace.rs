use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use taskboard_core::{MemberPatch, Permissions, Section, Workspace, WorkspaceMember, WorkspacePatch};

use super::ListParams;
use crate::{
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery, CurrentUser},
    response::ApiResponse,
    state::ApiState,
};

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    /// Defaults to read and write.
    pub permissions: Option<Permissions>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSectionRequest {
    pub name: String,
}

pub async fn list_workspaces(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<Workspace>>, ApiError> {
    Ok(ApiResponse::ok(state.board.list_workspaces(user.id).await?))
}

pub async fn create_workspace(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<CreateWorkspaceRequest>,
) -> Result<ApiResponse<Workspace>, ApiError> {
    let workspace = state
        .board
        .create_workspace(user.id, &payload.name, payload.description)
        .await?;
    Ok(ApiResponse::created(workspace))
}

pub async fn get_workspace(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Workspace>, ApiError> {
    Ok(ApiResponse::ok(state.board.get_workspace(user.id, workspace_id).await?))
}

pub async fn update_workspace(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<WorkspacePatch>,
) -> Result<ApiResponse<Workspace>, ApiError> {
    let workspace = state
        .board
        .update_workspace(user.id, workspace_id, patch)
        .await?;
    Ok(ApiResponse::ok(workspace))
}

pub async fn archive_workspace(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Workspace>, ApiError> {
    Ok(ApiResponse::ok(state.board.archive_workspace(user.id, workspace_id).await?))
}

// Members

pub async fn list_members(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<WorkspaceMember>>, ApiError> {
    Ok(ApiResponse::ok(state.board.list_members(user.id, workspace_id).await?))
}

pub async fn add_member(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AddMemberRequest>,
) -> Result<ApiResponse<WorkspaceMember>, ApiError> {
    let permissions = payload.permissions.unwrap_or_else(Permissions::editor);
    let member = state
        .board
        .add_member(user.id, workspace_id, &payload.email, permissions)
        .await?;
    Ok(ApiResponse::created(member))
}

pub async fn update_member(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath((workspace_id, member_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(patch): ApiJson<MemberPatch>,
) -> Result<ApiResponse<WorkspaceMember>, ApiError> {
    let member = state
        .board
        .update_member(user.id, workspace_id, member_id, patch)
        .await?;
    Ok(ApiResponse::ok(member))
}

pub async fn remove_member(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath((workspace_id, member_id)): ApiPath<(Uuid, Uuid)>,
) -> Result<ApiResponse<()>, ApiError> {
    state
        .board
        .remove_member(user.id, workspace_id, member_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

// Sections within a workspace

pub async fn list_sections(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<ApiResponse<Vec<Section>>, ApiError> {
    let sections = state
        .board
        .list_sections(user.id, workspace_id, params.include_archived)
        .await?;
    Ok(ApiResponse::ok(sections))
}

pub async fn create_section(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateSectionRequest>,
) -> Result<ApiResponse<Section>, ApiError> {
    let section = state
        .board
        .create_section(user.id, workspace_id, &payload.name)
        .await?;
    Ok(ApiResponse::created(section))
}
