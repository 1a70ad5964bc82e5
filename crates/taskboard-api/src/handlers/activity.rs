use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use taskboard_core::{ActivityPage, ActivityQuery, EventKind, ExportFormat};

use crate::{
    error::ApiError,
    extract::{ApiPath, ApiQuery, CurrentUser},
    response::ApiResponse,
    state::ApiState,
};

/// Query string shared by the feed and the export.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    /// Comma-separated event kinds, e.g. `task.created,task.moved`.
    pub kind: Option<String>,
    pub actor_id: Option<Uuid>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub order: Option<String>,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
    pub format: Option<String>,
}

impl ActivityParams {
    pub fn to_query(&self) -> Result<ActivityQuery, ApiError> {
        let kinds = match self.kind.as_deref() {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|kind| !kind.is_empty())
                .map(str::parse::<EventKind>)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(ActivityQuery {
            kinds,
            actor_id: self.actor_id,
            entity_type: self.entity_type.as_deref().map(str::parse).transpose()?,
            entity_id: self.entity_id,
            since: self.since,
            until: self.until,
            search: self.search.clone(),
            order: self.order.as_deref().map(str::parse).transpose()?.unwrap_or_default(),
            offset: self.offset,
            limit: self.limit,
        })
    }

    fn export_format(&self) -> Result<ExportFormat, ApiError> {
        Ok(self.format.as_deref().unwrap_or("csv").parse()?)
    }
}

pub async fn list_activity(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<ActivityParams>,
) -> Result<ApiResponse<ActivityPage>, ApiError> {
    let query = params.to_query()?;
    let page = state.board.activity(user.id, workspace_id, &query).await?;
    Ok(ApiResponse::ok(page))
}

/// Raw CSV or JSON download, outside the envelope.
pub async fn export_activity(
    State(state): State<ApiState>,
    CurrentUser(user): CurrentUser,
    ApiPath(workspace_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<ActivityParams>,
) -> Result<Response, ApiError> {
    let query = params.to_query()?;
    let format = params.export_format()?;
    let (body, file_name) = state
        .board
        .export_activity(user.id, workspace_id, &query, format)
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", file_name);
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
