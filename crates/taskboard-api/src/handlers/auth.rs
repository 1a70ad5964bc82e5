use axum::extract::State;
use serde::Deserialize;
use taskboard_auth::Session;
use taskboard_core::User;

use crate::{
    error::ApiError,
    extract::{ApiJson, CurrentUser},
    response::ApiResponse,
    state::ApiState,
};

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

pub async fn sign_up(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<SignUpRequest>,
) -> Result<ApiResponse<Session>, ApiError> {
    let session = state
        .accounts
        .sign_up(&payload.email, &payload.display_name, &payload.password)
        .await?;
    Ok(ApiResponse::created(session))
}

pub async fn sign_in(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<SignInRequest>,
) -> Result<ApiResponse<Session>, ApiError> {
    let session = state.accounts.sign_in(&payload.email, &payload.password).await?;
    Ok(ApiResponse::ok(session))
}

pub async fn me(CurrentUser(user): CurrentUser) -> ApiResponse<User> {
    ApiResponse::ok(user)
}
