use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::{response::Envelope, state::ApiState};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    pub auth: &'static str,
}

fn up_or_down(ok: bool) -> &'static str {
    if ok {
        "up"
    } else {
        "down"
    }
}

/// Reports store and token reachability. Degraded answers 503.
pub async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    let database = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check: store unreachable: {}", e);
            false
        }
    };
    let auth = match state.accounts.self_check() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check: token round-trip failed: {}", e);
            false
        }
    };

    let healthy = database && auth;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let report = HealthReport {
        status: if healthy { "healthy" } else { "degraded" },
        database: up_or_down(database),
        auth: up_or_down(auth),
    };

    (
        status,
        Json(Envelope {
            data: Some(report),
            error: (!healthy).then(|| "service degraded".to_string()),
            status: status.as_u16(),
        }),
    )
}
