use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{error::ApiError, handlers, state::ApiState};

pub fn create_router(state: ApiState) -> Router {
    let api = Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))

        // Authentication
        .route("/auth/signup", post(handlers::auth::sign_up))
        .route("/auth/signin", post(handlers::auth::sign_in))
        .route("/auth/me", get(handlers::auth::me))

        // Workspaces
        .route(
            "/workspaces",
            get(handlers::workspace::list_workspaces).post(handlers::workspace::create_workspace),
        )
        .route(
            "/workspaces/:id",
            get(handlers::workspace::get_workspace)
                .patch(handlers::workspace::update_workspace)
                .delete(handlers::workspace::archive_workspace),
        )
        .route(
            "/workspaces/:id/members",
            get(handlers::workspace::list_members).post(handlers::workspace::add_member),
        )
        .route(
            "/workspaces/:id/members/:user_id",
            put(handlers::workspace::update_member).delete(handlers::workspace::remove_member),
        )
        .route(
            "/workspaces/:id/sections",
            get(handlers::workspace::list_sections).post(handlers::workspace::create_section),
        )

        // Activity feed
        .route("/workspaces/:id/activity", get(handlers::activity::list_activity))
        .route(
            "/workspaces/:id/activity/export",
            get(handlers::activity::export_activity),
        )

        // Sections
        .route(
            "/sections/:id",
            get(handlers::section::get_section).patch(handlers::section::rename_section),
        )
        .route(
            "/sections/:id/archive",
            post(handlers::section::archive_section).delete(handlers::section::unarchive_section),
        )
        .route("/sections/:id/position", put(handlers::section::move_section))
        .route(
            "/sections/:id/tasks",
            get(handlers::section::list_tasks).post(handlers::section::create_task),
        )

        // Tasks
        .route(
            "/tasks/:id",
            get(handlers::task::get_task)
                .patch(handlers::task::update_task)
                .delete(handlers::task::delete_task),
        )
        .route(
            "/tasks/:id/archive",
            post(handlers::task::archive_task).delete(handlers::task::unarchive_task),
        )
        .route("/tasks/:id/position", put(handlers::task::move_task));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)

        // Add state
        .with_state(state)

        // Request tracing and CORS
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn not_found() -> ApiError {
    ApiError::not_found("route not found")
}
