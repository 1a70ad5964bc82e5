use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use taskboard_api::{routes::create_router, state::ApiState};
use taskboard_auth::TokenIssuer;
use taskboard_core::MemoryStore;

fn app() -> Router {
    let tokens = TokenIssuer::new("integration-secret", chrono::Duration::hours(1));
    create_router(ApiState::new(Arc::new(MemoryStore::new()), tokens, 100))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, bytes) = send_raw(app, method, uri, token, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

async fn sign_up(app: &Router, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": email, "display_name": email, "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    (
        body["data"]["token"].as_str().unwrap().to_string(),
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn workspace(app: &Router, token: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/workspaces",
        Some(token),
        Some(json!({ "name": "Launch" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn section(app: &Router, token: &str, workspace_id: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/workspaces/{}/sections", workspace_id),
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_reports_up() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["database"], "up");
    assert_eq!(body["data"]["auth"], "up");
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn test_unknown_route_is_enveloped_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_auth_flow() {
    let app = app();
    let (token, user_id) = sign_up(&app, "ada@example.com").await;

    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({ "email": "ADA@example.com", "display_name": "Ada", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/workspaces", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = send(&app, Method::GET, "/api/workspaces", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();
    let (token, _) = sign_up(&app, "bad@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/workspaces")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_body_of_wrong_shape_is_bad_request() {
    let app = app();
    let (token, _) = sign_up(&app, "shape@example.com").await;
    let ws = workspace(&app, &token).await;
    let todo = section(&app, &token, &ws, "Todo").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/sections/{}/tasks", todo),
        Some(&token),
        Some(json!({ "priority": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/sections/{}/position", todo),
        Some(&token),
        Some(json!({ "position": "first" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/workspaces")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(json!({ "name": "Plain" }).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_zero_activity_limit_is_bad_request() {
    let app = app();
    let (token, _) = sign_up(&app, "limits@example.com").await;
    let ws = workspace(&app, &token).await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/workspaces/{}/activity?limit=0", ws),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed: limit must be at least 1");
}

#[tokio::test]
async fn test_section_archive_reindexes_and_unarchive_appends() {
    let app = app();
    let (token, _) = sign_up(&app, "owner@example.com").await;
    let ws = workspace(&app, &token).await;

    let todo = section(&app, &token, &ws, "Todo").await;
    let _doing = section(&app, &token, &ws, "Doing").await;
    let _done = section(&app, &token, &ws, "Done").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/sections/{}/archive", todo),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_archived"], true);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/api/workspaces/{}/sections", ws),
        Some(&token),
        None,
    )
    .await;
    let active: Vec<(String, i64)> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (s["name"].as_str().unwrap().to_string(), s["position"].as_i64().unwrap()))
        .collect();
    assert_eq!(active, vec![("Doing".to_string(), 0), ("Done".to_string(), 1)]);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/sections/{}/archive", todo),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["position"], 2);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/sections/{}/archive", todo),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_section_position_is_clamped() {
    let app = app();
    let (token, _) = sign_up(&app, "mover@example.com").await;
    let ws = workspace(&app, &token).await;
    let first = section(&app, &token, &ws, "First").await;
    section(&app, &token, &ws, "Second").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/sections/{}/position", first),
        Some(&token),
        Some(json!({ "position": 99 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["position"], 1);
}

#[tokio::test]
async fn test_permission_checks() {
    let app = app();
    let (owner, _) = sign_up(&app, "owner@example.com").await;
    let (viewer, viewer_id) = sign_up(&app, "viewer@example.com").await;
    let (stranger, _) = sign_up(&app, "stranger@example.com").await;
    let ws = workspace(&app, &owner).await;
    let sec = section(&app, &owner, &ws, "Backlog").await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/workspaces/{}/members", ws),
        Some(&owner),
        Some(json!({
            "email": "viewer@example.com",
            "permissions": { "read": true }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Viewers read but cannot write.
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/sections/{}/tasks", sec),
        Some(&viewer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/sections/{}/tasks", sec),
        Some(&viewer),
        Some(json!({ "title": "Sneaky" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Non-members are refused, missing rows are 404.
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/sections/{}", sec),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/sections/{}", uuid::Uuid::new_v4()),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Granting write lets the viewer create tasks.
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/workspaces/{}/members/{}", ws, viewer_id),
        Some(&owner),
        Some(json!({ "permissions": { "read": true, "write": true } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/sections/{}/tasks", sec),
        Some(&viewer),
        Some(json!({ "title": "Allowed now" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_task_lifecycle_and_activity() {
    let app = app();
    let (token, _) = sign_up(&app, "pm@example.com").await;
    let ws = workspace(&app, &token).await;
    let todo = section(&app, &token, &ws, "Todo").await;
    let done = section(&app, &token, &ws, "Done").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/sections/{}/tasks", todo),
        Some(&token),
        Some(json!({ "title": "Write release notes", "priority": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "todo");
    let task = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/tasks/{}", task),
        Some(&token),
        Some(json!({ "status": "done", "description": "v1.2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["completed_at"].is_string());

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/tasks/{}/position", task),
        Some(&token),
        Some(json!({ "section_id": done, "position": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["section_id"], done.as_str());

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/workspaces/{}/activity?kind=task.created,task.moved&order=asc", ws),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["items"][0]["kind"], "task.created");
    assert_eq!(body["data"]["items"][1]["kind"], "task.moved");

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/workspaces/{}/activity?kind=task.exploded", ws),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/tasks/{}", task),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/tasks/{}", task),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_activity_export_is_a_raw_download() {
    let app = app();
    let (token, _) = sign_up(&app, "export@example.com").await;
    let ws = workspace(&app, &token).await;
    section(&app, &token, &ws, "Inbox").await;

    let (status, headers, bytes) = send_raw(
        &app,
        Method::GET,
        &format!("/api/workspaces/{}/activity/export?format=csv", ws),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"activity-"));
    assert!(disposition.ends_with(".csv\""));

    let text = String::from_utf8(bytes).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("id,created_at,actor_id,kind,entity_type,entity_id,summary")
    );
    assert_eq!(lines.count(), 2);

    let (status, headers, bytes) = send_raw(
        &app,
        Method::GET,
        &format!("/api/workspaces/{}/activity/export?format=json&kind=section.created", ws),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let rows: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);

    let (status, _, _) = send_raw(
        &app,
        Method::GET,
        &format!("/api/workspaces/{}/activity/export?format=xml", ws),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_archived_workspace_disappears() {
    let app = app();
    let (token, _) = sign_up(&app, "archivist@example.com").await;
    let ws = workspace(&app, &token).await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/workspaces/{}", ws),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/workspaces/{}", ws),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::GET, "/api/workspaces", Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}
