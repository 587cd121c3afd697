//! Router-level tests for the task endpoints.
//!
//! Requests go through the full router (extractors, handlers, error
//! translation) with `tower::ServiceExt::oneshot`.

mod common;

use axum::http::{Method, StatusCode};
use rstest::rstest;
use serde_json::json;

use common::{counting_app, send};

// =============================================================================
// GET /tasks, POST /tasks
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_create_returns_server_assigned_fields() {
    let (app, _) = counting_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/tasks",
        Some(r#"{"title":"A","description":"first"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(1));
    assert_eq!(body["title"], json!("A"));
    assert_eq!(body["description"], json!("first"));
    assert_eq!(body["completed"], json!(false));
    assert!(body["createdAt"].is_string());
    assert!(body["updatedAt"].is_string());
}

#[rstest]
#[case(r#"{}"#)]
#[case(r#"{"title": 5}"#)]
#[case(r#"{"title": "A", "description": 3}"#)]
#[case(r#"{"title": "A""#)]
#[case(r#"[]"#)]
#[tokio::test]
async fn test_create_with_invalid_body_is_bad_request(#[case] body: &str) {
    let (app, repository) = counting_app();

    let (status, response) = send(&app, Method::POST, "/tasks", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!response["error"].as_str().unwrap().is_empty());
    assert_eq!(repository.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_create_without_content_type_is_bad_request() {
    let (app, repository) = counting_app();

    let (status, response) = send(&app, Method::POST, "/tasks", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string());
    assert_eq!(repository.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_list_returns_newest_first() {
    let (app, _) = counting_app();
    send(&app, Method::POST, "/tasks", Some(r#"{"title":"old"}"#)).await;
    send(&app, Method::POST, "/tasks", Some(r#"{"title":"new"}"#)).await;

    let (status, body) = send(&app, Method::GET, "/tasks", None).await;

    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["new", "old"]);
}

// =============================================================================
// PATCH /tasks/{id}
// =============================================================================

#[rstest]
#[case("abc")]
#[case("1.5")]
#[case("12abc")]
#[tokio::test]
async fn test_patch_with_malformed_id_never_touches_store(#[case] id: &str) {
    let (app, repository) = counting_app();

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/tasks/{id}"),
        Some(r#"{"completed":true}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid ID format" }));
    assert_eq!(repository.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_patch_reports_id_error_before_body_error() {
    let (app, _) = counting_app();

    let (status, body) = send(&app, Method::PATCH, "/tasks/abc", Some("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid ID format"));
}

#[rstest]
#[case(r#"{"completed":"yes"}"#)]
#[case(r#"{"title":12}"#)]
#[case(r#"{"title":""}"#)]
#[case("{not json")]
#[tokio::test]
async fn test_patch_with_schema_violation_makes_no_repository_call(#[case] body: &str) {
    let (app, repository) = counting_app();
    send(&app, Method::POST, "/tasks", Some(r#"{"title":"A"}"#)).await;
    let calls_before = repository.calls();

    let (status, response) = send(&app, Method::PATCH, "/tasks/1", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].is_string());
    assert_eq!(repository.calls(), calls_before);

    let (_, tasks) = send(&app, Method::GET, "/tasks", None).await;
    assert_eq!(tasks[0]["title"], json!("A"));
    assert_eq!(tasks[0]["completed"], json!(false));
}

#[rstest]
#[case("  A  ".to_string())]
#[case("   ".to_string())]
#[case("x".repeat(201))]
#[tokio::test]
async fn test_patch_stores_title_exactly_as_sent(#[case] title: String) {
    let (app, _) = counting_app();
    let create_body = json!({ "title": title }).to_string();
    let (status, created) = send(&app, Method::POST, "/tasks", Some(&create_body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["title"], json!(title));

    send(&app, Method::PATCH, "/tasks/1", Some(r#"{"title":"renamed"}"#)).await;
    let patch_body = json!({ "title": title }).to_string();
    let (status, updated) = send(&app, Method::PATCH, "/tasks/1", Some(&patch_body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], json!(title));
    let (_, tasks) = send(&app, Method::GET, "/tasks", None).await;
    assert_eq!(tasks[0]["title"], json!(title));
}

#[rstest]
#[tokio::test]
async fn test_patch_missing_task_is_internal_error() {
    let (app, _) = counting_app();

    let (status, body) = send(&app, Method::PATCH, "/tasks/99", Some(r#"{"completed":true}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Task not found: 99" }));
}

#[rstest]
#[tokio::test]
async fn test_patch_ignores_unknown_fields() {
    let (app, _) = counting_app();
    send(&app, Method::POST, "/tasks", Some(r#"{"title":"A"}"#)).await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/tasks/1",
        Some(r#"{"completed":true,"id":42,"priority":"high"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(1));
    assert_eq!(body["completed"], json!(true));
}

// =============================================================================
// DELETE /tasks/{id}
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_delete_removes_task_from_list() {
    let (app, _) = counting_app();
    send(&app, Method::POST, "/tasks", Some(r#"{"title":"keep"}"#)).await;
    send(&app, Method::POST, "/tasks", Some(r#"{"title":"drop"}"#)).await;

    let (status, body) = send(&app, Method::DELETE, "/tasks/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Task deleted successfully" }));

    let (_, tasks) = send(&app, Method::GET, "/tasks", None).await;
    let ids: Vec<i64> = tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1]);
}

#[rstest]
#[tokio::test]
async fn test_delete_with_malformed_id_is_bad_request() {
    let (app, repository) = counting_app();

    let (status, body) = send(&app, Method::DELETE, "/tasks/abc", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid ID format"));
    assert_eq!(repository.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_delete_missing_task_is_internal_error() {
    let (app, _) = counting_app();

    let (status, body) = send(&app, Method::DELETE, "/tasks/7", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Task not found: 7"));
}

// =============================================================================
// Scenarios
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_create_toggle_delete_scenario() {
    let (app, _) = counting_app();

    let (_, created) = send(&app, Method::POST, "/tasks", Some(r#"{"title":"A"}"#)).await;
    let id = created["id"].as_i64().unwrap();

    let (_, tasks) = send(&app, Method::GET, "/tasks", None).await;
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["title"], json!("A"));
    assert_eq!(tasks[0]["completed"], json!(false));

    let (status, toggled) = send(
        &app,
        Method::PATCH,
        &format!("/tasks/{id}"),
        Some(r#"{"completed":true}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], json!(true));
    assert_eq!(toggled["title"], json!("A"));

    let (status, _) = send(&app, Method::DELETE, &format!("/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, tasks) = send(&app, Method::GET, "/tasks", None).await;
    assert_eq!(tasks, json!([]));
}

#[rstest]
#[tokio::test]
async fn test_health_check() {
    let (app, _) = counting_app();

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
}
