//! The HTTP surface, driven through the router with `oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use todos::api::{self, AppState};
use todos::pages;
use todos::store::TaskStore;
use todos::store::sqlite::SqliteBackend;

async fn app() -> Router {
    let backend = SqliteBackend::in_memory().await.unwrap();
    let state = Arc::new(AppState::new(TaskStore::new(backend, chrono_tz::UTC)));
    api::router::<SqliteBackend>().merge(pages::router::<SqliteBackend>()).with_state(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn unknown_id_is_404_with_error_message() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/todos/12345", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(&app, "PUT", "/api/todos/12345", Some(json!({ "completed": true }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", "/api/todos/12345", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_id_is_404_json() {
    let app = app().await;
    for method in ["GET", "DELETE"] {
        let (status, body) = send(&app, method, "/api/todos/abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
        assert_eq!(body["error"], "Task abc not found");
    }
    let (status, body) = send(&app, "PUT", "/api/todos/abc", Some(json!({ "completed": true }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/todos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"text\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(!body["error"].as_str().unwrap().is_empty());

    let request = Request::builder()
        .method("POST")
        .uri("/api/todos/import")
        .body(Body::from("[]"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unrepresentable_due_date_is_400() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/todos",
        Some(json!({ "text": "far future", "dueDate": 9_000_000_000_000_000_i64 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("due date"));
    let (_, list) = send(&app, "GET", "/api/todos", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn create_complete_reopen_cycle() {
    let app = app().await;
    let (status, created) = send(&app, "POST", "/api/todos", Some(json!({ "text": "buy milk" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["text"], "buy milk");
    assert_eq!(created["completed"], false);
    assert!(created["dueDate"].is_i64());
    let id = created["id"].as_i64().unwrap();

    let uri = format!("/api/todos/{id}");
    let (status, done) = send(&app, "PUT", &uri, Some(json!({ "completed": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["completed"], true);
    assert!(done["completedDate"].is_i64());
    assert!(done["modifiedDate"].is_i64());

    let (_, reopened) = send(&app, "PUT", &uri, Some(json!({ "completed": false, "dueDate": null }))).await;
    assert_eq!(reopened["completed"], false);
    assert!(reopened["completedDate"].is_null());
    assert!(reopened["dueDate"].is_null());
    assert_eq!(reopened["createdDate"], created["createdDate"]);

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().is_some());
    let (_, list) = send(&app, "GET", "/api/todos", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn empty_text_is_rejected() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/api/todos", Some(json!({ "text": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please enter a task");

    let (_, list) = send(&app, "GET", "/api/todos", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn clear_completed_reports_count() {
    let app = app().await;
    for text in ["a", "b", "c"] {
        send(&app, "POST", "/api/todos", Some(json!({ "text": text }))).await;
    }
    let (_, list) = send(&app, "GET", "/api/todos", None).await;
    let newest = list[0]["id"].as_i64().unwrap();
    send(&app, "PUT", &format!("/api/todos/{newest}"), Some(json!({ "completed": true }))).await;

    let (status, body) = send(&app, "DELETE", "/api/todos", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    let (_, list) = send(&app, "GET", "/api/todos", None).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn import_then_export() {
    let app = app().await;
    let records = json!([
        { "id": 99, "text": "imported", "completed": true, "createdDate": 1_700_000_000_000_i64 },
        { "text": "second" }
    ]);
    let (status, created) = send(&app, "POST", "/api/todos/import", Some(records)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created.as_array().unwrap().len(), 2);
    assert_ne!(created[0]["id"], 99);
    assert_eq!(created[0]["createdDate"], 1_700_000_000_000_i64);
    assert!(created[0]["completedDate"].is_i64());

    let (status, _) = send(&app, "POST", "/api/todos/import", Some(json!([{ "details": "no text" }]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(Request::get("/api/todos/export").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"todos-"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let exported: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn view_and_homepage_render() {
    let app = app().await;
    send(&app, "POST", "/api/todos", Some(json!({ "text": "<script>x</script>" }))).await;

    let (status, view) = send(&app, "GET", "/api/view?status=active&period=month", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["layout"]["kind"], "calendar");
    assert_eq!(view["stats"]["total"], 1);

    let response = app
        .clone()
        .oneshot(Request::get("/?period=week").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>x</script>"));
}

#[tokio::test]
async fn health_is_ok() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
