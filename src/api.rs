//! JSON REST surface over a [`TaskStore`].
//!
//! Every handler returns `Result<_, StoreError>`; [`StoreError`] implements
//! [`IntoResponse`] so failures become a JSON body with a matching status.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::config::Config;
use crate::error::StoreError;
use crate::filter::{PeriodFilter, StatusFilter};
use crate::store::{Backend, TaskStore};
use crate::task::{NewTask, Task, TaskId, TaskPatch};
use crate::transfer::{self, ImportRecord};
use crate::view::{self, View};

pub struct AppState<B> {
    pub store: TaskStore<B>,
}

impl<B: Backend> AppState<B> {
    pub fn new(store: TaskStore<B>) -> Self {
        Self { store }
    }
}

pub type SharedState<B> = Arc<AppState<B>>;

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            StoreError::Validation(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            StoreError::Storage { cause, source } => {
                error!(cause = cause.code(), error = %source, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": cause.to_string(), "details": cause.code() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Task id from the URL. An id that is not a number names no task, so it is
/// answered with 404 like any other unknown id.
#[derive(Debug, Clone, Copy)]
pub struct TaskPath(pub TaskId);

impl<S: Send + Sync> FromRequestParts<S> for TaskPath {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| error_body(rejection.status(), rejection.body_text()))?;
        raw.trim()
            .parse()
            .map(TaskPath)
            .map_err(|_| error_body(StatusCode::NOT_FOUND, format!("Task {raw} not found")))
    }
}

/// `Json` whose rejections carry the same `{"error": ...}` body as every
/// other API failure.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| error_body(rejection.status(), rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

pub fn router<B: Backend>() -> Router<SharedState<B>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/todos", get(list_tasks::<B>).post(create_task::<B>).delete(clear_completed::<B>))
        .route("/api/todos/export", get(export_tasks::<B>))
        .route("/api/todos/import", post(import_tasks::<B>))
        .route(
            "/api/todos/{id}",
            get(get_task::<B>).put(update_task::<B>).delete(delete_task::<B>),
        )
        .route("/api/view", get(get_view::<B>))
}

/// Wildcard unless `TODOS_CORS_ORIGINS` lists explicit origins.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// GET /api/todos
pub async fn list_tasks<B: Backend>(State(state): State<SharedState<B>>) -> Result<Json<Vec<Task>>, StoreError> {
    Ok(Json(state.store.list().await?))
}

// GET /api/todos/{id}
pub async fn get_task<B: Backend>(
    State(state): State<SharedState<B>>,
    TaskPath(id): TaskPath,
) -> Result<Json<Task>, StoreError> {
    Ok(Json(state.store.get(id).await?))
}

// POST /api/todos
pub async fn create_task<B: Backend>(
    State(state): State<SharedState<B>>,
    ApiJson(new): ApiJson<NewTask>,
) -> Result<(StatusCode, Json<Task>), StoreError> {
    let task = state.store.create(new).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

// PUT /api/todos/{id}
pub async fn update_task<B: Backend>(
    State(state): State<SharedState<B>>,
    TaskPath(id): TaskPath,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> Result<Json<Task>, StoreError> {
    Ok(Json(state.store.update(id, patch).await?))
}

// DELETE /api/todos/{id}
pub async fn delete_task<B: Backend>(
    State(state): State<SharedState<B>>,
    TaskPath(id): TaskPath,
) -> Result<Json<Value>, StoreError> {
    state.store.delete(id).await?;
    Ok(Json(json!({ "message": format!("Task {id} deleted") })))
}

// DELETE /api/todos
pub async fn clear_completed<B: Backend>(State(state): State<SharedState<B>>) -> Result<Json<Value>, StoreError> {
    let count = state.store.clear_completed().await?;
    Ok(Json(json!({
        "message": format!("Deleted {count} completed task(s)"),
        "count": count,
    })))
}

// GET /api/todos/export
pub async fn export_tasks<B: Backend>(State(state): State<SharedState<B>>) -> Result<Response, StoreError> {
    let tasks = state.store.list().await?;
    let body = transfer::export_json(&tasks)?;
    let filename = format!("todos-{}.json", state.store.now().format("%Y-%m-%d"));
    let disposition = format!("attachment; filename=\"{filename}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

// POST /api/todos/import
pub async fn import_tasks<B: Backend>(
    State(state): State<SharedState<B>>,
    ApiJson(records): ApiJson<Vec<ImportRecord>>,
) -> Result<(StatusCode, Json<Vec<Task>>), StoreError> {
    let created = transfer::import(&state.store, records).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub status: Option<String>,
    pub period: Option<String>,
}

impl ViewQuery {
    /// Unknown values fall back to `all`.
    pub fn filters(&self) -> (StatusFilter, PeriodFilter) {
        let status = parse_or_default(self.status.as_deref());
        let period = parse_or_default(self.period.as_deref());
        (status, period)
    }
}

fn parse_or_default<T>(raw: Option<&str>) -> T
where
    T: std::str::FromStr<Err = String> + Default,
{
    match raw.map(str::parse) {
        Some(Ok(value)) => value,
        Some(Err(reason)) => {
            warn!(%reason, "ignoring filter");
            T::default()
        }
        None => T::default(),
    }
}

// GET /api/view?status=&period=
pub async fn get_view<B: Backend>(
    State(state): State<SharedState<B>>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<View>, StoreError> {
    let (status, period) = query.filters();
    let tasks = state.store.list().await?;
    Ok(Json(view::build_view(&tasks, status, period, &state.store.now())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageCause;
    use crate::store::sqlite::SqliteBackend;
    use http_body_util::BodyExt;

    async fn state() -> SharedState<SqliteBackend> {
        let backend = SqliteBackend::in_memory().await.unwrap();
        Arc::new(AppState::new(TaskStore::new(backend, chrono_tz::UTC)))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_response_has_ok_status() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn missing_task_is_404_with_error_field() {
        let err = get_task(State(state().await), TaskPath(99)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Task 99 not found");
    }

    #[tokio::test]
    async fn storage_errors_carry_cause_code() {
        let err = StoreError::storage(StorageCause::MissingSchema, std::io::Error::other("no such table: todos"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["details"], "missing_schema");
        assert!(body["error"].as_str().unwrap().contains("todos table"));
    }

    #[tokio::test]
    async fn create_returns_201_and_empty_text_is_400() {
        let state = state().await;
        let (status, Json(task)) = create_task(State(state.clone()), ApiJson(NewTask::new("buy milk")))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task.text, "buy milk");

        let err = create_task(State(state), ApiJson(NewTask::new("   "))).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn clear_reports_count() {
        let state = state().await;
        let task = state.store.create(NewTask::new("done")).await.unwrap();
        state.store.update(task.id, TaskPatch::completed(true)).await.unwrap();
        state.store.create(NewTask::new("open")).await.unwrap();

        let Json(body) = clear_completed(State(state.clone())).await.unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(state.store.list().await.unwrap().len(), 1);
    }

    #[test]
    fn unknown_view_filters_fall_back_to_all() {
        let query = ViewQuery {
            status: Some("active".into()),
            period: Some("decade".into()),
        };
        assert_eq!(query.filters(), (StatusFilter::Active, PeriodFilter::All));
    }
}
