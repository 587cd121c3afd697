//! API module for HTTP handlers.
//!
//! This module contains route definitions and request/response handlers.

pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;

use axum::Router;
use axum::routing::{get, patch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use dto::{CreateTaskRequest, DeleteTaskResponse, UpdateTaskRequest, validate_title};
pub use error::{ApiError, ApiErrorResponse, FieldError, ValidationError};
pub use extract::{JsonBody, TaskIdPath};
pub use handlers::{
    AppState, HealthResponse, create_task, delete_task, health_check, list_tasks, update_task,
};

/// Builds the application router with tracing and permissive CORS.
///
/// | Method & Path        | Handler          |
/// |----------------------|------------------|
/// | `GET /health`        | [`health_check`] |
/// | `GET /tasks`         | [`list_tasks`]   |
/// | `POST /tasks`        | [`create_task`]  |
/// | `PATCH /tasks/{id}`  | [`update_task`]  |
/// | `DELETE /tasks/{id}` | [`delete_task`]  |
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", patch(update_task).delete(delete_task))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
