//! HTTP handlers for the task endpoints.
//!
//! Handlers are stateless: each one validates its input, makes a single
//! repository call, and converts the outcome into a response. Validation
//! failures short-circuit before the repository is touched.

use std::sync::Arc;

use axum::{Json, extract::State};

use super::dto::{CreateTaskRequest, DeleteTaskResponse, UpdateTaskRequest};
use super::error::ApiErrorResponse;
use super::extract::{JsonBody, TaskIdPath};
use crate::domain::{NewTask, Task};
use crate::infrastructure::{InMemoryTaskRepository, Repositories, TaskRepository};

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
#[derive(Clone)]
pub struct AppState {
    /// Task repository for persistence.
    pub task_repository: Arc<dyn TaskRepository>,
}

impl AppState {
    /// Creates a new `AppState` around the given repository.
    #[must_use]
    pub fn new(task_repository: Arc<dyn TaskRepository>) -> Self {
        Self { task_repository }
    }

    /// Creates a new `AppState` from initialized repositories.
    #[must_use]
    pub fn from_repositories(repositories: Repositories) -> Self {
        Self::new(repositories.task_repository)
    }

    /// Creates an `AppState` backed by a fresh in-memory repository.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryTaskRepository::new()))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppState")
            .field("task_repository", &"Arc<dyn TaskRepository>")
            .finish()
    }
}

// =============================================================================
// GET /tasks
// =============================================================================

/// Lists every task, newest first.
///
/// # Errors
///
/// Returns `500 Internal Server Error` if the repository fails.
pub async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiErrorResponse> {
    let tasks = state.task_repository.list().await?;
    tracing::debug!(count = tasks.len(), "Listed tasks");
    Ok(Json(tasks))
}

// =============================================================================
// POST /tasks
// =============================================================================

/// Creates a task.
///
/// # Request Body
///
/// ```json
/// { "title": "Task title", "description": "Optional description" }
/// ```
///
/// # Errors
///
/// - **400 Bad Request**: body is not a `{title, description?}` object
/// - **500 Internal Server Error**: repository operation failed
pub async fn create_task(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateTaskRequest>,
) -> Result<Json<Task>, ApiErrorResponse> {
    let task = state
        .task_repository
        .create(NewTask::from(request))
        .await?;

    tracing::info!(task_id = %task.id, "Task created");
    Ok(Json(task))
}

// =============================================================================
// PATCH /tasks/{id}
// =============================================================================

/// Applies a partial update (`title?`, `completed?`) to a task.
///
/// # Errors
///
/// - **400 Bad Request**: malformed id, malformed body, or invalid title
/// - **500 Internal Server Error**: task missing or repository failure
pub async fn update_task(
    State(state): State<AppState>,
    TaskIdPath(task_id): TaskIdPath,
    JsonBody(request): JsonBody<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiErrorResponse> {
    let patch = request.validate()?;

    let task = state.task_repository.update(task_id, patch).await?;

    tracing::info!(task_id = %task.id, completed = task.completed, "Task updated");
    Ok(Json(task))
}

// =============================================================================
// DELETE /tasks/{id}
// =============================================================================

/// Deletes a task.
///
/// # Errors
///
/// - **400 Bad Request**: malformed id
/// - **500 Internal Server Error**: task missing or repository failure
pub async fn delete_task(
    State(state): State<AppState>,
    TaskIdPath(task_id): TaskIdPath,
) -> Result<Json<DeleteTaskResponse>, ApiErrorResponse> {
    state.task_repository.delete(task_id).await?;

    tracing::info!(task_id = %task_id, "Task deleted");
    Ok(Json(DeleteTaskResponse::deleted()))
}

// =============================================================================
// GET /health
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// Tests
// =============================================================================
