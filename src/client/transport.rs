//! Client-side access to the task endpoints.
//!
//! [`TaskTransport`] is the seam [`TaskSync`](super::TaskSync) talks through.
//! [`HttpTaskTransport`] speaks HTTP with `reqwest`; [`LocalTaskTransport`]
//! calls a repository in-process and is what tests and embedded use reach
//! for.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::{ApiError, DeleteTaskResponse};
use crate::domain::{NewTask, Task, TaskId, TaskPatch};
use crate::infrastructure::{RepositoryError, TaskRepository};

/// Default timeout applied to every HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Error Types
// =============================================================================

/// Failure of a transport call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The server's `error` message, or the status reason.
        message: String,
    },

    /// The request could not be completed.
    #[error("Request failed: {0}")]
    Request(String),

    /// Request timed out.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// The response body was not the expected JSON.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status of a `Status` error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<RepositoryError> for TransportError {
    fn from(error: RepositoryError) -> Self {
        Self::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            message: error.to_string(),
        }
    }
}

/// Boxed future returned by [`TaskTransport`] methods.
pub type TransportFuture<T> = BoxFuture<'static, Result<T, TransportError>>;

// =============================================================================
// TaskTransport Trait
// =============================================================================

/// The four calls the client makes against the task endpoints.
///
/// Returned futures are lazy: nothing is sent until they are polled.
pub trait TaskTransport: Send + Sync {
    /// `GET /tasks`
    fn fetch_tasks(&self) -> TransportFuture<Vec<Task>>;

    /// `POST /tasks`
    fn create_task(&self, new_task: NewTask) -> TransportFuture<Task>;

    /// `PATCH /tasks/{id}`
    fn update_task(&self, id: TaskId, patch: TaskPatch) -> TransportFuture<Task>;

    /// `DELETE /tasks/{id}`
    fn delete_task(&self, id: TaskId) -> TransportFuture<DeleteTaskResponse>;
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// [`TaskTransport`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTaskTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTaskTransport {
    /// Creates a transport for the server at `base_url` (e.g. `http://localhost:3000`).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a transport that reuses an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Returns a transport using `timeout` for every request.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/tasks", self.base_url)
    }

    fn item_url(&self, id: TaskId) -> String {
        format!("{}/tasks/{id}", self.base_url)
    }
}

impl TaskTransport for HttpTaskTransport {
    fn fetch_tasks(&self) -> TransportFuture<Vec<Task>> {
        let request = self.client.get(self.collection_url()).timeout(self.timeout);
        Box::pin(execute(request, self.timeout))
    }

    fn create_task(&self, new_task: NewTask) -> TransportFuture<Task> {
        let request = self
            .client
            .post(self.collection_url())
            .timeout(self.timeout)
            .json(&new_task);
        Box::pin(execute(request, self.timeout))
    }

    fn update_task(&self, id: TaskId, patch: TaskPatch) -> TransportFuture<Task> {
        let request = self
            .client
            .patch(self.item_url(id))
            .timeout(self.timeout)
            .json(&patch);
        Box::pin(execute(request, self.timeout))
    }

    fn delete_task(&self, id: TaskId) -> TransportFuture<DeleteTaskResponse> {
        let request = self.client.delete(self.item_url(id)).timeout(self.timeout);
        Box::pin(execute(request, self.timeout))
    }
}

/// Sends `request` and decodes a JSON success body.
async fn execute<T>(request: reqwest::RequestBuilder, timeout: Duration) -> Result<T, TransportError>
where
    T: DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(|error| classify(&error, timeout, TransportError::Request))?;

    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|error| classify(&error, timeout, TransportError::Decode));
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// Maps a reqwest failure. The request timeout also covers reading the body,
/// so a timeout is reported as such on either path.
#[allow(clippy::cast_possible_truncation)] // Timeout in ms will not exceed u64
fn classify(
    error: &reqwest::Error,
    timeout: Duration,
    otherwise: fn(String) -> TransportError,
) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout.as_millis() as u64)
    } else if error.is_connect() {
        TransportError::Request(format!("connection failed: {error}"))
    } else {
        otherwise(error.to_string())
    }
}

/// Builds a `Status` error from the `{"error": "..."}` body, falling back to
/// the status reason when the body is not in that shape.
fn status_error(status: StatusCode, body: &str) -> TransportError {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|api_error| api_error.error)
        .ok()
        .filter(|message| !message.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    TransportError::Status {
        status: status.as_u16(),
        message,
    }
}

// =============================================================================
// In-process Transport
// =============================================================================

/// [`TaskTransport`] that calls a repository directly.
///
/// Repository errors surface as `500` status errors, matching what the HTTP
/// endpoints answer.
#[derive(Clone)]
pub struct LocalTaskTransport {
    repository: Arc<dyn TaskRepository>,
}

impl LocalTaskTransport {
    /// Creates a transport over `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }
}

impl std::fmt::Debug for LocalTaskTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LocalTaskTransport")
            .field("repository", &"Arc<dyn TaskRepository>")
            .finish()
    }
}

impl TaskTransport for LocalTaskTransport {
    fn fetch_tasks(&self) -> TransportFuture<Vec<Task>> {
        let list = self.repository.list();
        Box::pin(async move { Ok(list.await?) })
    }

    fn create_task(&self, new_task: NewTask) -> TransportFuture<Task> {
        let create = self.repository.create(new_task);
        Box::pin(async move { Ok(create.await?) })
    }

    fn update_task(&self, id: TaskId, patch: TaskPatch) -> TransportFuture<Task> {
        let update = self.repository.update(id, patch);
        Box::pin(async move { Ok(update.await?) })
    }

    fn delete_task(&self, id: TaskId) -> TransportFuture<DeleteTaskResponse> {
        let delete = self.repository.delete(id);
        Box::pin(async move {
            delete.await?;
            Ok(DeleteTaskResponse::deleted())
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
