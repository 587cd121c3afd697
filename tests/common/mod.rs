//! Common test helpers for integration tests.
//!
//! # Note
//!
//! The `#![allow(dead_code)]` attribute is necessary because Rust compiles each
//! integration test file as a separate crate. Helpers used by only one test
//! file would otherwise generate dead code warnings in the others.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use todo_sync::api::{AppState, router};
use todo_sync::domain::{NewTask, Task, TaskId, TaskPatch};
use todo_sync::infrastructure::{InMemoryTaskRepository, RepositoryFuture, TaskRepository};

// =============================================================================
// Counting Repository
// =============================================================================

/// In-memory repository that counts every call made to it.
#[derive(Debug, Default)]
pub struct CountingRepository {
    inner: InMemoryTaskRepository,
    calls: AtomicUsize,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repository calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl TaskRepository for CountingRepository {
    fn list(&self) -> RepositoryFuture<Vec<Task>> {
        self.record();
        self.inner.list()
    }

    fn create(&self, new_task: NewTask) -> RepositoryFuture<Task> {
        self.record();
        self.inner.create(new_task)
    }

    fn update(&self, id: TaskId, patch: TaskPatch) -> RepositoryFuture<Task> {
        self.record();
        self.inner.update(id, patch)
    }

    fn delete(&self, id: TaskId) -> RepositoryFuture<Task> {
        self.record();
        self.inner.delete(id)
    }
}

/// Builds a router over a fresh counting repository.
pub fn counting_app() -> (Router, Arc<CountingRepository>) {
    let repository = Arc::new(CountingRepository::new());
    let state = AppState::new(Arc::clone(&repository) as Arc<dyn TaskRepository>);
    (router(state), repository)
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Sends one request through `app` and returns the status and JSON body.
///
/// An empty body is returned as `Value::Null`.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(body.map_or_else(Body::empty, |body| Body::from(body.to_string())))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

// =============================================================================
// Live Server
// =============================================================================

/// Serves `state` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(state: AppState) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let application = router(state);

    let handle = tokio::spawn(async move {
        axum::serve(listener, application).await.unwrap();
    });

    (format!("http://{address}"), handle)
}
