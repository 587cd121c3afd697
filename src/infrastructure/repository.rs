//! Repository trait for the task table.
//!
//! The repository is the persistence collaborator behind the HTTP endpoints.
//! Every method returns a boxed `'static` future so the trait stays
//! object-safe and can be shared as `Arc<dyn TaskRepository>`.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{NewTask, Task, TaskId, TaskPatch};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No task with the given id exists.
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    /// The backing store rejected or failed the operation.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Future returned by every repository operation.
pub type RepositoryFuture<T> = BoxFuture<'static, Result<T, RepositoryError>>;

// =============================================================================
// Task Repository
// =============================================================================

/// Record-oriented access to the task table.
///
/// # Example
///
/// ```ignore
/// let created = repository.create(NewTask::new("Buy milk", None)).await?;
/// let updated = repository.update(created.id, TaskPatch::completed(true)).await?;
/// repository.delete(updated.id).await?;
/// ```
pub trait TaskRepository: Send + Sync {
    /// Lists every task, newest first (by `created_at`, ties by `id`).
    fn list(&self) -> RepositoryFuture<Vec<Task>>;

    /// Inserts a new task and returns it with store-assigned fields.
    fn create(&self, new_task: NewTask) -> RepositoryFuture<Task>;

    /// Applies `patch` to the task with the given id and returns the result.
    ///
    /// Returns `RepositoryError::NotFound` if the task does not exist.
    fn update(&self, id: TaskId, patch: TaskPatch) -> RepositoryFuture<Task>;

    /// Deletes the task with the given id and returns the removed record.
    ///
    /// Returns `RepositoryError::NotFound` if the task does not exist.
    fn delete(&self, id: TaskId) -> RepositoryFuture<Task>;
}

/// Sorts tasks newest first: `created_at` descending, then `id` descending.
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| {
        right
            .created_at
            .cmp(&left.created_at)
            .then_with(|| right.id.cmp(&left.id))
    });
}

// =============================================================================
// Tests
// =============================================================================
