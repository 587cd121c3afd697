//! Optimistic synchronization of the task collection.
//!
//! Every mutation follows the same sequence:
//!
//! 1. cancel in-flight refreshes and capture the current snapshot,
//! 2. apply the intended change to the cache,
//! 3. send the request through the transport,
//! 4. on failure, restore the captured snapshot,
//! 5. in every case, mark the cache stale and refetch.
//!
//! The caller receives the transport outcome of step 3. A failed refetch in
//! step 5 is recorded on the snapshot and logged, never returned.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use super::cache::{CacheEdit, CacheSnapshot, CachedTask, TaskCache};
use super::transport::{
    HttpTaskTransport, LocalTaskTransport, TaskTransport, TransportError, TransportFuture,
};
use crate::api::DeleteTaskResponse;
use crate::domain::{NewTask, Task, TaskId, TaskPatch, Timestamp};
use crate::infrastructure::TaskRepository;

// =============================================================================
// Mutation Kinds
// =============================================================================

/// The three mutations the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// `POST /tasks`
    Create,
    /// `PATCH /tasks/{id}`
    Update,
    /// `DELETE /tasks/{id}`
    Delete,
}

impl MutationKind {
    const COUNT: usize = 3;

    const fn index(self) -> usize {
        match self {
            Self::Create => 0,
            Self::Update => 1,
            Self::Delete => 2,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        formatter.write_str(name)
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors reported by [`TaskSync`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A mutation request failed; the cache was rolled back.
    #[error("Failed to {kind} task: {source}")]
    Mutation {
        /// Which mutation failed.
        kind: MutationKind,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// Fetching the collection failed.
    #[error("Failed to fetch tasks: {0}")]
    Refresh(#[source] TransportError),
}

impl SyncError {
    /// The transport failure behind this error.
    #[must_use]
    pub const fn transport_error(&self) -> &TransportError {
        match self {
            Self::Mutation { source, .. } | Self::Refresh(source) => source,
        }
    }
}

// =============================================================================
// Pending Mutations
// =============================================================================

/// In-flight mutation counters, one per kind.
#[derive(Debug, Default)]
struct PendingMutations {
    counts: [AtomicUsize; MutationKind::COUNT],
}

impl PendingMutations {
    fn begin(&self, kind: MutationKind) -> PendingGuard<'_> {
        let counter = &self.counts[kind.index()];
        counter.fetch_add(1, Ordering::AcqRel);
        PendingGuard { counter }
    }

    fn is_pending(&self, kind: MutationKind) -> bool {
        self.counts[kind.index()].load(Ordering::Acquire) > 0
    }
}

/// Decrements its counter when the mutation finishes, including on cancellation.
struct PendingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

// =============================================================================
// TaskSync
// =============================================================================

/// Client-side view of the task collection, kept in sync with the server.
///
/// Clones share the same cache and transport.
///
/// # Example
///
/// ```no_run
/// use todo_sync::client::TaskSync;
/// use todo_sync::domain::{NewTask, TaskPatch};
///
/// # async fn example() -> Result<(), todo_sync::client::SyncError> {
/// let sync = TaskSync::http("http://localhost:3000");
/// sync.load().await?;
///
/// let task = sync.create(NewTask::new("Buy milk", None)).await?;
/// sync.update(task.id, TaskPatch::completed(true)).await?;
///
/// assert_eq!(sync.completed_tasks().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaskSync {
    transport: Arc<dyn TaskTransport>,
    cache: Arc<TaskCache>,
    pending: Arc<PendingMutations>,
}

impl fmt::Debug for TaskSync {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TaskSync")
            .field("transport", &"Arc<dyn TaskTransport>")
            .field("cache", &self.cache)
            .field("pending", &self.pending)
            .finish()
    }
}

impl TaskSync {
    /// Creates a synchronizer over `transport` with an empty cache.
    #[must_use]
    pub fn new(transport: Arc<dyn TaskTransport>) -> Self {
        Self {
            transport,
            cache: Arc::new(TaskCache::new()),
            pending: Arc::new(PendingMutations::default()),
        }
    }

    /// Creates a synchronizer talking HTTP to the server at `base_url`.
    #[must_use]
    pub fn http(base_url: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpTaskTransport::new(base_url)))
    }

    /// Creates a synchronizer calling `repository` in-process.
    #[must_use]
    pub fn local(repository: Arc<dyn TaskRepository>) -> Self {
        Self::new(Arc::new(LocalTaskTransport::new(repository)))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.cache.snapshot()
    }

    /// Every cached task.
    pub fn todos(&self) -> Vec<CachedTask> {
        self.snapshot().tasks().to_vec()
    }

    /// Cached tasks that are not completed.
    pub fn active_tasks(&self) -> Vec<CachedTask> {
        self.snapshot().active_tasks().into_iter().cloned().collect()
    }

    /// Cached tasks that are completed.
    pub fn completed_tasks(&self) -> Vec<CachedTask> {
        self.snapshot()
            .completed_tasks()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Returns true while a mutation of `kind` is in flight.
    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.pending.is_pending(kind)
    }

    /// Fetches the collection. Same as [`refresh`](Self::refresh).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Refresh`] if the fetch fails.
    pub async fn load(&self) -> Result<Arc<CacheSnapshot>, SyncError> {
        self.refresh().await
    }

    /// Fetches the collection and replaces the cached contents.
    ///
    /// A fetch overtaken by a mutation is discarded, and the current snapshot
    /// is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Refresh`] if the fetch fails. The message is also
    /// recorded on the snapshot.
    pub async fn refresh(&self) -> Result<Arc<CacheSnapshot>, SyncError> {
        let epoch = self.cache.fetch_epoch();
        let result = self.transport.fetch_tasks().await;

        match result {
            Ok(tasks) => {
                let count = tasks.len();
                if let Some(snapshot) = self.cache.replace_if_current(epoch, tasks) {
                    tracing::debug!(count, version = snapshot.version(), "Tasks refreshed");
                    Ok(snapshot)
                } else {
                    tracing::debug!(epoch, "Discarded superseded task fetch");
                    Ok(self.cache.snapshot())
                }
            }
            Err(error) => {
                if self.cache.is_current_fetch(epoch) {
                    self.cache.record_error(&error.to_string());
                }
                tracing::warn!(error = %error, "Task fetch failed");
                Err(SyncError::Refresh(error))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Creates a task, showing a placeholder until the server answers.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Mutation`] if the request fails.
    pub async fn create(&self, new_task: NewTask) -> Result<Task, SyncError> {
        let placeholder = CachedTask::placeholder(&new_task, Timestamp::now());
        let call = self.transport.create_task(new_task);
        self.mutate(MutationKind::Create, CacheEdit::Append(placeholder), call)
            .await
    }

    /// Applies `patch` to the task `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Mutation`] if the request fails.
    pub async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task, SyncError> {
        let call = self.transport.update_task(id, patch.clone());
        self.mutate(MutationKind::Update, CacheEdit::Merge(id, patch), call)
            .await
    }

    /// Deletes the task `id`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Mutation`] if the request fails.
    pub async fn delete(&self, id: TaskId) -> Result<DeleteTaskResponse, SyncError> {
        let call = self.transport.delete_task(id);
        self.mutate(MutationKind::Delete, CacheEdit::Remove(id), call)
            .await
    }

    /// Runs one optimistic mutation. `call` must not have been polled yet.
    async fn mutate<T>(
        &self,
        kind: MutationKind,
        edit: CacheEdit,
        call: TransportFuture<T>,
    ) -> Result<T, SyncError> {
        let _pending = self.pending.begin(kind);

        self.cache.cancel_fetches();
        let captured = self.cache.apply(&edit);
        tracing::debug!(%kind, captured_version = captured.version(), "Applied optimistic edit");

        let outcome = call.await;

        if let Err(error) = &outcome {
            tracing::warn!(%kind, error = %error, "Mutation failed, rolling back");
            self.cache.rollback(captured);
        }

        self.settle(kind).await;

        outcome.map_err(|source| SyncError::Mutation { kind, source })
    }

    /// Marks the cache stale and refetches.
    async fn settle(&self, kind: MutationKind) {
        self.cache.invalidate();
        if let Err(error) = self.refresh().await {
            tracing::warn!(%kind, error = %error, "Refresh after mutation failed");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
