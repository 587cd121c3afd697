//! Versioned snapshot cache of the task collection.
//!
//! The cache holds one immutable [`CacheSnapshot`] behind an [`ArcSwap`].
//! Readers get a cheap `Arc` to the current snapshot; writers build a new
//! snapshot and swap it in. The optimistic-update contract is expressed with
//! three operations:
//!
//! - [`TaskCache::apply`] stores the result of a [`CacheEdit`] and returns the
//!   snapshot it replaced,
//! - [`TaskCache::rollback`] reinstates a previously returned snapshot as is,
//! - [`TaskCache::invalidate`] marks the current contents stale.
//!
//! Edits are not serialized against each other. Two overlapping mutations can
//! interleave their applies and rollbacks.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::{ArcSwap, Guard};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{NewTask, Task, TaskId, TaskPatch, Timestamp};

// =============================================================================
// Cached Task
// =============================================================================

/// Identity of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKey {
    /// A record the server has confirmed.
    Persisted(TaskId),
    /// An optimistic placeholder with a local, non-durable identifier.
    Pending(Uuid),
}

/// One entry of the cached collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTask {
    /// Entry identity.
    pub key: TaskKey,
    /// Title of the task.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Completion flag.
    pub completed: bool,
    /// Creation time (local time for placeholders).
    pub created_at: Timestamp,
    /// Last update time (local time for placeholders).
    pub updated_at: Timestamp,
}

impl CachedTask {
    /// Builds a placeholder for a task that is being created.
    #[must_use]
    pub fn placeholder(new_task: &NewTask, now: Timestamp) -> Self {
        Self {
            key: TaskKey::Pending(Uuid::new_v4()),
            title: new_task.title.clone(),
            description: new_task.description.clone(),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Server id, or `None` for a placeholder.
    #[must_use]
    pub const fn id(&self) -> Option<TaskId> {
        match self.key {
            TaskKey::Persisted(id) => Some(id),
            TaskKey::Pending(_) => None,
        }
    }

    /// Returns true for an optimistic placeholder.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.key, TaskKey::Pending(_))
    }

    /// Merges a patch into this entry. Timestamps are left to the server.
    pub fn merge(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

impl From<Task> for CachedTask {
    fn from(task: Task) -> Self {
        Self {
            key: TaskKey::Persisted(task.id),
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

// =============================================================================
// Cache Edits
// =============================================================================

/// An optimistic change to the cached collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEdit {
    /// Append an entry at the end of the collection.
    Append(CachedTask),
    /// Merge a patch into the entry with the given id.
    Merge(TaskId, TaskPatch),
    /// Remove the entry with the given id.
    Remove(TaskId),
}

impl CacheEdit {
    /// Returns the edited collection. Edits naming an id that is not cached
    /// leave the collection unchanged.
    #[must_use]
    pub fn apply_to(&self, tasks: &[CachedTask]) -> Vec<CachedTask> {
        match self {
            Self::Append(entry) => {
                let mut edited = tasks.to_vec();
                edited.push(entry.clone());
                edited
            }
            Self::Merge(id, patch) => tasks
                .iter()
                .cloned()
                .map(|mut entry| {
                    if entry.id() == Some(*id) {
                        entry.merge(patch);
                    }
                    entry
                })
                .collect(),
            Self::Remove(id) => tasks
                .iter()
                .filter(|entry| entry.id() != Some(*id))
                .cloned()
                .collect(),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// An immutable view of the cache at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheSnapshot {
    version: u64,
    tasks: Vec<CachedTask>,
    loaded: bool,
    stale: bool,
    last_error: Option<String>,
}

impl CacheSnapshot {
    /// A snapshot holding `tasks`, as if freshly fetched.
    #[must_use]
    pub fn fetched(version: u64, tasks: Vec<CachedTask>) -> Self {
        Self {
            version,
            tasks,
            loaded: true,
            stale: false,
            last_error: None,
        }
    }

    /// Unique number of this snapshot within its cache.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Every cached entry, in cache order.
    #[must_use]
    pub fn tasks(&self) -> &[CachedTask] {
        &self.tasks
    }

    /// True once a fetch has succeeded.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True when the contents need a refresh from the server.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.stale
    }

    /// Message of the last failed fetch, cleared by a successful one.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Entries that are not completed.
    #[must_use]
    pub fn active_tasks(&self) -> Vec<&CachedTask> {
        self.tasks.iter().filter(|entry| !entry.completed).collect()
    }

    /// Entries that are completed.
    #[must_use]
    pub fn completed_tasks(&self) -> Vec<&CachedTask> {
        self.tasks.iter().filter(|entry| entry.completed).collect()
    }

    /// Looks up a persisted entry by id.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&CachedTask> {
        self.tasks.iter().find(|entry| entry.id() == Some(id))
    }

    fn successor(&self, version: u64) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }
}

// =============================================================================
// Task Cache
// =============================================================================

/// Owner of the current snapshot.
#[derive(Debug)]
pub struct TaskCache {
    current: ArcSwap<CacheSnapshot>,
    next_version: AtomicU64,
    fetch_epoch: AtomicU64,
}

impl Default for TaskCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskCache {
    /// Creates an empty, not yet loaded cache at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(CacheSnapshot::default()),
            next_version: AtomicU64::new(1),
            fetch_epoch: AtomicU64::new(0),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.current.load_full()
    }

    fn allocate_version(&self) -> u64 {
        self.next_version.fetch_add(1, Ordering::Relaxed)
    }

    /// Stores the result of `edit` and returns the snapshot it replaced.
    pub fn apply(&self, edit: &CacheEdit) -> Arc<CacheSnapshot> {
        self.current.rcu(|current| {
            let mut next = current.successor(self.allocate_version());
            next.tasks = edit.apply_to(&current.tasks);
            next
        })
    }

    /// Reinstates `snapshot` exactly as it was captured.
    pub fn rollback(&self, snapshot: Arc<CacheSnapshot>) {
        self.current.store(snapshot);
    }

    /// Marks the current contents stale.
    pub fn invalidate(&self) {
        self.current.rcu(|current| {
            let mut next = current.successor(self.allocate_version());
            next.stale = true;
            next
        });
    }

    /// Replaces the collection with server records.
    pub fn replace(&self, tasks: Vec<Task>) -> Arc<CacheSnapshot> {
        let snapshot = Arc::new(CacheSnapshot::fetched(
            self.allocate_version(),
            tasks.into_iter().map(CachedTask::from).collect(),
        ));
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Like [`replace`](Self::replace), but only while no cancellation has
    /// happened since `epoch` was taken. Returns `None` for a superseded fetch.
    pub fn replace_if_current(&self, epoch: u64, tasks: Vec<Task>) -> Option<Arc<CacheSnapshot>> {
        let entries: Vec<CachedTask> = tasks.into_iter().map(CachedTask::from).collect();
        let mut current = self.current.load_full();
        loop {
            if !self.is_current_fetch(epoch) {
                return None;
            }
            let next = Arc::new(CacheSnapshot::fetched(
                self.allocate_version(),
                entries.clone(),
            ));
            let previous = self.current.compare_and_swap(&current, Arc::clone(&next));
            if Arc::ptr_eq(&*previous, &current) {
                return Some(next);
            }
            current = Guard::into_inner(previous);
        }
    }

    /// Records a failed fetch on the current snapshot. Contents are kept.
    pub fn record_error(&self, message: &str) {
        self.current.rcu(|current| {
            let mut next = current.successor(self.allocate_version());
            next.last_error = Some(message.to_string());
            next
        });
    }

    /// Token identifying fetches started from now on.
    pub fn fetch_epoch(&self) -> u64 {
        self.fetch_epoch.load(Ordering::Acquire)
    }

    /// Makes every fetch started before this call obsolete.
    pub fn cancel_fetches(&self) {
        self.fetch_epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// True if no cancellation happened since `epoch` was taken.
    pub fn is_current_fetch(&self, epoch: u64) -> bool {
        self.fetch_epoch() == epoch
    }
}

// =============================================================================
// Tests
// =============================================================================
