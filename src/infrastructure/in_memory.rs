//! In-memory repository implementation.
//!
//! Suitable for development and tests. Ids are assigned from a monotonically
//! increasing counter, mirroring a `BIGSERIAL` column.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::{NewTask, Task, TaskId, TaskPatch, Timestamp};
use crate::infrastructure::{RepositoryError, RepositoryFuture, TaskRepository, sort_newest_first};

#[derive(Debug, Default)]
struct TaskTable {
    rows: BTreeMap<TaskId, Task>,
    last_id: i64,
}

/// In-memory implementation of `TaskRepository`.
///
/// Cloning shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    table: Arc<RwLock<TaskTable>>,
}

impl InMemoryTaskRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[allow(clippy::significant_drop_tightening)]
impl InMemoryTaskRepository {
    async fn list_rows(table: Arc<RwLock<TaskTable>>) -> Result<Vec<Task>, RepositoryError> {
        let guard = table.read().await;
        let mut tasks: Vec<Task> = guard.rows.values().cloned().collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn insert_row(
        table: Arc<RwLock<TaskTable>>,
        new_task: NewTask,
    ) -> Result<Task, RepositoryError> {
        let mut guard = table.write().await;
        let next_id = guard
            .last_id
            .checked_add(1)
            .ok_or_else(|| RepositoryError::DatabaseError("id sequence exhausted".into()))?;
        guard.last_id = next_id;

        let id = TaskId::new(next_id);
        let task =
            Task::new(id, new_task.title, Timestamp::now()).with_description(new_task.description);
        guard.rows.insert(id, task.clone());
        Ok(task)
    }

    async fn update_row(
        table: Arc<RwLock<TaskTable>>,
        id: TaskId,
        patch: TaskPatch,
    ) -> Result<Task, RepositoryError> {
        let mut guard = table.write().await;
        let row = guard.rows.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        *row = row.clone().apply(&patch, Timestamp::now());
        Ok(row.clone())
    }

    async fn delete_row(table: Arc<RwLock<TaskTable>>, id: TaskId) -> Result<Task, RepositoryError> {
        let mut guard = table.write().await;
        guard.rows.remove(&id).ok_or(RepositoryError::NotFound(id))
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn list(&self) -> RepositoryFuture<Vec<Task>> {
        Box::pin(Self::list_rows(Arc::clone(&self.table)))
    }

    fn create(&self, new_task: NewTask) -> RepositoryFuture<Task> {
        Box::pin(Self::insert_row(Arc::clone(&self.table), new_task))
    }

    fn update(&self, id: TaskId, patch: TaskPatch) -> RepositoryFuture<Task> {
        Box::pin(Self::update_row(Arc::clone(&self.table), id, patch))
    }

    fn delete(&self, id: TaskId) -> RepositoryFuture<Task> {
        Box::pin(Self::delete_row(Arc::clone(&self.table), id))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn repository() -> InMemoryTaskRepository {
        InMemoryTaskRepository::new()
    }

    #[rstest]
    #[tokio::test]
    async fn test_create_assigns_sequential_ids(repository: InMemoryTaskRepository) {
        let first = repository.create(NewTask::new("A", None)).await.unwrap();
        let second = repository
            .create(NewTask::new("B", Some("details".into())))
            .await
            .unwrap();

        assert_eq!(first.id, TaskId::new(1));
        assert_eq!(second.id, TaskId::new(2));
        assert!(!second.completed);
        assert_eq!(second.description.as_deref(), Some("details"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_list_is_newest_first(repository: InMemoryTaskRepository) {
        for title in ["first", "second", "third"] {
            repository.create(NewTask::new(title, None)).await.unwrap();
        }

        let titles: Vec<String> = repository
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|task| task.title)
            .collect();

        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_update_applies_patch(repository: InMemoryTaskRepository) {
        let created = repository.create(NewTask::new("A", None)).await.unwrap();

        let updated = repository
            .update(created.id, TaskPatch::completed(true))
            .await
            .unwrap();

        assert!(updated.completed);
        assert_eq!(updated.title, "A");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[rstest]
    #[tokio::test]
    async fn test_update_missing_task_is_not_found(repository: InMemoryTaskRepository) {
        let result = repository
            .update(TaskId::new(99), TaskPatch::title("x"))
            .await;

        assert_eq!(result, Err(RepositoryError::NotFound(TaskId::new(99))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_delete_removes_task(repository: InMemoryTaskRepository) {
        let created = repository.create(NewTask::new("A", None)).await.unwrap();

        let deleted = repository.delete(created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(repository.list().await.unwrap().is_empty());

        let again = repository.delete(created.id).await;
        assert_eq!(again, Err(RepositoryError::NotFound(created.id)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete(repository: InMemoryTaskRepository) {
        let first = repository.create(NewTask::new("A", None)).await.unwrap();
        repository.delete(first.id).await.unwrap();

        let second = repository.create(NewTask::new("B", None)).await.unwrap();
        assert_ne!(first.id, second.id);
    }
}
