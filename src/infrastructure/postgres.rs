//! `PostgreSQL` repository implementation.
//!
//! Uses `sqlx` with a connection pool. Every statement is a single round trip:
//! `UPDATE ... RETURNING` and `DELETE ... RETURNING` report a missing row as
//! `RepositoryError::NotFound`.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS tasks (
//!     id BIGSERIAL PRIMARY KEY,
//!     title TEXT NOT NULL,
//!     description TEXT,
//!     completed BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks (created_at DESC);
//! ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{NewTask, Task, TaskId, TaskPatch, Timestamp};
use crate::infrastructure::{RepositoryError, RepositoryFuture, TaskRepository};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS tasks (\
     id BIGSERIAL PRIMARY KEY, \
     title TEXT NOT NULL, \
     description TEXT, \
     completed BOOLEAN NOT NULL DEFAULT FALSE, \
     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(), \
     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW())";

const CREATE_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks (created_at DESC)";

const TASK_COLUMNS: &str = "id, title, description, completed, created_at, updated_at";

/// Row shape of the `tasks` table.
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: TaskId::new(row.id),
            title: row.title,
            description: row.description,
            completed: row.completed,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

fn database_error(error: &sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(error.to_string())
}

/// `PostgreSQL` implementation of `TaskRepository`.
///
/// # Example
///
/// ```ignore
/// let pool = PgPool::connect("postgres://localhost/todos").await?;
/// let repository = PostgresTaskRepository::new(pool);
/// repository.ensure_schema().await?;
/// let task = repository.create(NewTask::new("A", None)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository over the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `tasks` table and its index if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DatabaseError` if either statement fails.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&self.pool)
            .await
            .map_err(|error| database_error(&error))?;
        sqlx::query(CREATE_INDEX_SQL)
            .execute(&self.pool)
            .await
            .map_err(|error| database_error(&error))?;
        Ok(())
    }

    async fn select_all(pool: PgPool) -> Result<Vec<Task>, RepositoryError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&pool)
        .await
        .map_err(|error| database_error(&error))?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn insert(pool: PgPool, new_task: NewTask) -> Result<Task, RepositoryError> {
        let row: TaskRow = sqlx::query_as(&format!(
            "INSERT INTO tasks (title, description) VALUES ($1, $2) RETURNING {TASK_COLUMNS}"
        ))
        .bind(&new_task.title)
        .bind(&new_task.description)
        .fetch_one(&pool)
        .await
        .map_err(|error| database_error(&error))?;

        Ok(row.into())
    }

    async fn update_by_key(
        pool: PgPool,
        id: TaskId,
        patch: TaskPatch,
    ) -> Result<Task, RepositoryError> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            "UPDATE tasks SET title = COALESCE($1, title), \
             completed = COALESCE($2, completed), updated_at = NOW() \
             WHERE id = $3 RETURNING {TASK_COLUMNS}"
        ))
        .bind(&patch.title)
        .bind(patch.completed)
        .bind(id.get())
        .fetch_optional(&pool)
        .await
        .map_err(|error| database_error(&error))?;

        row.map(Task::from).ok_or(RepositoryError::NotFound(id))
    }

    async fn delete_by_key(pool: PgPool, id: TaskId) -> Result<Task, RepositoryError> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            "DELETE FROM tasks WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id.get())
        .fetch_optional(&pool)
        .await
        .map_err(|error| database_error(&error))?;

        row.map(Task::from).ok_or(RepositoryError::NotFound(id))
    }
}

impl TaskRepository for PostgresTaskRepository {
    fn list(&self) -> RepositoryFuture<Vec<Task>> {
        Box::pin(Self::select_all(self.pool.clone()))
    }

    fn create(&self, new_task: NewTask) -> RepositoryFuture<Task> {
        Box::pin(Self::insert(self.pool.clone(), new_task))
    }

    fn update(&self, id: TaskId, patch: TaskPatch) -> RepositoryFuture<Task> {
        Box::pin(Self::update_by_key(self.pool.clone(), id, patch))
    }

    fn delete(&self, id: TaskId) -> RepositoryFuture<Task> {
        Box::pin(Self::delete_by_key(self.pool.clone(), id))
    }
}
