//! Task domain model.
//!
//! A task is the single managed entity: a title, an optional description,
//! a completion flag, and the two server-assigned timestamps.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Unique identifier for a task.
///
/// Assigned by the store on creation and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Creates a `TaskId` from a raw key.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw key.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Error returned when a path segment is not a well-formed task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid ID format")]
pub struct InvalidTaskId {
    /// The rejected input.
    pub input: String,
}

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| InvalidTaskId {
                input: value.to_string(),
            })
    }
}

/// A timestamp wrapper for `DateTime<Utc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    #[must_use]
    pub const fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Returns the inner `DateTime<Utc>`.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the current time as a `Timestamp`.
    ///
    /// **Note**: This reads the system clock; keep it at the edges
    /// (handlers, repositories) and pass the value inward.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0.to_rfc3339())
    }
}

// =============================================================================
// Task Entity
// =============================================================================

/// A persisted task.
///
/// Serialized with camelCase field names (`createdAt`, `updatedAt`), which is
/// the wire format of the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Title of the task.
    pub title: String,
    /// Optional detailed description.
    pub description: Option<String>,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Timestamp when the task was created.
    pub created_at: Timestamp,
    /// Timestamp when the task was last updated.
    pub updated_at: Timestamp,
}

impl Task {
    /// Creates a new, not yet completed task.
    ///
    /// Both timestamps are set to `timestamp`.
    #[must_use]
    pub fn new(id: TaskId, title: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            completed: false,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns a new task with the given description.
    #[must_use]
    pub fn with_description(self, description: Option<String>) -> Self {
        Self {
            description,
            ..self
        }
    }

    /// Returns a new task with the given completion flag.
    #[must_use]
    pub fn with_completed(self, completed: bool) -> Self {
        Self { completed, ..self }
    }

    /// Applies a partial update and stamps `updated_at`.
    #[must_use]
    pub fn apply(self, patch: &TaskPatch, now: Timestamp) -> Self {
        Self {
            title: patch.title.clone().unwrap_or(self.title),
            completed: patch.completed.unwrap_or(self.completed),
            updated_at: now,
            ..self
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// Data required to create a task. The store assigns everything else.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewTask {
    /// Title of the new task.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
}

impl NewTask {
    /// Creates a new task input.
    #[must_use]
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }
}

/// A partial update to a task. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    /// Replacement title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Replacement completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// A patch that only changes the completion flag.
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            title: None,
            completed: Some(completed),
        }
    }

    /// A patch that only changes the title.
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            completed: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
