//! Data Transfer Objects for API requests and responses.
//!
//! Request bodies are typed: a field of the wrong JSON type, a missing
//! required field, or malformed JSON is rejected by the extractor before a
//! handler runs. Unknown fields are ignored. Task records are returned in
//! their domain shape (see [`Task`](crate::domain::Task)).

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::domain::{NewTask, TaskPatch};

// =============================================================================
// Task DTOs
// =============================================================================

/// Request DTO for `POST /tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// Title of the task.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(request: CreateTaskRequest) -> Self {
        Self::new(request.title, request.description)
    }
}

/// Request DTO for `PATCH /tasks/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    /// New title for the task.
    #[serde(default)]
    pub title: Option<String>,
    /// New completion flag.
    #[serde(default)]
    pub completed: Option<bool>,
}

impl UpdateTaskRequest {
    /// Checks field constraints and produces the domain patch.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if a supplied title is empty.
    pub fn validate(self) -> Result<TaskPatch, ValidationError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        Ok(TaskPatch {
            title: self.title,
            completed: self.completed,
        })
    }
}

/// Response DTO for `DELETE /tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTaskResponse {
    /// Confirmation message.
    pub message: String,
}

impl DeleteTaskResponse {
    /// The confirmation returned after a successful delete.
    #[must_use]
    pub fn deleted() -> Self {
        Self {
            message: "Task deleted successfully".to_string(),
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validates a task title. The title is stored exactly as sent.
///
/// # Errors
///
/// Returns [`ValidationError`] naming the `title` field if it is empty.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.is_empty() {
        return Err(ValidationError::single("title", "Title is required"));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
