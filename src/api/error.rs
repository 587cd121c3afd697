//! API error handling.
//!
//! Every failure leaving a handler is an [`ApiErrorResponse`]. Identifier and
//! validation failures become `400 Bad Request`; everything else, including a
//! missing task, becomes `500 Internal Server Error`. The body is always
//! `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::domain::InvalidTaskId;
use crate::infrastructure::RepositoryError;

/// Message used when an error carries no text of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "Unknown error occurred";

// =============================================================================
// API Error
// =============================================================================

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message.
    pub error: String,
    /// Field-level errors for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ApiError {
    /// Creates a new API error, substituting the fallback for an empty message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error: if message.trim().is_empty() {
                FALLBACK_ERROR_MESSAGE.to_string()
            } else {
                message
            },
            details: None,
        }
    }

    /// Creates a validation error with field-level details.
    #[must_use]
    pub fn validation(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self {
            details: Some(details),
            ..Self::new(message)
        }
    }
}

/// Field-level error for validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field that failed validation.
    pub field: String,
    /// Error message for this field.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// API Error Response
// =============================================================================

/// API error response containing status code and error body.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Creates a new API error response.
    #[must_use]
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    /// Creates a 400 Bad Request response.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiError::new(message))
    }

    /// Creates a 400 Bad Request response for validation errors.
    #[must_use]
    pub fn validation_error(message: impl Into<String>, details: Vec<FieldError>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ApiError::validation(message, details),
        )
    }

    /// Creates a 500 Internal Server Error response.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiError::new(message))
    }

    /// Returns true for 4xx responses.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        tracing::error!(
            status = self.status.as_u16(),
            error = %self.error.error,
            "API error"
        );
        (self.status, Json(self.error)).into_response()
    }
}

// A missing task answers 500, the same as any other store failure.
impl From<RepositoryError> for ApiErrorResponse {
    fn from(error: RepositoryError) -> Self {
        Self::internal_error(error.to_string())
    }
}

impl From<InvalidTaskId> for ApiErrorResponse {
    fn from(error: InvalidTaskId) -> Self {
        Self::bad_request(error.to_string())
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiErrorResponse {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-level validation failures collected before any domain logic runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field-level errors.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Creates a validation error with a single field error.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }
}

impl From<ValidationError> for ApiErrorResponse {
    fn from(error: ValidationError) -> Self {
        let message = error
            .errors
            .first()
            .map_or_else(|| "Validation failed".to_string(), |first| first.message.clone());
        Self::validation_error(message, error.errors)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;
    use http_body_util::BodyExt;
    use rstest::rstest;

    #[rstest]
    fn test_api_error_new_keeps_message() {
        let error = ApiError::new("Database error: boom");
        assert_eq!(error.error, "Database error: boom");
        assert!(error.details.is_none());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_api_error_new_uses_fallback(#[case] message: &str) {
        assert_eq!(ApiError::new(message).error, FALLBACK_ERROR_MESSAGE);
    }

    #[rstest]
    fn test_repository_errors_map_to_internal_error() {
        let response: ApiErrorResponse = RepositoryError::NotFound(TaskId::new(3)).into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.error, "Task not found: 3");

        let response: ApiErrorResponse =
            RepositoryError::DatabaseError("connection failed".to_string()).into();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.error.error, "Database error: connection failed");
    }

    #[rstest]
    fn test_invalid_task_id_maps_to_bad_request() {
        let error = "abc".parse::<TaskId>().unwrap_err();
        let response: ApiErrorResponse = error.into();

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.error, "Invalid ID format");
        assert!(response.is_client_error());
    }

    #[rstest]
    fn test_validation_error_maps_to_bad_request() {
        let response: ApiErrorResponse =
            ValidationError::single("title", "Title is required").into();

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error.error, "Title is required");
        assert_eq!(response.error.details.map(|details| details.len()), Some(1));
    }

    #[rstest]
    #[tokio::test]
    async fn test_into_response_writes_error_body() {
        let response = ApiErrorResponse::bad_request("Invalid ID format").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body, serde_json::json!({ "error": "Invalid ID format" }));
    }
}
