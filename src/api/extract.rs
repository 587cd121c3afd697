//! Request extractors that reject with [`ApiErrorResponse`].
//!
//! Axum's stock extractors answer malformed input with `415`/`422` and a
//! plain-text body. These wrappers keep every client error a `400` with the
//! JSON error body used by the rest of the API.

use axum::{
    extract::{FromRequest, FromRequestParts, Path},
    http::request::Parts,
};

use super::error::ApiErrorResponse;
use crate::domain::TaskId;

/// JSON request body whose rejection is an [`ApiErrorResponse`].
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiErrorResponse))]
pub struct JsonBody<T>(pub T);

/// The `{id}` path segment parsed as a [`TaskId`].
///
/// Runs before the body is read, so a malformed id is reported even when the
/// body is malformed too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskIdPath(pub TaskId);

impl<S> FromRequestParts<S> for TaskIdPath
where
    S: Send + Sync,
{
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;
        let id = raw.parse::<TaskId>()?;
        Ok(Self(id))
    }
}
