//! # todo-sync
//!
//! A single-user task manager.
//!
//! ## Overview
//!
//! - **Domain**: the [`Task`](domain::Task) record and its create/patch inputs
//! - **Infrastructure**: the [`TaskRepository`](infrastructure::TaskRepository)
//!   trait with in-memory and `PostgreSQL` backends
//! - **API**: axum handlers for `GET/POST /tasks` and `PATCH/DELETE /tasks/{id}`
//! - **Client**: [`TaskSync`](client::TaskSync), an optimistic cache of the
//!   collection that rolls back failed mutations and refetches after each one
//!
//! ## Example
//!
//! ```rust
//! use todo_sync::api::{AppState, router};
//!
//! let app = router(AppState::in_memory());
//! # let _ = app;
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod domain;
pub mod infrastructure;
