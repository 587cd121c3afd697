//! Domain module for task management.
//!
//! This module contains the task entity, its value objects, and the inputs
//! used to create and patch it.

pub mod task;

pub use task::{InvalidTaskId, NewTask, Task, TaskId, TaskPatch, Timestamp};
