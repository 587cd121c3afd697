//! Client-side synchronization with the task API.
//!
//! [`TaskSync`] owns a [`TaskCache`] of the collection and applies every
//! mutation optimistically, rolling back on failure and refetching afterwards.
//! Requests go through a [`TaskTransport`].

pub mod cache;
pub mod sync;
pub mod transport;

pub use cache::{CacheEdit, CacheSnapshot, CachedTask, TaskCache, TaskKey};
pub use sync::{MutationKind, SyncError, TaskSync};
pub use transport::{
    DEFAULT_REQUEST_TIMEOUT, HttpTaskTransport, LocalTaskTransport, TaskTransport, TransportError,
    TransportFuture,
};
