//! Infrastructure module for persistence.
//!
//! This module contains the repository trait, its in-memory and `PostgreSQL`
//! implementations, and the factory that picks one from configuration.

pub mod factory;
pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use factory::{
    ConfigurationError, FactoryError, Repositories, RepositoryConfig, RepositoryFactory,
    StorageMode,
};
pub use in_memory::InMemoryTaskRepository;
pub use postgres::PostgresTaskRepository;
pub use repository::{RepositoryError, RepositoryFuture, TaskRepository, sort_newest_first};
