//! Infrastructure layer: configuration, connection pool, repositories.

pub mod config;
pub mod db;
pub mod repository;

pub use config::{Config, ConfigError, ListenConfig, StorageConfig};
pub use repository::{CatalogRepository, InMemoryCatalogRepository, PostgresCatalogRepository};
