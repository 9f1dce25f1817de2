//! Core domain logic for Story Builder.
//! This crate owns the story collection, its ordering and its persistence.

pub mod config;
pub mod db;
pub mod kv;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use kv::{KeyValueStore, KvError, KvResult, MemoryKeyValueStore, SqliteKeyValueStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::story::{Story, StoryId, DEFAULT_STORY_TITLE};
pub use repo::story_repo::{
    RepoError, RepoResult, StoryListener, StoryRepository, SubscriptionId, DEFAULT_STORAGE_KEY,
};
pub use service::story_service::{
    derive_preview, ServiceResult, StoryRow, StoryService, StoryServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
