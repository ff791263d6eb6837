//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vocab_core::model::{SettingsError, UserId, WordError, WordPairId};

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] WordError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `UserService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserError {
    #[error("display name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("word pair {0} not found")]
    PairNotFound(WordPairId),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SelectionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SelectionError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the quiz session workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no words available for session")]
    Empty,
    #[error("no active session")]
    NoActiveSession,
    #[error("session already completed")]
    Completed,
    #[error("session store unavailable: {0}")]
    Store(String),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
