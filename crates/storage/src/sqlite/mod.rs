use std::sync::Arc;
use std::time::Duration;

use sqlx::{Sqlite, SqlitePool, Transaction, sqlite::SqlitePoolOptions};
use thiserror::Error;

use vocab_core::model::UserId;

use crate::repository::{
    CatalogRepository, FavoriteRepository, ProgressRepository, Storage, StorageError,
    UserRepository,
};

mod catalog_repo;
mod favorite_repo;
mod mapping;
mod migrate;
mod progress_repo;
mod user_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// enforcing foreign key constraints fails during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// Opens the transaction every mutating operation runs in. Dropping it
    /// without [`commit`] rolls everything back.
    pub(crate) async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StorageError> {
        self.pool
            .begin()
            .await
            .map_err(|e| StorageError::Transaction(e.to_string()))
    }
}

pub(crate) async fn commit(tx: Transaction<'static, Sqlite>) -> Result<(), StorageError> {
    tx.commit().await.map_err(|e| {
        tracing::warn!(error = %e, "commit failed, transaction rolled back");
        StorageError::Transaction(e.to_string())
    })
}

/// Maps query failures; unique and foreign-key violations surface as
/// `Conflict`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

/// [`db_err`] for inserts keyed by `user`: the only foreign key such a write
/// can break is the user reference, so the violation becomes `UnknownUser`.
pub(crate) fn user_write_err(user: UserId) -> impl Fn(sqlx::Error) -> StorageError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_foreign_key_violation() {
                return StorageError::UnknownUser(user);
            }
        }
        db_err(e)
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self::from_sqlite(repo))
    }

    #[must_use]
    pub fn from_sqlite(repo: SqliteRepository) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let favorites: Arc<dyn FavoriteRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            users,
            catalog,
            favorites,
            progress,
        }
    }
}
