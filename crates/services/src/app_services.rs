use std::sync::Arc;

use storage::repository::Storage;
use vocab_core::model::LearningSettings;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::config::AppConfig;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::random::{RandomSource, SystemRandom};
use crate::selection::SelectionService;
use crate::sessions::{InMemorySessionStore, QuizLoopService, SessionStore};
use crate::stats_service::StatsService;
use crate::user_service::UserService;

/// Assembles the engine's services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    users: Arc<UserService>,
    catalog: Arc<CatalogService>,
    progress: Arc<ProgressService>,
    selection: Arc<SelectionService>,
    stats: Arc<StatsService>,
    quiz: Arc<QuizLoopService>,
}

impl AppServices {
    /// Build `SQLite`-backed services from `VOCAB_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` for malformed variables and
    /// `AppServicesError::Sqlite` if the database cannot be opened or migrated.
    pub async fn from_env(clock: Clock) -> Result<Self, AppServicesError> {
        Self::from_lookup(|var| std::env::var(var).ok(), clock).await
    }

    /// Like [`AppServices::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`AppServices::from_env`].
    pub async fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let config = AppConfig::from_lookup(lookup)?;
        Self::new_sqlite(&config, clock).await
    }

    /// Build services backed by `SQLite` storage at `config.db_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        tracing::info!(db_url = %config.db_url, "storage ready");
        Ok(Self::from_storage(
            &storage,
            config.settings,
            clock,
            Arc::new(SystemRandom),
            Arc::new(InMemorySessionStore::new()),
        ))
    }

    /// Build services over the in-memory repository.
    #[must_use]
    pub fn in_memory(
        settings: LearningSettings,
        clock: Clock,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self::from_storage(
            &Storage::in_memory(),
            settings,
            clock,
            random,
            Arc::new(InMemorySessionStore::new()),
        )
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        settings: LearningSettings,
        clock: Clock,
        random: Arc<dyn RandomSource>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let progress = ProgressService::new(clock, settings, Arc::clone(&storage.progress));
        let selection = SelectionService::new(
            progress.clone(),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.favorites),
            random,
        );
        let quiz = QuizLoopService::new(clock, selection.clone(), progress.clone(), sessions);
        let catalog = CatalogService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.favorites),
        );
        let stats = StatsService::new(Arc::clone(&storage.progress));
        let users = UserService::new(clock, Arc::clone(&storage.users));

        Self {
            users: Arc::new(users),
            catalog: Arc::new(catalog),
            progress: Arc::new(progress),
            selection: Arc::new(selection),
            stats: Arc::new(stats),
            quiz: Arc::new(quiz),
        }
    }

    #[must_use]
    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.users)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn selection(&self) -> Arc<SelectionService> {
        Arc::clone(&self.selection)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz)
    }
}
