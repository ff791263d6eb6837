use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use vocab_core::model::{
    Attempt, AttemptResult, Language, Outcome, Progress, UserCounts, UserId, Word, WordId,
    WordPair, WordPairDraft, WordPairId, WordText,
};

pub use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    /// A write named a user id that was never registered through `ensure_user`.
    #[error("user {0} is not registered")]
    UnknownUser(UserId),

    #[error("connection error: {0}")]
    Connection(String),

    /// Begin or commit failed; nothing from the operation was persisted.
    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of an attempt-log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub id: Option<i64>,
    pub user_id: UserId,
    pub pair_id: WordPairId,
    pub correct: bool,
    pub attempted_at: DateTime<Utc>,
}

impl AttemptRecord {
    #[must_use]
    pub fn from_attempt(attempt: &Attempt) -> Self {
        Self {
            id: None,
            user_id: attempt.user_id,
            pair_id: attempt.pair_id,
            correct: attempt.correct,
            attempted_at: attempt.attempted_at,
        }
    }
}

/// State transition applied to a loaded-or-created progress record inside
/// the attempt transaction.
pub type ProgressUpdate<'a> = &'a (dyn Fn(&mut Progress) -> AttemptResult + Send + Sync);

/// Minimal user bookkeeping needed for ownership and cascades.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns the id for `display_name`, creating the user when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the user cannot be read or stored.
    async fn ensure_user(
        &self,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, StorageError>;

    /// Deletes a user together with their personal pairs, progress, attempts and favorites.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deletion fails.
    async fn delete_user(&self, user: UserId) -> Result<bool, StorageError>;
}

/// Word entities and word pairs.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Insert-or-fetch a word by normalized text.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn resolve_word(
        &self,
        language: Language,
        text: &WordText,
        hint: Option<&str>,
    ) -> Result<WordId, StorageError>;

    /// Insert-or-fetch a global pair. The flag is true when the pair was created.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn import_global_pair(
        &self,
        draft: &WordPairDraft,
        now: DateTime<Utc>,
    ) -> Result<(WordPairId, bool), StorageError>;

    /// Tiered add: favorite an existing global pair, report an existing
    /// personal pair, or create a new personal pair. Runs in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnknownUser` if `user` is not registered, or
    /// `StorageError` on other persistence failures.
    async fn add_user_pair(
        &self,
        user: UserId,
        draft: &WordPairDraft,
        now: DateTime<Utc>,
    ) -> Result<Outcome, StorageError>;

    /// Deletes an owned personal pair (with its progress and attempts) or
    /// drops the favorite link of a global pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn remove_from_user_list(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Outcome, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn get_pair(&self, pair: WordPairId) -> Result<Option<WordPair>, StorageError>;

    /// Fetch pairs in the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is missing.
    async fn pairs_by_ids(&self, ids: &[WordPairId]) -> Result<Vec<WordPair>, StorageError>;

    /// Personal pairs owned by `user`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn personal_pairs(&self, user: UserId) -> Result<Vec<WordPair>, StorageError>;

    /// Ids of every global pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn global_pair_ids(&self) -> Result<Vec<WordPairId>, StorageError>;

    /// Distinct ids of `language` words used by at least one pair, except `excluding`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn answer_word_ids(
        &self,
        language: Language,
        excluding: WordId,
    ) -> Result<Vec<WordId>, StorageError>;

    /// Fetch words in the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is missing.
    async fn words_by_ids(&self, ids: &[WordId]) -> Result<Vec<Word>, StorageError>;

    /// Substring search over one side of the catalog, restricted to global
    /// pairs and pairs owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn search_pairs(
        &self,
        user: UserId,
        language: Language,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<WordPair>, StorageError>;
}

/// User bookmarks on global pairs.
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::UnknownUser` if `user` is not registered.
    async fn add_favorite(
        &self,
        user: UserId,
        pair: WordPairId,
        now: DateTime<Utc>,
    ) -> Result<Outcome, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn remove_favorite(&self, user: UserId, pair: WordPairId)
    -> Result<Outcome, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn is_favorite(&self, user: UserId, pair: WordPairId) -> Result<bool, StorageError>;

    /// Favorited pairs, in the order they were starred.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn favorite_pairs(&self, user: UserId) -> Result<Vec<WordPair>, StorageError>;
}

/// Progress records and the append-only attempt log.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn get_progress(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Option<Progress>, StorageError>;

    /// Load the record, creating an unseen one when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the pair does not exist and
    /// `StorageError::UnknownUser` if the user is not registered.
    async fn ensure_progress(&self, user: UserId, pair: WordPairId)
    -> Result<Progress, StorageError>;

    /// Appends `attempt`, loads-or-creates the progress record, applies
    /// `update` and stores the result. Everything commits together.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the pair does not exist,
    /// `StorageError::UnknownUser` if the user is not registered, or
    /// `StorageError::Transaction` if the commit fails.
    async fn record_attempt(
        &self,
        attempt: &AttemptRecord,
        update: ProgressUpdate<'_>,
    ) -> Result<(i64, AttemptResult), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn memorized_pair_ids(&self, user: UserId) -> Result<Vec<WordPairId>, StorageError>;

    /// Zero the streak of every unmastered, mid-streak record whose last
    /// attempt is older than `now - window`. Returns the number of records reset.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn decay_stale(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<u64, StorageError>;

    /// Manual reset of streak and memorized flag. False when no record exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn reset_progress(&self, user: UserId, pair: WordPairId) -> Result<bool, StorageError>;

    /// Attempts for one pair, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn attempts_for_pair(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Vec<AttemptRecord>, StorageError>;

    /// Aggregate counters for the stats dashboard.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on persistence failures.
    async fn user_counts(&self, user: UserId) -> Result<UserCounts, StorageError>;
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            catalog: Arc::new(repo.clone()),
            favorites: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        }
    }
}
