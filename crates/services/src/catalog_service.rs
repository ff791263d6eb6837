use std::sync::Arc;

use serde::Serialize;
use storage::repository::{CatalogRepository, FavoriteRepository};
use vocab_core::model::{
    Language, Outcome, UserId, WordId, WordPair, WordPairDraft, WordPairId, WordText,
    normalize_hint,
};

use crate::Clock;
use crate::error::CatalogError;

/// Upper bound on search hits returned to the dispatch layer.
pub const SEARCH_LIMIT: u32 = 20;

/// One row of a user's word list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWordEntry {
    pub pair: WordPair,
    /// True for the user's own pairs, false for favorited global pairs.
    pub is_personal: bool,
}

/// Word catalog and favorites operations.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    favorites: Arc<dyn FavoriteRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        favorites: Arc<dyn FavoriteRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            favorites,
        }
    }

    /// Normalizes `text` and returns the id of the matching word, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for empty, oversized or control-character input.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn resolve_word(
        &self,
        language: Language,
        text: &str,
        hint: Option<&str>,
    ) -> Result<WordId, CatalogError> {
        let text = WordText::new(language, text)?;
        let hint = normalize_hint(hint)?;
        Ok(self
            .catalog
            .resolve_word(language, &text, hint.as_deref())
            .await?)
    }

    /// Adds a word pair to the user's list.
    ///
    /// A pair already present in the global dictionary is favorited instead of
    /// duplicated; an identical personal pair is reported as already owned.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid input.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn add_personal_or_favorite_global(
        &self,
        user: UserId,
        source: &str,
        target: &str,
        hint: Option<&str>,
    ) -> Result<Outcome, CatalogError> {
        let draft = WordPairDraft::new(source, target, hint)?;
        let outcome = self
            .catalog
            .add_user_pair(user, &draft, self.clock.now())
            .await?;
        tracing::debug!(%user, reason = ?outcome.reason, "add word pair");
        Ok(outcome)
    }

    /// Inserts or fetches a shared dictionary pair. The flag reports whether it was new.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid input.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn import_global_pair(
        &self,
        source: &str,
        target: &str,
        hint: Option<&str>,
    ) -> Result<(WordPairId, bool), CatalogError> {
        let draft = WordPairDraft::new(source, target, hint)?;
        Ok(self
            .catalog
            .import_global_pair(&draft, self.clock.now())
            .await?)
    }

    /// Deletes an owned personal pair, or unlinks a favorited global pair.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn remove_from_user_list(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Outcome, CatalogError> {
        let outcome = self.catalog.remove_from_user_list(user, pair).await?;
        tracing::debug!(%user, %pair, reason = ?outcome.reason, "remove word pair");
        Ok(outcome)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn add_favorite(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Outcome, CatalogError> {
        Ok(self
            .favorites
            .add_favorite(user, pair, self.clock.now())
            .await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn remove_favorite(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Outcome, CatalogError> {
        Ok(self.favorites.remove_favorite(user, pair).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn is_favorite(&self, user: UserId, pair: WordPairId) -> Result<bool, CatalogError> {
        Ok(self.favorites.is_favorite(user, pair).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn get_pair(&self, pair: WordPairId) -> Result<Option<WordPair>, CatalogError> {
        Ok(self.catalog.get_pair(pair).await?)
    }

    /// Personal pairs first, then favorited global pairs.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn user_word_list(&self, user: UserId) -> Result<Vec<UserWordEntry>, CatalogError> {
        let personal = self.catalog.personal_pairs(user).await?;
        let favorites = self.favorites.favorite_pairs(user).await?;
        Ok(personal
            .into_iter()
            .map(|pair| UserWordEntry {
                pair,
                is_personal: true,
            })
            .chain(favorites.into_iter().map(|pair| UserWordEntry {
                pair,
                is_personal: false,
            }))
            .collect())
    }

    /// Case-insensitive substring search over one side of the catalog.
    ///
    /// Only global pairs and the caller's own personal pairs are returned. A
    /// blank query returns nothing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn search(
        &self,
        user: UserId,
        text: &str,
        language: Language,
    ) -> Result<Vec<WordPair>, CatalogError> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .catalog
            .search_pairs(user, language, &needle, SEARCH_LIMIT)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storage::repository::{InMemoryRepository, StorageError, UserRepository};
    use vocab_core::model::{OutcomeReason, WordError};
    use vocab_core::time::{fixed_clock, fixed_now};

    fn service_over(repo: &InMemoryRepository) -> CatalogService {
        CatalogService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    fn service() -> CatalogService {
        service_over(&InMemoryRepository::new())
    }

    #[tokio::test]
    async fn invalid_input_is_a_validation_error() {
        let svc = service();
        let err = svc
            .add_personal_or_favorite_global(UserId::new(1), "   ", "дом", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Validation(WordError::Empty { .. })
        ));

        let too_long = "x".repeat(41);
        let err = svc
            .add_personal_or_favorite_global(UserId::new(1), &too_long, "дом", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Validation(WordError::TooLong { .. })
        ));
    }

    #[tokio::test]
    async fn word_list_puts_personal_before_favorites() {
        let repo = InMemoryRepository::new();
        let svc = service_over(&repo);
        let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
        let (global, _) = svc.import_global_pair("cat", "кошка", None).await.unwrap();
        svc.add_favorite(user, global).await.unwrap();
        let personal = svc
            .add_personal_or_favorite_global(user, "dog", "собака", Some(" dɒɡ "))
            .await
            .unwrap();
        assert_eq!(personal.reason, OutcomeReason::CreatedPersonal);

        let list = svc.user_word_list(user).await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].is_personal);
        assert_eq!(list[0].pair.hint(), Some("dɒɡ"));
        assert!(!list[1].is_personal);
        assert_eq!(list[1].pair.id(), global);
    }

    #[tokio::test]
    async fn unregistered_user_cannot_add_words() {
        let svc = service();
        let err = svc
            .add_personal_or_favorite_global(UserId::new(777), "ghost", "призрак", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Storage(StorageError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn blank_search_returns_nothing() {
        let svc = service();
        svc.import_global_pair("house", "дом", None).await.unwrap();
        let user = UserId::new(1);
        assert!(svc.search(user, "  ", Language::Source).await.unwrap().is_empty());
        let hits = svc.search(user, "ДО", Language::Target).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].is_global());
    }

    #[tokio::test]
    async fn resolve_word_normalizes_before_lookup() {
        let svc = service();
        let a = svc.resolve_word(Language::Target, "Дом", None).await.unwrap();
        let b = svc.resolve_word(Language::Target, " дом ", None).await.unwrap();
        assert_eq!(a, b);
    }
}
