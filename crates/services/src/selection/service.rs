use std::collections::HashSet;
use std::sync::Arc;

use storage::repository::{CatalogRepository, FavoriteRepository};
use vocab_core::model::{Language, UserId, Word, WordPairId};

use crate::error::SelectionError;
use crate::progress_service::ProgressService;
use crate::random::{RandomSource, sample, shuffle};
use super::plan::{SessionBuilder, SessionPlan};

/// Decides which pairs a user studies and which wrong answers accompany them.
#[derive(Clone)]
pub struct SelectionService {
    progress: ProgressService,
    catalog: Arc<dyn CatalogRepository>,
    favorites: Arc<dyn FavoriteRepository>,
    random: Arc<dyn RandomSource>,
}

impl SelectionService {
    #[must_use]
    pub fn new(
        progress: ProgressService,
        catalog: Arc<dyn CatalogRepository>,
        favorites: Arc<dyn FavoriteRepository>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            progress,
            catalog,
            favorites,
            random,
        }
    }

    /// Builds the next study batch for `user`.
    ///
    /// Stale progress is decayed first so words whose streak just reset are
    /// eligible again. `batch_size` defaults to the configured session size.
    /// The plan is in tier order; use [`SelectionService::shuffle_for_display`]
    /// before presenting it.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::Progress` if decay or memorized lookup fails.
    /// Returns `SelectionError::Storage` if the catalog cannot be read.
    pub async fn build_session(
        &self,
        user: UserId,
        batch_size: Option<u32>,
    ) -> Result<SessionPlan, SelectionError> {
        let batch_size =
            batch_size.unwrap_or_else(|| self.progress.settings().session_batch_size());
        self.progress.decay_stale_progress(user).await?;

        let memorized: HashSet<WordPairId> = self
            .progress
            .memorized_pairs(user)
            .await?
            .into_iter()
            .collect();
        let builder = SessionBuilder::new(batch_size, &memorized);

        let personal = self.catalog.personal_pairs(user).await?;
        let favorites = self.favorites.favorite_pairs(user).await?;
        let mut plan = builder.plan_owned(personal, favorites);

        let global_ids = self.catalog.global_pair_ids().await?;
        let picked = builder.pick_global(&plan, global_ids, self.random.as_ref());
        if !picked.is_empty() {
            let pairs = self.catalog.pairs_by_ids(&picked).await?;
            plan.extend_global(pairs);
        }

        tracing::debug!(
            %user,
            batch_size,
            personal = plan.personal_selected,
            favorites = plan.favorite_selected,
            global = plan.global_selected,
            "built session"
        );
        Ok(plan)
    }

    /// Shuffles session entries or answer options into presentation order.
    pub fn shuffle_for_display<T>(&self, items: &mut [T]) {
        shuffle(self.random.as_ref(), items);
    }

    /// Picks up to `count` distinct wrong answers for `pair`.
    ///
    /// Candidates are answer-language words used by any pair, excluding the
    /// pair's own answer word. A short catalog or a missing pair yields fewer
    /// words, never an error.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::Storage` if the catalog cannot be read.
    pub async fn distractors(
        &self,
        pair: WordPairId,
        count: Option<u32>,
    ) -> Result<Vec<Word>, SelectionError> {
        let count = count.unwrap_or_else(|| self.progress.settings().distractor_count());
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let Some(word_pair) = self.catalog.get_pair(pair).await? else {
            tracing::debug!(%pair, "distractors requested for missing pair");
            return Ok(Vec::new());
        };

        let candidates = self
            .catalog
            .answer_word_ids(Language::Target, word_pair.target().id())
            .await?;
        let picked = sample(self.random.as_ref(), candidates, count);
        if picked.len() < count {
            tracing::debug!(%pair, wanted = count, found = picked.len(), "distractor shortfall");
        }
        if picked.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.catalog.words_by_ids(&picked).await?)
    }
}
