use std::sync::Arc;

use storage::repository::{AttemptRecord, ProgressRepository, StorageError};
use vocab_core::model::{AttemptResult, LearningSettings, Progress, UserId, WordPairId};

use crate::Clock;
use crate::error::ProgressError;

/// Turns quiz answers into mastery state.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    settings: LearningSettings,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: LearningSettings,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            settings,
            progress,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LearningSettings {
        &self.settings
    }

    /// Logs one answer and advances the streak state machine.
    ///
    /// The attempt row and the progress update are committed together.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::PairNotFound` if the pair does not exist.
    /// Returns `ProgressError::UserNotFound` if the user is not registered.
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn record_attempt(
        &self,
        user: UserId,
        pair: WordPairId,
        correct: bool,
    ) -> Result<AttemptResult, ProgressError> {
        let now = self.clock.now();
        let threshold = self.settings.memorization_threshold();
        let attempt = AttemptRecord {
            id: None,
            user_id: user,
            pair_id: pair,
            correct,
            attempted_at: now,
        };
        let apply = move |progress: &mut Progress| progress.apply_attempt(correct, now, threshold);

        let (_, result) = self
            .progress
            .record_attempt(&attempt, &apply)
            .await
            .map_err(|e| missing_row(e, pair))?;

        if result.just_memorized {
            tracing::info!(%user, %pair, streak = result.streak, "word memorized");
        }
        Ok(result)
    }

    /// Zeroes stale, unmastered streaks older than the configured window.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn decay_stale_progress(&self, user: UserId) -> Result<u64, ProgressError> {
        let reset = self
            .progress
            .decay_stale(user, self.clock.now(), self.settings.stale_window())
            .await?;
        if reset > 0 {
            tracing::info!(%user, reset, "reset stale progress");
        }
        Ok(reset)
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn memorized_pairs(&self, user: UserId) -> Result<Vec<WordPairId>, ProgressError> {
        Ok(self.progress.memorized_pair_ids(user).await?)
    }

    /// Clears streak and memorized flag for one pair. Returns false when the
    /// user never attempted it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn reset_single_word(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<bool, ProgressError> {
        Ok(self.progress.reset_progress(user, pair).await?)
    }

    /// Current progress for one pair, created unseen if absent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::PairNotFound` if the pair does not exist.
    /// Returns `ProgressError::UserNotFound` if the user is not registered.
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn word_progress(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Progress, ProgressError> {
        self.progress
            .ensure_progress(user, pair)
            .await
            .map_err(|e| missing_row(e, pair))
    }

    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if persistence fails.
    pub async fn attempt_history(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Vec<AttemptRecord>, ProgressError> {
        Ok(self.progress.attempts_for_pair(user, pair).await?)
    }
}

fn missing_row(err: StorageError, pair: WordPairId) -> ProgressError {
    match err {
        StorageError::NotFound => ProgressError::PairNotFound(pair),
        StorageError::UnknownUser(user) => ProgressError::UserNotFound(user),
        other => ProgressError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use storage::repository::{CatalogRepository, InMemoryRepository, UserRepository};
    use vocab_core::model::WordPairDraft;
    use vocab_core::time::{fixed_clock, fixed_now};

    async fn setup(clock: Clock) -> (ProgressService, InMemoryRepository, UserId, WordPairId) {
        let repo = InMemoryRepository::new();
        let user = repo.ensure_user("alice", fixed_now()).await.unwrap();
        let draft = WordPairDraft::new("dog", "собака", None).unwrap();
        let (pair, _) = repo.import_global_pair(&draft, fixed_now()).await.unwrap();
        let svc = ProgressService::new(clock, LearningSettings::default(), Arc::new(repo.clone()));
        (svc, repo, user, pair)
    }

    #[tokio::test]
    async fn five_correct_answers_memorize_once() {
        let (svc, _repo, user, pair) = setup(fixed_clock()).await;
        let mut flags = Vec::new();
        for _ in 0..6 {
            flags.push(svc.record_attempt(user, pair, true).await.unwrap().just_memorized);
        }
        assert_eq!(flags, vec![false, false, false, false, true, false]);
    }

    #[tokio::test]
    async fn missing_pair_is_reported_and_not_logged() {
        let (svc, repo, user, _pair) = setup(fixed_clock()).await;
        let missing = WordPairId::new(999);
        let err = svc.record_attempt(user, missing, true).await.unwrap_err();
        assert!(matches!(err, ProgressError::PairNotFound(id) if id == missing));
        assert!(repo.attempts_for_pair(user, missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unregistered_user_is_reported_and_not_logged() {
        let (svc, repo, _user, pair) = setup(fixed_clock()).await;
        let ghost = UserId::new(777);
        let err = svc.record_attempt(ghost, pair, true).await.unwrap_err();
        assert!(matches!(err, ProgressError::UserNotFound(id) if id == ghost));
        assert!(repo.attempts_for_pair(ghost, pair).await.unwrap().is_empty());
        assert!(matches!(
            svc.word_progress(ghost, pair).await,
            Err(ProgressError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn word_progress_lazily_creates_unseen_record() {
        let (svc, _repo, user, pair) = setup(fixed_clock()).await;
        let progress = svc.word_progress(user, pair).await.unwrap();
        assert_eq!(progress.correct_streak(), 0);
        assert!(!progress.is_memorized());
        assert!(progress.last_attempt_at().is_none());
    }

    #[tokio::test]
    async fn reset_reports_missing_record() {
        let (svc, _repo, user, pair) = setup(fixed_clock()).await;
        assert!(!svc.reset_single_word(user, pair).await.unwrap());
        for _ in 0..5 {
            svc.record_attempt(user, pair, true).await.unwrap();
        }
        assert!(svc.reset_single_word(user, pair).await.unwrap());
        let progress = svc.word_progress(user, pair).await.unwrap();
        assert!(!progress.is_memorized());
        assert_eq!(progress.correct_streak(), 0);
    }

    #[tokio::test]
    async fn decay_uses_clock_and_window() {
        let (svc, repo, user, pair) = setup(fixed_clock()).await;
        for _ in 0..3 {
            svc.record_attempt(user, pair, true).await.unwrap();
        }

        let five_days = ProgressService::new(
            fixed_clock().advanced(Duration::days(5)),
            LearningSettings::default(),
            Arc::new(repo.clone()),
        );
        assert_eq!(five_days.decay_stale_progress(user).await.unwrap(), 0);

        let six_days = ProgressService::new(
            fixed_clock().advanced(Duration::days(6)),
            LearningSettings::default(),
            Arc::new(repo),
        );
        assert_eq!(six_days.decay_stale_progress(user).await.unwrap(), 1);
        assert_eq!(
            six_days.word_progress(user, pair).await.unwrap().correct_streak(),
            0
        );
    }
}
