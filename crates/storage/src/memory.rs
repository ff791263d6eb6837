use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use vocab_core::model::{
    AttemptResult, Language, Outcome, OutcomeReason, Owner, Progress, UserCounts, UserId, Word,
    WordId, WordPair, WordPairDraft, WordPairId, WordText,
};

use crate::repository::{
    AttemptRecord, CatalogRepository, FavoriteRepository, ProgressRepository, ProgressUpdate,
    StorageError, UserRepository,
};

#[derive(Debug, Clone, Copy)]
struct PairRow {
    source: WordId,
    target: WordId,
    owner: Owner,
}

#[derive(Default)]
struct State {
    next_user: u64,
    users: HashMap<String, UserId>,
    next_word: u64,
    words: BTreeMap<WordId, Word>,
    word_index: HashMap<(Language, WordText), WordId>,
    next_pair: u64,
    pairs: BTreeMap<WordPairId, PairRow>,
    progress: HashMap<(UserId, WordPairId), Progress>,
    next_attempt: i64,
    attempts: Vec<AttemptRecord>,
    // Insertion order doubles as "starred at" order.
    favorites: Vec<(UserId, WordPairId)>,
}

impl State {
    fn resolve_word(&mut self, language: Language, text: &WordText, hint: Option<&str>) -> WordId {
        if let Some(id) = self.word_index.get(&(language, text.clone())).copied() {
            if let (Some(word), Some(hint)) = (self.words.get_mut(&id), hint) {
                if word.hint().is_none() {
                    *word = Word::new(id, language, text.clone(), Some(hint.to_string()));
                }
            }
            return id;
        }
        self.next_word += 1;
        let id = WordId::new(self.next_word);
        self.words.insert(
            id,
            Word::new(id, language, text.clone(), hint.map(str::to_string)),
        );
        self.word_index.insert((language, text.clone()), id);
        id
    }

    fn find_pair(&self, source: WordId, target: WordId, owner: Owner) -> Option<WordPairId> {
        self.pairs
            .iter()
            .find(|(_, row)| row.source == source && row.target == target && row.owner == owner)
            .map(|(id, _)| *id)
    }

    fn insert_pair(&mut self, source: WordId, target: WordId, owner: Owner) -> WordPairId {
        self.next_pair += 1;
        let id = WordPairId::new(self.next_pair);
        self.pairs.insert(
            id,
            PairRow {
                source,
                target,
                owner,
            },
        );
        id
    }

    fn require_user(&self, user: UserId) -> Result<(), StorageError> {
        if self.users.values().any(|id| *id == user) {
            Ok(())
        } else {
            Err(StorageError::UnknownUser(user))
        }
    }

    fn is_favorite(&self, user: UserId, pair: WordPairId) -> bool {
        self.favorites.contains(&(user, pair))
    }

    fn pair(&self, id: WordPairId) -> Result<Option<WordPair>, StorageError> {
        let Some(row) = self.pairs.get(&id) else {
            return Ok(None);
        };
        let source = self.words.get(&row.source).ok_or(StorageError::NotFound)?;
        let target = self.words.get(&row.target).ok_or(StorageError::NotFound)?;
        Ok(Some(WordPair::new(
            id,
            source.clone(),
            target.clone(),
            row.owner,
        )))
    }

    fn pairs(
        &self,
        ids: impl IntoIterator<Item = WordPairId>,
    ) -> Result<Vec<WordPair>, StorageError> {
        let mut out = Vec::new();
        for id in ids {
            out.push(self.pair(id)?.ok_or(StorageError::NotFound)?);
        }
        Ok(out)
    }

    fn delete_pair(&mut self, pair: WordPairId) {
        self.pairs.remove(&pair);
        self.progress.retain(|(_, p), _| *p != pair);
        self.attempts.retain(|a| a.pair_id != pair);
        self.favorites.retain(|(_, p)| *p != pair);
    }
}

/// In-memory repository for tests and prototyping.
///
/// A single mutex guards the whole state, so every multi-step operation is
/// all-or-nothing just like its transactional SQLite counterpart.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn ensure_user(
        &self,
        display_name: &str,
        _now: DateTime<Utc>,
    ) -> Result<UserId, StorageError> {
        let mut guard = self.lock()?;
        if let Some(id) = guard.users.get(display_name) {
            return Ok(*id);
        }
        guard.next_user += 1;
        let id = UserId::new(guard.next_user);
        guard.users.insert(display_name.to_string(), id);
        Ok(id)
    }

    async fn delete_user(&self, user: UserId) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.users.len();
        guard.users.retain(|_, id| *id != user);
        if guard.users.len() == before {
            return Ok(false);
        }
        let owned: Vec<WordPairId> = guard
            .pairs
            .iter()
            .filter(|(_, row)| row.owner == Owner::User(user))
            .map(|(id, _)| *id)
            .collect();
        for pair in owned {
            guard.delete_pair(pair);
        }
        guard.progress.retain(|(u, _), _| *u != user);
        guard.attempts.retain(|a| a.user_id != user);
        guard.favorites.retain(|(u, _)| *u != user);
        Ok(true)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn resolve_word(
        &self,
        language: Language,
        text: &WordText,
        hint: Option<&str>,
    ) -> Result<WordId, StorageError> {
        let mut guard = self.lock()?;
        Ok(guard.resolve_word(language, text, hint))
    }

    async fn import_global_pair(
        &self,
        draft: &WordPairDraft,
        _now: DateTime<Utc>,
    ) -> Result<(WordPairId, bool), StorageError> {
        let mut guard = self.lock()?;
        let source = guard.resolve_word(Language::Source, &draft.source, draft.hint.as_deref());
        let target = guard.resolve_word(Language::Target, &draft.target, None);
        if let Some(id) = guard.find_pair(source, target, Owner::Global) {
            return Ok((id, false));
        }
        Ok((guard.insert_pair(source, target, Owner::Global), true))
    }

    async fn add_user_pair(
        &self,
        user: UserId,
        draft: &WordPairDraft,
        _now: DateTime<Utc>,
    ) -> Result<Outcome, StorageError> {
        let mut guard = self.lock()?;
        guard.require_user(user)?;
        let source = guard.resolve_word(Language::Source, &draft.source, draft.hint.as_deref());
        let target = guard.resolve_word(Language::Target, &draft.target, None);

        if let Some(global) = guard.find_pair(source, target, Owner::Global) {
            if guard.is_favorite(user, global) {
                return Ok(Outcome::for_pair(OutcomeReason::AlreadyFavorite, global));
            }
            guard.favorites.push((user, global));
            return Ok(Outcome::for_pair(OutcomeReason::AddedAsFavorite, global));
        }
        if let Some(owned) = guard.find_pair(source, target, Owner::User(user)) {
            return Ok(Outcome::for_pair(OutcomeReason::AlreadyOwned, owned));
        }
        let id = guard.insert_pair(source, target, Owner::User(user));
        Ok(Outcome::for_pair(OutcomeReason::CreatedPersonal, id))
    }

    async fn remove_from_user_list(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Outcome, StorageError> {
        let mut guard = self.lock()?;
        let Some(row) = guard.pairs.get(&pair).copied() else {
            return Ok(Outcome::for_pair(OutcomeReason::PairNotFound, pair));
        };
        match row.owner {
            Owner::User(owner) if owner == user => {
                guard.delete_pair(pair);
                Ok(Outcome::for_pair(OutcomeReason::DeletedPersonal, pair))
            }
            Owner::User(_) => Ok(Outcome::for_pair(OutcomeReason::NotOwner, pair)),
            Owner::Global => {
                let before = guard.favorites.len();
                guard.favorites.retain(|link| *link != (user, pair));
                let reason = if guard.favorites.len() < before {
                    OutcomeReason::RemovedFavorite
                } else {
                    OutcomeReason::NotFavorite
                };
                Ok(Outcome::for_pair(reason, pair))
            }
        }
    }

    async fn get_pair(&self, pair: WordPairId) -> Result<Option<WordPair>, StorageError> {
        self.lock()?.pair(pair)
    }

    async fn pairs_by_ids(&self, ids: &[WordPairId]) -> Result<Vec<WordPair>, StorageError> {
        self.lock()?.pairs(ids.iter().copied())
    }

    async fn personal_pairs(&self, user: UserId) -> Result<Vec<WordPair>, StorageError> {
        let guard = self.lock()?;
        let ids: Vec<WordPairId> = guard
            .pairs
            .iter()
            .filter(|(_, row)| row.owner == Owner::User(user))
            .map(|(id, _)| *id)
            .collect();
        guard.pairs(ids)
    }

    async fn global_pair_ids(&self) -> Result<Vec<WordPairId>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .pairs
            .iter()
            .filter(|(_, row)| row.owner.is_global())
            .map(|(id, _)| *id)
            .collect())
    }

    async fn answer_word_ids(
        &self,
        language: Language,
        excluding: WordId,
    ) -> Result<Vec<WordId>, StorageError> {
        let guard = self.lock()?;
        let ids: BTreeSet<WordId> = guard
            .pairs
            .values()
            .map(|row| match language {
                Language::Source => row.source,
                Language::Target => row.target,
            })
            .filter(|id| *id != excluding)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn words_by_ids(&self, ids: &[WordId]) -> Result<Vec<Word>, StorageError> {
        let guard = self.lock()?;
        ids.iter()
            .map(|id| guard.words.get(id).cloned().ok_or(StorageError::NotFound))
            .collect()
    }

    async fn search_pairs(
        &self,
        user: UserId,
        language: Language,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<WordPair>, StorageError> {
        let needle = needle.trim().to_lowercase();
        let guard = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let ids: Vec<WordPairId> = guard
            .pairs
            .iter()
            .filter(|(_, row)| row.owner.is_global() || row.owner == Owner::User(user))
            .filter(|(_, row)| {
                let word = match language {
                    Language::Source => row.source,
                    Language::Target => row.target,
                };
                guard
                    .words
                    .get(&word)
                    .is_some_and(|w| w.text().as_str().contains(needle.as_str()))
            })
            .map(|(id, _)| *id)
            .take(limit)
            .collect();
        guard.pairs(ids)
    }
}

#[async_trait]
impl FavoriteRepository for InMemoryRepository {
    async fn add_favorite(
        &self,
        user: UserId,
        pair: WordPairId,
        _now: DateTime<Utc>,
    ) -> Result<Outcome, StorageError> {
        let mut guard = self.lock()?;
        guard.require_user(user)?;
        let Some(row) = guard.pairs.get(&pair) else {
            return Ok(Outcome::for_pair(OutcomeReason::PairNotFound, pair));
        };
        if !row.owner.is_global() {
            return Ok(Outcome::for_pair(OutcomeReason::NotGlobal, pair));
        }
        if guard.is_favorite(user, pair) {
            return Ok(Outcome::for_pair(OutcomeReason::AlreadyFavorite, pair));
        }
        guard.favorites.push((user, pair));
        Ok(Outcome::for_pair(OutcomeReason::AddedAsFavorite, pair))
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Outcome, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.favorites.len();
        guard.favorites.retain(|link| *link != (user, pair));
        let reason = if guard.favorites.len() < before {
            OutcomeReason::RemovedFavorite
        } else {
            OutcomeReason::NotFavorite
        };
        Ok(Outcome::for_pair(reason, pair))
    }

    async fn is_favorite(&self, user: UserId, pair: WordPairId) -> Result<bool, StorageError> {
        Ok(self.lock()?.is_favorite(user, pair))
    }

    async fn favorite_pairs(&self, user: UserId) -> Result<Vec<WordPair>, StorageError> {
        let guard = self.lock()?;
        let ids: Vec<WordPairId> = guard
            .favorites
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, p)| *p)
            .collect();
        guard.pairs(ids)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Option<Progress>, StorageError> {
        Ok(self.lock()?.progress.get(&(user, pair)).cloned())
    }

    async fn ensure_progress(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Progress, StorageError> {
        let mut guard = self.lock()?;
        if !guard.pairs.contains_key(&pair) {
            return Err(StorageError::NotFound);
        }
        guard.require_user(user)?;
        Ok(guard
            .progress
            .entry((user, pair))
            .or_insert_with(|| Progress::new(user, pair))
            .clone())
    }

    async fn record_attempt(
        &self,
        attempt: &AttemptRecord,
        update: ProgressUpdate<'_>,
    ) -> Result<(i64, AttemptResult), StorageError> {
        let mut guard = self.lock()?;
        if !guard.pairs.contains_key(&attempt.pair_id) {
            return Err(StorageError::NotFound);
        }
        guard.require_user(attempt.user_id)?;
        let key = (attempt.user_id, attempt.pair_id);
        let mut progress = guard
            .progress
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Progress::new(attempt.user_id, attempt.pair_id));
        let result = update(&mut progress);

        guard.next_attempt += 1;
        let id = guard.next_attempt;
        guard.attempts.push(AttemptRecord {
            id: Some(id),
            ..attempt.clone()
        });
        guard.progress.insert(key, progress);
        Ok((id, result))
    }

    async fn memorized_pair_ids(&self, user: UserId) -> Result<Vec<WordPairId>, StorageError> {
        let guard = self.lock()?;
        let ids: BTreeSet<WordPairId> = guard
            .progress
            .values()
            .filter(|p| p.user_id() == user && p.is_memorized())
            .map(Progress::pair_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn decay_stale(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let mut reset = 0_u64;
        for progress in guard.progress.values_mut() {
            if progress.user_id() == user && progress.decay(now, window) {
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn reset_progress(&self, user: UserId, pair: WordPairId) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        match guard.progress.get_mut(&(user, pair)) {
            Some(progress) => {
                progress.reset();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn attempts_for_pair(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<AttemptRecord> = guard
            .attempts
            .iter()
            .filter(|a| a.user_id == user && a.pair_id == pair)
            .cloned()
            .collect();
        out.sort_by_key(|a| (a.attempted_at, a.id));
        Ok(out)
    }

    async fn user_counts(&self, user: UserId) -> Result<UserCounts, StorageError> {
        let guard = self.lock()?;
        let mut counts = UserCounts::default();
        for progress in guard.progress.values().filter(|p| p.user_id() == user) {
            if progress.is_memorized() {
                counts.memorized += 1;
            } else if progress.is_in_progress() {
                counts.in_progress += 1;
            }
        }
        for attempt in guard.attempts.iter().filter(|a| a.user_id == user) {
            counts.total_attempts += 1;
            if attempt.correct {
                counts.correct_attempts += 1;
            }
        }
        counts.personal_words = guard
            .pairs
            .values()
            .filter(|row| row.owner == Owner::User(user))
            .count() as u64;
        counts.favorites = guard.favorites.iter().filter(|(u, _)| *u == user).count() as u64;
        Ok(counts)
    }
}
