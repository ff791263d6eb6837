use std::sync::Arc;

use vocab_core::model::UserId;

use crate::Clock;
use crate::error::{ProgressError, SessionError};
use crate::progress_service::ProgressService;
use crate::selection::SelectionService;
use super::quiz::{AnswerFeedback, QuizQuestion, QuizSession, QuizSummary};
use super::store::SessionStore;

/// Orchestrates one user's quiz: start, ask, answer, finish.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    selection: SelectionService,
    progress: ProgressService,
    store: Arc<dyn SessionStore>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        selection: SelectionService,
        progress: ProgressService,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            clock,
            selection,
            progress,
            store,
        }
    }

    /// Builds a fresh batch in display order and stores it, replacing any
    /// session the user already had.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no pair is eligible.
    /// Returns `SessionError::Selection` or `SessionError::Store` on failures.
    pub async fn start_session(&self, user: UserId) -> Result<QuizSession, SessionError> {
        let plan = self.selection.build_session(user, None).await?;
        if plan.is_empty() {
            return Err(SessionError::Empty);
        }
        let mut entries = plan.entries;
        self.selection.shuffle_for_display(&mut entries);

        let session = QuizSession::new(user, entries, self.clock.now());
        self.store.save(session.clone())?;
        tracing::debug!(%user, total = session.total(), "quiz started");
        Ok(session)
    }

    /// Prompt and shuffled options for the current entry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` if the user has no quiz.
    /// Returns `SessionError::Completed` once every entry is answered.
    pub async fn current_question(&self, user: UserId) -> Result<QuizQuestion, SessionError> {
        let session = self.active(user)?;
        let Some(entry) = session.current_entry() else {
            return Err(SessionError::Completed);
        };

        let pair = &entry.pair;
        let answer = pair.target().text().as_str().to_string();
        let distractors = self.selection.distractors(pair.id(), None).await?;

        let mut options: Vec<String> = std::iter::once(answer.clone())
            .chain(distractors.iter().map(|w| w.text().as_str().to_string()))
            .collect();
        self.selection.shuffle_for_display(&mut options);
        let correct_option = options.iter().position(|o| *o == answer).unwrap_or(0);

        Ok(QuizQuestion {
            pair_id: pair.id(),
            prompt: pair.source().text().as_str().to_string(),
            hint: pair.hint().map(str::to_string),
            options,
            correct_option,
            number: session.position() + 1,
            total: session.total(),
            is_personal: entry.is_personal,
        })
    }

    /// Grades `choice` against the current entry, records the attempt and advances.
    ///
    /// Comparison ignores case and surrounding whitespace. If the pair was
    /// deleted mid-session the entry is dropped and the error is returned.
    ///
    /// The advanced session is stored before the attempt is logged, so a
    /// failed save leaves nothing recorded and the same answer can be retried.
    /// If logging then fails the previous session is put back.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` or `SessionError::Completed`
    /// when there is nothing to answer.
    /// Returns `SessionError::Store` if the session cannot be saved.
    /// Returns `SessionError::Progress` if recording fails.
    pub async fn answer(&self, user: UserId, choice: &str) -> Result<AnswerFeedback, SessionError> {
        let before = self.active(user)?;
        let Some(entry) = before.current_entry() else {
            return Err(SessionError::Completed);
        };
        let pair_id = entry.pair_id();
        let correct_answer = entry.pair.target().text().as_str().to_string();
        let correct = choice.trim().to_lowercase() == correct_answer;

        let mut session = before.clone();
        session.record_answer(correct);
        let is_complete = session.is_complete();
        self.store.save(session)?;

        let result = match self.progress.record_attempt(user, pair_id, correct).await {
            Ok(result) => result,
            Err(err @ ProgressError::PairNotFound(_)) => {
                let mut session = before;
                session.drop_current();
                self.store.save(session)?;
                return Err(err.into());
            }
            Err(err) => {
                self.store.save(before)?;
                return Err(err.into());
            }
        };

        Ok(AnswerFeedback {
            pair_id,
            correct,
            correct_answer,
            result,
            is_complete,
        })
    }

    /// Ends the quiz and returns its tally. Unanswered entries count as wrong.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` if the user has no quiz.
    pub fn finish(&self, user: UserId) -> Result<QuizSummary, SessionError> {
        let session = self.store.take(user)?.ok_or(SessionError::NoActiveSession)?;
        let summary = session.summary();
        tracing::debug!(%user, correct = summary.correct, total = summary.total, "quiz finished");
        Ok(summary)
    }

    fn active(&self, user: UserId) -> Result<QuizSession, SessionError> {
        self.store.load(user)?.ok_or(SessionError::NoActiveSession)
    }
}
