use chrono::{DateTime, Utc};
use serde::Serialize;
use vocab_core::model::{AttemptResult, UserId, WordPairId, accuracy_percent};

use crate::selection::SessionEntry;

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// One user's in-flight quiz: a fixed batch stepped through in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizSession {
    user: UserId,
    entries: Vec<SessionEntry>,
    current: usize,
    correct: u32,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    #[must_use]
    pub fn new(user: UserId, entries: Vec<SessionEntry>, started_at: DateTime<Utc>) -> Self {
        Self {
            user,
            entries,
            current: 0,
            correct: 0,
            started_at,
        }
    }

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    #[must_use]
    pub fn current_entry(&self) -> Option<&SessionEntry> {
        self.entries.get(self.current)
    }

    /// Zero-based position of the current entry.
    #[must_use]
    pub fn position(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.entries.len()
    }

    /// Counts the answer and moves to the next entry.
    pub fn record_answer(&mut self, correct: bool) {
        if self.is_complete() {
            return;
        }
        if correct {
            self.correct += 1;
        }
        self.current += 1;
    }

    /// Drops the current entry without counting it, e.g. when its pair vanished.
    pub fn drop_current(&mut self) -> Option<SessionEntry> {
        if self.is_complete() {
            return None;
        }
        Some(self.entries.remove(self.current))
    }

    #[must_use]
    pub fn summary(&self) -> QuizSummary {
        let total = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        QuizSummary {
            correct: self.correct,
            total,
            accuracy_percent: accuracy_percent(u64::from(self.correct), u64::from(total), 0),
        }
    }
}

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// Multiple-choice prompt for the current entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizQuestion {
    pub pair_id: WordPairId,
    pub prompt: String,
    pub hint: Option<String>,
    /// Correct answer and distractors in display order.
    pub options: Vec<String>,
    pub correct_option: usize,
    /// One-based position within the session.
    pub number: usize,
    pub total: usize,
    pub is_personal: bool,
}

/// What the caller shows after an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerFeedback {
    pub pair_id: WordPairId,
    pub correct: bool,
    pub correct_answer: String,
    pub result: AttemptResult,
    pub is_complete: bool,
}

/// End-of-session tally; accuracy is rounded to a whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuizSummary {
    pub correct: u32,
    pub total: u32,
    pub accuracy_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    use vocab_core::model::{Language, Owner, Word, WordId, WordPair, WordText};
    use vocab_core::time::fixed_now;

    fn entry(id: u64) -> SessionEntry {
        let word = |wid: u64, language: Language, text: &str| {
            Word::new(
                WordId::new(wid),
                language,
                WordText::new(language, text).unwrap(),
                None,
            )
        };
        SessionEntry {
            pair: WordPair::new(
                WordPairId::new(id),
                word(id * 2, Language::Source, "cat"),
                word(id * 2 + 1, Language::Target, "кошка"),
                Owner::Global,
            ),
            is_personal: false,
        }
    }

    #[test]
    fn answers_advance_and_count() {
        let entries = vec![entry(1), entry(2), entry(3)];
        let mut session = QuizSession::new(UserId::new(1), entries, fixed_now());
        session.record_answer(true);
        session.record_answer(false);
        assert_eq!(session.position(), 2);
        assert_eq!(session.current_entry().map(SessionEntry::pair_id), Some(WordPairId::new(3)));
        session.record_answer(true);
        assert!(session.is_complete());
        session.record_answer(true);
        assert_eq!(session.correct(), 2);

        let summary = session.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.accuracy_percent, 67.0);
    }

    #[test]
    fn dropping_shrinks_total_without_advancing() {
        let mut session = QuizSession::new(UserId::new(1), vec![entry(1), entry(2)], fixed_now());
        let dropped = session.drop_current().unwrap();
        assert_eq!(dropped.pair_id(), WordPairId::new(1));
        assert_eq!(session.total(), 1);
        assert_eq!(session.position(), 0);
        session.record_answer(false);
        assert!(session.drop_current().is_none());
        assert_eq!(session.summary().accuracy_percent, 0.0);
    }
}
