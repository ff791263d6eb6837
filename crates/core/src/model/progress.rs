use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{UserId, WordPairId};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Mastery phase of a (user, word pair) record.
///
/// `Unseen → Learning(streak) → Memorized`. An incorrect answer drops a
/// learning record back to `Learning(0)`; `Memorized` is only left through
/// [`Progress::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    Unseen,
    Learning { streak: u32 },
    Memorized,
}

//
// ─── ATTEMPT RESULT ────────────────────────────────────────────────────────────
//

/// What a single answer did to the progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub streak: u32,
    pub memorized: bool,
    /// True only on the call that crossed the memorization threshold.
    pub just_memorized: bool,
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Per-user mastery state for one word pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    user_id: UserId,
    pair_id: WordPairId,
    correct_streak: u32,
    memorized: bool,
    last_attempt_at: Option<DateTime<Utc>>,
}

impl Progress {
    /// Fresh record for a pair the user has never answered.
    #[must_use]
    pub fn new(user_id: UserId, pair_id: WordPairId) -> Self {
        Self {
            user_id,
            pair_id,
            correct_streak: 0,
            memorized: false,
            last_attempt_at: None,
        }
    }

    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        pair_id: WordPairId,
        correct_streak: u32,
        memorized: bool,
        last_attempt_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id,
            pair_id,
            correct_streak,
            memorized,
            last_attempt_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn pair_id(&self) -> WordPairId {
        self.pair_id
    }

    #[must_use]
    pub fn correct_streak(&self) -> u32 {
        self.correct_streak
    }

    #[must_use]
    pub fn is_memorized(&self) -> bool {
        self.memorized
    }

    #[must_use]
    pub fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempt_at
    }

    #[must_use]
    pub fn phase(&self) -> ProgressPhase {
        if self.memorized {
            ProgressPhase::Memorized
        } else if self.last_attempt_at.is_none() && self.correct_streak == 0 {
            ProgressPhase::Unseen
        } else {
            ProgressPhase::Learning {
                streak: self.correct_streak,
            }
        }
    }

    /// Counted in the "in progress" bucket of user stats.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        !self.memorized && self.correct_streak > 0
    }

    /// Applies one answer.
    ///
    /// A correct answer extends the streak (it keeps counting past the
    /// threshold) and memorizes the pair the first time the streak reaches
    /// `threshold`. An incorrect answer always zeroes the streak but never
    /// clears `memorized`.
    pub fn apply_attempt(
        &mut self,
        correct: bool,
        attempted_at: DateTime<Utc>,
        threshold: u32,
    ) -> AttemptResult {
        let mut just_memorized = false;

        if correct {
            self.correct_streak = self.correct_streak.saturating_add(1);
            if self.correct_streak >= threshold && !self.memorized {
                self.memorized = true;
                just_memorized = true;
            }
        } else {
            self.correct_streak = 0;
        }
        self.last_attempt_at = Some(attempted_at);

        AttemptResult {
            streak: self.correct_streak,
            memorized: self.memorized,
            just_memorized,
        }
    }

    /// True when the record is unmastered, mid-streak, and untouched for longer than `window`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        if self.memorized || self.correct_streak == 0 {
            return false;
        }
        self.last_attempt_at.is_some_and(|last| last < now - window)
    }

    /// Zeroes the streak of a stale record. Returns whether anything changed.
    pub fn decay(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        if !self.is_stale(now, window) {
            return false;
        }
        self.correct_streak = 0;
        true
    }

    /// Manual reset; the only transition out of `Memorized`.
    pub fn reset(&mut self) {
        self.correct_streak = 0;
        self.memorized = false;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
