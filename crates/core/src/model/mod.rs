mod attempt;
mod ids;
mod outcome;
mod pair;
mod progress;
mod settings;
mod stats;
mod word;

pub use ids::{ParseIdError, UserId, WordId, WordPairId};

pub use attempt::Attempt;
pub use outcome::{FailureKind, Outcome, OutcomeReason};
pub use pair::{Owner, WordPair, WordPairDraft};
pub use progress::{AttemptResult, Progress, ProgressPhase};
pub use settings::{
    DEFAULT_DISTRACTOR_COUNT, DEFAULT_MEMORIZATION_THRESHOLD, DEFAULT_SESSION_BATCH_SIZE,
    DEFAULT_STALE_RESET_DAYS, LearningSettings, MAX_DISTRACTOR_COUNT, SettingsError,
};
pub use stats::{UserCounts, UserStats, accuracy_percent};
pub use word::{
    Language, MAX_HINT_CHARS, MAX_SOURCE_WORD_CHARS, MAX_TARGET_WORD_CHARS, Word, WordError,
    WordText, normalize_hint,
};
