use chrono::Duration;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("session batch size must be > 0")]
    InvalidSessionBatchSize,

    #[error("memorization threshold must be > 0")]
    InvalidMemorizationThreshold,

    #[error("stale reset days must be > 0")]
    InvalidStaleResetDays,

    #[error("distractor count must be between 1 and {max}")]
    InvalidDistractorCount { max: u32 },
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

pub const DEFAULT_SESSION_BATCH_SIZE: u32 = 20;
pub const DEFAULT_MEMORIZATION_THRESHOLD: u32 = 5;
pub const DEFAULT_STALE_RESET_DAYS: u32 = 5;
pub const DEFAULT_DISTRACTOR_COUNT: u32 = 3;
pub const MAX_DISTRACTOR_COUNT: u32 = 10;

/// Tunables consumed by the progress and selection engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearningSettings {
    session_batch_size: u32,
    memorization_threshold: u32,
    stale_reset_days: u32,
    distractor_count: u32,
}

impl LearningSettings {
    /// Creates validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any value is zero or the distractor count is
    /// above [`MAX_DISTRACTOR_COUNT`].
    pub fn new(
        session_batch_size: u32,
        memorization_threshold: u32,
        stale_reset_days: u32,
        distractor_count: u32,
    ) -> Result<Self, SettingsError> {
        if session_batch_size == 0 {
            return Err(SettingsError::InvalidSessionBatchSize);
        }
        if memorization_threshold == 0 {
            return Err(SettingsError::InvalidMemorizationThreshold);
        }
        if stale_reset_days == 0 {
            return Err(SettingsError::InvalidStaleResetDays);
        }
        if distractor_count == 0 || distractor_count > MAX_DISTRACTOR_COUNT {
            return Err(SettingsError::InvalidDistractorCount {
                max: MAX_DISTRACTOR_COUNT,
            });
        }
        Ok(Self {
            session_batch_size,
            memorization_threshold,
            stale_reset_days,
            distractor_count,
        })
    }

    #[must_use]
    pub fn session_batch_size(&self) -> u32 {
        self.session_batch_size
    }

    #[must_use]
    pub fn memorization_threshold(&self) -> u32 {
        self.memorization_threshold
    }

    #[must_use]
    pub fn stale_reset_days(&self) -> u32 {
        self.stale_reset_days
    }

    #[must_use]
    pub fn distractor_count(&self) -> u32 {
        self.distractor_count
    }

    /// Inactivity window after which unmastered streaks decay.
    #[must_use]
    pub fn stale_window(&self) -> Duration {
        Duration::days(i64::from(self.stale_reset_days))
    }
}

impl Default for LearningSettings {
    fn default() -> Self {
        Self {
            session_batch_size: DEFAULT_SESSION_BATCH_SIZE,
            memorization_threshold: DEFAULT_MEMORIZATION_THRESHOLD,
            stale_reset_days: DEFAULT_STALE_RESET_DAYS,
            distractor_count: DEFAULT_DISTRACTOR_COUNT,
        }
    }
}
