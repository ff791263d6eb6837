use serde::{Deserialize, Serialize};

/// Raw counters read from storage for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounts {
    pub memorized: u64,
    pub in_progress: u64,
    pub total_attempts: u64,
    pub correct_attempts: u64,
    pub personal_words: u64,
    pub favorites: u64,
}

/// Dashboard rollup for one user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub memorized_count: u64,
    pub in_progress_count: u64,
    pub total_attempts: u64,
    pub correct_attempts: u64,
    /// Percentage of correct attempts rounded to one decimal; 0 when there are none.
    pub accuracy_percent: f64,
    pub personal_word_count: u64,
    pub favorites_count: u64,
}

impl UserStats {
    #[must_use]
    pub fn from_counts(counts: UserCounts) -> Self {
        Self {
            memorized_count: counts.memorized,
            in_progress_count: counts.in_progress,
            total_attempts: counts.total_attempts,
            correct_attempts: counts.correct_attempts,
            accuracy_percent: accuracy_percent(counts.correct_attempts, counts.total_attempts, 1),
            personal_word_count: counts.personal_words,
            favorites_count: counts.favorites,
        }
    }
}

/// `correct / total * 100` rounded to `decimals` places, 0 when `total == 0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn accuracy_percent(correct: u64, total: u64, decimals: i32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let scale = 10_f64.powi(decimals);
    let raw = correct as f64 / total as f64 * 100.0;
    (raw * scale).round() / scale
}
