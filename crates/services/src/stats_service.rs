use std::sync::Arc;

use storage::repository::ProgressRepository;
use vocab_core::model::{UserId, UserStats};

use crate::error::StatsError;

/// Read-only dashboard rollups.
#[derive(Clone)]
pub struct StatsService {
    progress: Arc<dyn ProgressRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self { progress }
    }

    /// # Errors
    ///
    /// Returns `StatsError::Storage` if the counters cannot be read.
    pub async fn user_stats(&self, user: UserId) -> Result<UserStats, StatsError> {
        let counts = self.progress.user_counts(user).await?;
        Ok(UserStats::from_counts(counts))
    }
}
