use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{UserId, WordPairId};

/// One answer in the append-only attempt log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub user_id: UserId,
    pub pair_id: WordPairId,
    pub correct: bool,
    pub attempted_at: DateTime<Utc>,
}

impl Attempt {
    #[must_use]
    pub fn new(
        user_id: UserId,
        pair_id: WordPairId,
        correct: bool,
        attempted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            pair_id,
            correct,
            attempted_at,
        }
    }
}
