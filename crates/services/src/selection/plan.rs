use std::collections::HashSet;

use serde::Serialize;
use vocab_core::model::{WordPair, WordPairId};

use crate::random::{RandomSource, sample};

/// One word pair scheduled into a study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    pub pair: WordPair,
    /// True when the pair belongs to the user rather than the global dictionary.
    pub is_personal: bool,
}

impl SessionEntry {
    #[must_use]
    pub fn pair_id(&self) -> WordPairId {
        self.pair.id()
    }
}

/// Selection result for one session build, with per-tier counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionPlan {
    pub entries: Vec<SessionEntry>,
    pub personal_selected: usize,
    pub favorite_selected: usize,
    pub global_selected: usize,
}

impl SessionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn pair_ids(&self) -> Vec<WordPairId> {
        self.entries.iter().map(SessionEntry::pair_id).collect()
    }

    /// Appends fetched random global pairs, skipping any already planned.
    pub fn extend_global(&mut self, pairs: impl IntoIterator<Item = WordPair>) {
        let mut planned: HashSet<WordPairId> = self.pair_ids().into_iter().collect();
        for pair in pairs {
            if planned.insert(pair.id()) {
                self.entries.push(SessionEntry {
                    pair,
                    is_personal: false,
                });
                self.global_selected += 1;
            }
        }
    }
}

/// Fills a bounded batch tier by tier: personal pairs, then favorites, then
/// random global pairs. Memorized pairs never enter the batch.
pub struct SessionBuilder<'a> {
    batch_size: usize,
    memorized: &'a HashSet<WordPairId>,
}

impl<'a> SessionBuilder<'a> {
    #[must_use]
    pub fn new(batch_size: u32, memorized: &'a HashSet<WordPairId>) -> Self {
        Self {
            batch_size: usize::try_from(batch_size).unwrap_or(usize::MAX),
            memorized,
        }
    }

    /// Plans the first two tiers.
    ///
    /// - `personal` is taken in the given order and truncated to the batch size.
    /// - `favorites` fill what remains, skipping pairs already planned.
    #[must_use]
    pub fn plan_owned(
        &self,
        personal: impl IntoIterator<Item = WordPair>,
        favorites: impl IntoIterator<Item = WordPair>,
    ) -> SessionPlan {
        let mut plan = SessionPlan::default();
        let mut planned = HashSet::new();

        for pair in personal {
            if plan.entries.len() >= self.batch_size {
                break;
            }
            if self.memorized.contains(&pair.id()) || !planned.insert(pair.id()) {
                continue;
            }
            plan.entries.push(SessionEntry {
                pair,
                is_personal: true,
            });
            plan.personal_selected += 1;
        }

        for pair in favorites {
            if plan.entries.len() >= self.batch_size {
                break;
            }
            if self.memorized.contains(&pair.id()) || !planned.insert(pair.id()) {
                continue;
            }
            plan.entries.push(SessionEntry {
                pair,
                is_personal: false,
            });
            plan.favorite_selected += 1;
        }

        plan
    }

    /// Draws global pair ids for the slots `plan` leaves open, uniformly and
    /// without replacement.
    #[must_use]
    pub fn pick_global(
        &self,
        plan: &SessionPlan,
        global_ids: impl IntoIterator<Item = WordPairId>,
        random: &dyn RandomSource,
    ) -> Vec<WordPairId> {
        let remaining = self.batch_size.saturating_sub(plan.total());
        if remaining == 0 {
            return Vec::new();
        }
        let planned: HashSet<WordPairId> = plan.pair_ids().into_iter().collect();
        let candidates: Vec<WordPairId> = global_ids
            .into_iter()
            .filter(|id| !planned.contains(id) && !self.memorized.contains(id))
            .collect();
        sample(random, candidates, remaining)
    }
}
