use serde::{Deserialize, Serialize};

use crate::model::ids::WordPairId;

/// Failure categories for business conditions that are reported, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    NotFound,
    DuplicateEntry,
    NotApplicable,
}

/// Why a catalog or favorites mutation ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum OutcomeReason {
    CreatedPersonal,
    AddedAsFavorite,
    AlreadyFavorite,
    AlreadyOwned,
    DeletedPersonal,
    RemovedFavorite,
    NotFavorite,
    PairNotFound,
    NotOwner,
    NotGlobal,
}

impl OutcomeReason {
    /// Failure category, or `None` when the operation changed something.
    #[must_use]
    pub fn failure(self) -> Option<FailureKind> {
        match self {
            OutcomeReason::CreatedPersonal
            | OutcomeReason::AddedAsFavorite
            | OutcomeReason::DeletedPersonal
            | OutcomeReason::RemovedFavorite => None,
            OutcomeReason::AlreadyFavorite | OutcomeReason::AlreadyOwned => {
                Some(FailureKind::DuplicateEntry)
            }
            OutcomeReason::NotFavorite | OutcomeReason::PairNotFound => {
                Some(FailureKind::NotFound)
            }
            OutcomeReason::NotOwner | OutcomeReason::NotGlobal => Some(FailureKind::NotApplicable),
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            OutcomeReason::CreatedPersonal => "new word added to your dictionary",
            OutcomeReason::AddedAsFavorite => "word found in the dictionary and added to favorites",
            OutcomeReason::AlreadyFavorite => "word is already in your favorites",
            OutcomeReason::AlreadyOwned => "you have already added this word",
            OutcomeReason::DeletedPersonal => "word deleted",
            OutcomeReason::RemovedFavorite => "word removed from favorites",
            OutcomeReason::NotFavorite => "word is not in your favorites",
            OutcomeReason::PairNotFound => "word not found",
            OutcomeReason::NotOwner => "word belongs to another user",
            OutcomeReason::NotGlobal => "only dictionary words can be added to favorites",
        }
    }
}

/// Structured result of a mutating catalog operation.
///
/// The dispatch layer turns this into user-facing text; it never needs to
/// inspect errors for expected conditions like duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub reason: OutcomeReason,
    pub pair_id: Option<WordPairId>,
}

impl Outcome {
    #[must_use]
    pub fn new(reason: OutcomeReason, pair_id: Option<WordPairId>) -> Self {
        Self { reason, pair_id }
    }

    #[must_use]
    pub fn for_pair(reason: OutcomeReason, pair_id: WordPairId) -> Self {
        Self::new(reason, Some(pair_id))
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.reason.failure().is_none()
    }

    #[must_use]
    pub fn failure(&self) -> Option<FailureKind> {
        self.reason.failure()
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        self.reason.message()
    }
}
