use serde::{Deserialize, Serialize};

use crate::model::ids::{UserId, WordPairId};
use crate::model::word::{Language, Word, WordError, WordText, normalize_hint};

/// Who controls a word pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// Shared dictionary entry; read-only for every user.
    Global,
    /// Private entry, visible to and editable by one user only.
    User(UserId),
}

impl Owner {
    #[must_use]
    pub fn is_global(self) -> bool {
        matches!(self, Owner::Global)
    }

    #[must_use]
    pub fn user(self) -> Option<UserId> {
        match self {
            Owner::Global => None,
            Owner::User(id) => Some(id),
        }
    }

    /// Builds an owner from the nullable storage column.
    #[must_use]
    pub fn from_nullable(user: Option<UserId>) -> Self {
        user.map_or(Owner::Global, Owner::User)
    }
}

/// Validated input for adding a pair: both texts normalized, hint trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPairDraft {
    pub source: WordText,
    pub target: WordText,
    pub hint: Option<String>,
}

impl WordPairDraft {
    /// Normalizes and validates raw texts.
    ///
    /// # Errors
    ///
    /// Returns `WordError` when either text or the hint fails validation.
    pub fn new(source: &str, target: &str, hint: Option<&str>) -> Result<Self, WordError> {
        Ok(Self {
            source: WordText::new(Language::Source, source)?,
            target: WordText::new(Language::Target, target)?,
            hint: normalize_hint(hint)?,
        })
    }
}

/// A (source word, target word) association with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    id: WordPairId,
    source: Word,
    target: Word,
    owner: Owner,
}

impl WordPair {
    #[must_use]
    pub fn new(id: WordPairId, source: Word, target: Word, owner: Owner) -> Self {
        Self {
            id,
            source,
            target,
            owner,
        }
    }

    #[must_use]
    pub fn id(&self) -> WordPairId {
        self.id
    }

    #[must_use]
    pub fn source(&self) -> &Word {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &Word {
        &self.target
    }

    #[must_use]
    pub fn owner(&self) -> Owner {
        self.owner
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.owner.is_global()
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == Owner::User(user)
    }

    /// Pronunciation hint of the source word, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.source.hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::WordId;

    fn pair(owner: Owner) -> WordPair {
        let source = Word::new(
            WordId::new(1),
            Language::Source,
            WordText::new(Language::Source, "cat").unwrap(),
            Some("[kæt]".into()),
        );
        let target = Word::new(
            WordId::new(2),
            Language::Target,
            WordText::new(Language::Target, "кошка").unwrap(),
            None,
        );
        WordPair::new(WordPairId::new(10), source, target, owner)
    }

    #[test]
    fn ownership_checks() {
        let user = UserId::new(3);
        let personal = pair(Owner::User(user));
        assert!(personal.is_owned_by(user));
        assert!(!personal.is_owned_by(UserId::new(4)));
        assert!(!personal.is_global());

        let global = pair(Owner::Global);
        assert!(global.is_global());
        assert!(!global.is_owned_by(user));
        assert_eq!(global.hint(), Some("[kæt]"));
    }

    #[test]
    fn owner_from_nullable_column() {
        assert_eq!(Owner::from_nullable(None), Owner::Global);
        assert_eq!(
            Owner::from_nullable(Some(UserId::new(5))).user(),
            Some(UserId::new(5))
        );
    }

    #[test]
    fn draft_normalizes_both_sides() {
        let draft = WordPairDraft::new(" Cat ", "КОШКА", Some("  ")).unwrap();
        assert_eq!(draft.source.as_str(), "cat");
        assert_eq!(draft.target.as_str(), "кошка");
        assert_eq!(draft.hint, None);
    }

    #[test]
    fn draft_rejects_empty_target() {
        let err = WordPairDraft::new("cat", "", None).unwrap_err();
        assert_eq!(
            err,
            WordError::Empty {
                language: Language::Target
            }
        );
    }
}
