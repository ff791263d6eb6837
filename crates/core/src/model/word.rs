use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::WordId;

/// Longest accepted source-language word, in characters.
pub const MAX_SOURCE_WORD_CHARS: usize = 40;
/// Longest accepted target-language word, in characters.
pub const MAX_TARGET_WORD_CHARS: usize = 250;
/// Longest accepted pronunciation hint, in characters.
pub const MAX_HINT_CHARS: usize = 255;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordError {
    #[error("{language} word cannot be empty")]
    Empty { language: Language },

    #[error("{language} word is too long: {len} chars (max {max})")]
    TooLong {
        language: Language,
        len: usize,
        max: usize,
    },

    #[error("{language} word contains control characters")]
    ControlCharacters { language: Language },

    #[error("pronunciation hint is too long: {len} chars (max {max})")]
    HintTooLong { len: usize, max: usize },

    #[error("invalid language: {0}")]
    InvalidLanguage(String),
}

//
// ─── LANGUAGE ──────────────────────────────────────────────────────────────────
//

/// Which side of a pair a word belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// The language being learned; carries the optional pronunciation hint.
    Source,
    /// The learner's language; quiz answers are drawn from this side.
    Target,
}

impl Language {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Source => "source",
            Language::Target => "target",
        }
    }

    /// Parses the storage representation produced by [`Language::as_str`].
    ///
    /// # Errors
    ///
    /// Returns `WordError::InvalidLanguage` for unknown values.
    pub fn parse(value: &str) -> Result<Self, WordError> {
        match value {
            "source" => Ok(Language::Source),
            "target" => Ok(Language::Target),
            other => Err(WordError::InvalidLanguage(other.to_string())),
        }
    }

    #[must_use]
    pub fn max_chars(self) -> usize {
        match self {
            Language::Source => MAX_SOURCE_WORD_CHARS,
            Language::Target => MAX_TARGET_WORD_CHARS,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── WORD TEXT ─────────────────────────────────────────────────────────────────
//

/// Normalized word text: trimmed, lowercased, length-checked.
///
/// Two inputs that differ only in case or surrounding whitespace produce the
/// same `WordText`, which is what the catalog deduplicates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordText(String);

impl WordText {
    /// Normalizes and validates raw user input for the given language.
    ///
    /// # Errors
    ///
    /// Returns `WordError` if the text is empty after trimming, too long, or
    /// contains control characters.
    pub fn new(language: Language, raw: impl AsRef<str>) -> Result<Self, WordError> {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(WordError::Empty { language });
        }
        if normalized.chars().any(char::is_control) {
            return Err(WordError::ControlCharacters { language });
        }
        let len = normalized.chars().count();
        let max = language.max_chars();
        if len > max {
            return Err(WordError::TooLong { language, len, max });
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WordText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims an optional pronunciation hint; blank hints become `None`.
///
/// # Errors
///
/// Returns `WordError::HintTooLong` when the trimmed hint exceeds the limit.
pub fn normalize_hint(hint: Option<&str>) -> Result<Option<String>, WordError> {
    let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    let len = hint.chars().count();
    if len > MAX_HINT_CHARS {
        return Err(WordError::HintTooLong {
            len,
            max: MAX_HINT_CHARS,
        });
    }
    Ok(Some(hint.to_string()))
}

//
// ─── WORD ──────────────────────────────────────────────────────────────────────
//

/// A catalogued word entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    id: WordId,
    language: Language,
    text: WordText,
    hint: Option<String>,
}

impl Word {
    #[must_use]
    pub fn new(id: WordId, language: Language, text: WordText, hint: Option<String>) -> Self {
        Self {
            id,
            language,
            text,
            hint,
        }
    }

    #[must_use]
    pub fn id(&self) -> WordId {
        self.id
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn text(&self) -> &WordText {
        &self.text
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}
