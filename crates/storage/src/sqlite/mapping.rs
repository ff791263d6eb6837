use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use vocab_core::model::{
    Language, Owner, Progress, UserId, Word, WordId, WordPair, WordPairId, WordText,
};

use crate::repository::{AttemptRecord, StorageError};

/// Column list matching [`map_pair_row`]; `s` is the source word, `t` the target.
pub(crate) const PAIR_COLUMNS: &str = r"
    p.id AS pair_id, p.owner_user_id,
    s.id AS source_id, s.text AS source_text, s.hint AS source_hint,
    t.id AS target_id, t.text AS target_text, t.hint AS target_hint
";

pub(crate) const PAIR_JOINS: &str = r"
    FROM word_pairs p
    JOIN words s ON s.id = p.source_word_id
    JOIN words t ON t.id = p.target_word_id
";

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    Ok(WordId::new(i64_to_u64("word_id", v)?))
}

pub(crate) fn pair_id_from_i64(v: i64) -> Result<WordPairId, StorageError> {
    Ok(WordPairId::new(i64_to_u64("pair_id", v)?))
}

fn word_from_columns(
    row: &SqliteRow,
    language: Language,
    id_col: &str,
    text_col: &str,
    hint_col: &str,
) -> Result<Word, StorageError> {
    let id = word_id_from_i64(row.try_get(id_col).map_err(ser)?)?;
    let text: String = row.try_get(text_col).map_err(ser)?;
    let text = WordText::new(language, text).map_err(ser)?;
    let hint: Option<String> = row.try_get(hint_col).map_err(ser)?;
    Ok(Word::new(id, language, text, hint))
}

pub(crate) fn map_word_row(row: &SqliteRow) -> Result<Word, StorageError> {
    let language: String = row.try_get("language").map_err(ser)?;
    let language = Language::parse(&language).map_err(ser)?;
    word_from_columns(row, language, "id", "text", "hint")
}

pub(crate) fn map_pair_row(row: &SqliteRow) -> Result<WordPair, StorageError> {
    let owner = row
        .try_get::<Option<i64>, _>("owner_user_id")
        .map_err(ser)?
        .map(user_id_from_i64)
        .transpose()?;
    Ok(WordPair::new(
        pair_id_from_i64(row.try_get("pair_id").map_err(ser)?)?,
        word_from_columns(row, Language::Source, "source_id", "source_text", "source_hint")?,
        word_from_columns(row, Language::Target, "target_id", "target_text", "target_hint")?,
        Owner::from_nullable(owner),
    ))
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<Progress, StorageError> {
    let streak: i64 = row.try_get("correct_streak").map_err(ser)?;
    let streak = u32::try_from(streak)
        .map_err(|_| StorageError::Serialization(format!("invalid correct_streak: {streak}")))?;
    let last_attempt_at: Option<DateTime<Utc>> = row.try_get("last_attempt_at").map_err(ser)?;
    Ok(Progress::from_persisted(
        user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        pair_id_from_i64(row.try_get("pair_id").map_err(ser)?)?,
        streak,
        row.try_get("memorized").map_err(ser)?,
        last_attempt_at,
    ))
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRecord, StorageError> {
    Ok(AttemptRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        pair_id: pair_id_from_i64(row.try_get("pair_id").map_err(ser)?)?,
        correct: row.try_get("correct").map_err(ser)?,
        attempted_at: row.try_get("attempted_at").map_err(ser)?,
    })
}

/// Builds `?start, ?start+1, ...` for an `IN (...)` list of `len` binds.
pub(crate) fn placeholders(start: usize, len: usize) -> String {
    (0..len)
        .map(|i| format!("?{}", start + i))
        .collect::<Vec<_>>()
        .join(", ")
}
