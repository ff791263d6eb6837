use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use vocab_core::model::{
    Language, Outcome, OutcomeReason, UserId, Word, WordId, WordPair, WordPairDraft, WordPairId,
    WordText,
};

use super::{
    SqliteRepository, commit, db_err,
    mapping::{
        PAIR_COLUMNS, PAIR_JOINS, id_i64, map_pair_row, map_word_row, pair_id_from_i64,
        placeholders, ser, user_id_from_i64, word_id_from_i64,
    },
    user_write_err,
};
use crate::repository::{CatalogRepository, StorageError};

fn word_column(language: Language) -> &'static str {
    match language {
        Language::Source => "source_word_id",
        Language::Target => "target_word_id",
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

pub(crate) async fn resolve_word_in(
    conn: &mut SqliteConnection,
    language: Language,
    text: &WordText,
    hint: Option<&str>,
) -> Result<WordId, StorageError> {
    // A later hint only fills a blank; the first one recorded wins.
    let row = sqlx::query(
        r"
            INSERT INTO words (language, text, hint)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(language, text) DO UPDATE SET
                hint = COALESCE(words.hint, excluded.hint)
            RETURNING id
        ",
    )
    .bind(language.as_str())
    .bind(text.as_str())
    .bind(hint)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_err)?;
    word_id_from_i64(row.try_get("id").map_err(ser)?)
}

async fn find_pair(
    conn: &mut SqliteConnection,
    source: WordId,
    target: WordId,
    owner: Option<UserId>,
) -> Result<Option<WordPairId>, StorageError> {
    let owner = owner.map(|u| id_i64("user_id", u.value())).transpose()?;
    let row = sqlx::query(
        r"
            SELECT id FROM word_pairs
            WHERE source_word_id = ?1 AND target_word_id = ?2 AND owner_user_id IS ?3
        ",
    )
    .bind(id_i64("word_id", source.value())?)
    .bind(id_i64("word_id", target.value())?)
    .bind(owner)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;
    row.map(|r| pair_id_from_i64(r.try_get("id").map_err(ser)?))
        .transpose()
}

async fn resolve_draft(
    conn: &mut SqliteConnection,
    draft: &WordPairDraft,
) -> Result<(WordId, WordId), StorageError> {
    let source =
        resolve_word_in(conn, Language::Source, &draft.source, draft.hint.as_deref()).await?;
    let target = resolve_word_in(conn, Language::Target, &draft.target, None).await?;
    Ok((source, target))
}

pub(crate) async fn fetch_pair(
    conn: &mut SqliteConnection,
    pair: WordPairId,
) -> Result<Option<WordPair>, StorageError> {
    let sql = format!("SELECT {PAIR_COLUMNS} {PAIR_JOINS} WHERE p.id = ?1");
    let row = sqlx::query(&sql)
        .bind(id_i64("pair_id", pair.value())?)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;
    row.as_ref().map(map_pair_row).transpose()
}

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn resolve_word(
        &self,
        language: Language,
        text: &WordText,
        hint: Option<&str>,
    ) -> Result<WordId, StorageError> {
        let mut tx = self.begin().await?;
        let id = resolve_word_in(&mut tx, language, text, hint).await?;
        commit(tx).await?;
        Ok(id)
    }

    async fn import_global_pair(
        &self,
        draft: &WordPairDraft,
        now: DateTime<Utc>,
    ) -> Result<(WordPairId, bool), StorageError> {
        let mut tx = self.begin().await?;
        let (source, target) = resolve_draft(&mut tx, draft).await?;

        let res = sqlx::query(
            r"
                INSERT INTO word_pairs (source_word_id, target_word_id, owner_user_id, created_at)
                VALUES (?1, ?2, NULL, ?3)
                ON CONFLICT(source_word_id, target_word_id) WHERE owner_user_id IS NULL DO NOTHING
            ",
        )
        .bind(id_i64("word_id", source.value())?)
        .bind(id_i64("word_id", target.value())?)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let id = find_pair(&mut tx, source, target, None)
            .await?
            .ok_or(StorageError::NotFound)?;
        commit(tx).await?;
        Ok((id, res.rows_affected() > 0))
    }

    async fn add_user_pair(
        &self,
        user: UserId,
        draft: &WordPairDraft,
        now: DateTime<Utc>,
    ) -> Result<Outcome, StorageError> {
        let user_i64 = id_i64("user_id", user.value())?;
        let mut tx = self.begin().await?;
        let (source, target) = resolve_draft(&mut tx, draft).await?;

        let outcome = if let Some(global) = find_pair(&mut tx, source, target, None).await? {
            let res = sqlx::query(
                r"
                    INSERT INTO favorites (user_id, pair_id, created_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(user_id, pair_id) DO NOTHING
                ",
            )
            .bind(user_i64)
            .bind(id_i64("pair_id", global.value())?)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(user_write_err(user))?;
            let reason = if res.rows_affected() > 0 {
                OutcomeReason::AddedAsFavorite
            } else {
                OutcomeReason::AlreadyFavorite
            };
            Outcome::for_pair(reason, global)
        } else if let Some(owned) = find_pair(&mut tx, source, target, Some(user)).await? {
            Outcome::for_pair(OutcomeReason::AlreadyOwned, owned)
        } else {
            let row = sqlx::query(
                r"
                    INSERT INTO word_pairs
                        (source_word_id, target_word_id, owner_user_id, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    RETURNING id
                ",
            )
            .bind(id_i64("word_id", source.value())?)
            .bind(id_i64("word_id", target.value())?)
            .bind(user_i64)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            // the words resolved above roll back with the transaction
            .map_err(user_write_err(user))?;
            let id = pair_id_from_i64(row.try_get("id").map_err(ser)?)?;
            tracing::info!(user = %user, pair = %id, "created personal word pair");
            Outcome::for_pair(OutcomeReason::CreatedPersonal, id)
        };

        commit(tx).await?;
        Ok(outcome)
    }

    async fn remove_from_user_list(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Outcome, StorageError> {
        let user_i64 = id_i64("user_id", user.value())?;
        let pair_i64 = id_i64("pair_id", pair.value())?;
        let mut tx = self.begin().await?;

        let row = sqlx::query("SELECT owner_user_id FROM word_pairs WHERE id = ?1")
            .bind(pair_i64)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(Outcome::for_pair(OutcomeReason::PairNotFound, pair));
        };
        let owner = row
            .try_get::<Option<i64>, _>("owner_user_id")
            .map_err(ser)?
            .map(user_id_from_i64)
            .transpose()?;

        let reason = match owner {
            Some(owner) if owner == user => {
                for sql in [
                    "DELETE FROM progress WHERE pair_id = ?1",
                    "DELETE FROM attempts WHERE pair_id = ?1",
                    "DELETE FROM favorites WHERE pair_id = ?1",
                    "DELETE FROM word_pairs WHERE id = ?1",
                ] {
                    sqlx::query(sql)
                        .bind(pair_i64)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_err)?;
                }
                OutcomeReason::DeletedPersonal
            }
            Some(_) => OutcomeReason::NotOwner,
            None => {
                let res = sqlx::query("DELETE FROM favorites WHERE user_id = ?1 AND pair_id = ?2")
                    .bind(user_i64)
                    .bind(pair_i64)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_err)?;
                if res.rows_affected() > 0 {
                    OutcomeReason::RemovedFavorite
                } else {
                    OutcomeReason::NotFavorite
                }
            }
        };

        commit(tx).await?;
        Ok(Outcome::for_pair(reason, pair))
    }

    async fn get_pair(&self, pair: WordPairId) -> Result<Option<WordPair>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        fetch_pair(&mut conn, pair).await
    }

    async fn pairs_by_ids(&self, ids: &[WordPairId]) -> Result<Vec<WordPair>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {PAIR_COLUMNS} {PAIR_JOINS} WHERE p.id IN ({})",
            placeholders(1, ids.len())
        );
        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id_i64("pair_id", id.value())?);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(db_err)?;

        let mut by_id: HashMap<WordPairId, WordPair> = HashMap::with_capacity(rows.len());
        for row in rows {
            let pair = map_pair_row(&row)?;
            by_id.insert(pair.id(), pair);
        }

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            // Cloned rather than removed so repeated ids stay valid.
            match by_id.get(id) {
                Some(pair) => out.push(pair.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(out)
    }

    async fn personal_pairs(&self, user: UserId) -> Result<Vec<WordPair>, StorageError> {
        let sql = format!(
            r"
                SELECT {PAIR_COLUMNS} {PAIR_JOINS}
                WHERE p.owner_user_id = ?1
                ORDER BY p.created_at ASC, p.id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(map_pair_row).collect()
    }

    async fn global_pair_ids(&self) -> Result<Vec<WordPairId>, StorageError> {
        let rows = sqlx::query("SELECT id FROM word_pairs WHERE owner_user_id IS NULL ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|r| pair_id_from_i64(r.try_get("id").map_err(ser)?))
            .collect()
    }

    async fn answer_word_ids(
        &self,
        language: Language,
        excluding: WordId,
    ) -> Result<Vec<WordId>, StorageError> {
        let column = word_column(language);
        let sql = format!(
            r"
                SELECT DISTINCT {column} AS word_id
                FROM word_pairs
                WHERE {column} != ?1
                ORDER BY {column}
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("word_id", excluding.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|r| word_id_from_i64(r.try_get("word_id").map_err(ser)?))
            .collect()
    }

    async fn words_by_ids(&self, ids: &[WordId]) -> Result<Vec<Word>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT id, language, text, hint FROM words WHERE id IN ({})",
            placeholders(1, ids.len())
        );
        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id_i64("word_id", id.value())?);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(db_err)?;

        let mut by_id: HashMap<WordId, Word> = HashMap::with_capacity(rows.len());
        for row in rows {
            let word = map_word_row(&row)?;
            by_id.insert(word.id(), word);
        }
        ids.iter()
            .map(|id| by_id.get(id).cloned().ok_or(StorageError::NotFound))
            .collect()
    }

    async fn search_pairs(
        &self,
        user: UserId,
        language: Language,
        needle: &str,
        limit: u32,
    ) -> Result<Vec<WordPair>, StorageError> {
        let side = match language {
            Language::Source => "s",
            Language::Target => "t",
        };
        let sql = format!(
            r"
                SELECT {PAIR_COLUMNS} {PAIR_JOINS}
                WHERE (p.owner_user_id IS NULL OR p.owner_user_id = ?1)
                  AND {side}.text LIKE ?2 ESCAPE '\'
                ORDER BY p.id ASC
                LIMIT ?3
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user.value())?)
            .bind(escape_like(&needle.trim().to_lowercase()))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(map_pair_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(escape_like("cat"), "%cat%");
        assert_eq!(escape_like("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn word_columns_follow_language() {
        assert_eq!(word_column(Language::Source), "source_word_id");
        assert_eq!(word_column(Language::Target), "target_word_id");
    }
}
