use chrono::{DateTime, Utc};
use sqlx::Row;
use vocab_core::model::{Outcome, OutcomeReason, UserId, WordPair, WordPairId};

use super::{
    SqliteRepository, commit, db_err,
    mapping::{PAIR_COLUMNS, PAIR_JOINS, id_i64, map_pair_row, ser},
    user_write_err,
};
use crate::repository::{FavoriteRepository, StorageError};

#[async_trait::async_trait]
impl FavoriteRepository for SqliteRepository {
    async fn add_favorite(
        &self,
        user: UserId,
        pair: WordPairId,
        now: DateTime<Utc>,
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
        let owner: Option<i64> = row.try_get("owner_user_id").map_err(ser)?;
        if owner.is_some() {
            return Ok(Outcome::for_pair(OutcomeReason::NotGlobal, pair));
        }

        let res = sqlx::query(
            r"
                INSERT INTO favorites (user_id, pair_id, created_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id, pair_id) DO NOTHING
            ",
        )
        .bind(user_i64)
        .bind(pair_i64)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(user_write_err(user))?;
        commit(tx).await?;

        let reason = if res.rows_affected() > 0 {
            OutcomeReason::AddedAsFavorite
        } else {
            OutcomeReason::AlreadyFavorite
        };
        Ok(Outcome::for_pair(reason, pair))
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Outcome, StorageError> {
        let mut tx = self.begin().await?;
        let res = sqlx::query("DELETE FROM favorites WHERE user_id = ?1 AND pair_id = ?2")
            .bind(id_i64("user_id", user.value())?)
            .bind(id_i64("pair_id", pair.value())?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        commit(tx).await?;

        let reason = if res.rows_affected() > 0 {
            OutcomeReason::RemovedFavorite
        } else {
            OutcomeReason::NotFavorite
        };
        Ok(Outcome::for_pair(reason, pair))
    }

    async fn is_favorite(&self, user: UserId, pair: WordPairId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM favorites WHERE user_id = ?1 AND pair_id = ?2")
            .bind(id_i64("user_id", user.value())?)
            .bind(id_i64("pair_id", pair.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.is_some())
    }

    async fn favorite_pairs(&self, user: UserId) -> Result<Vec<WordPair>, StorageError> {
        let sql = format!(
            r"
                SELECT {PAIR_COLUMNS} {PAIR_JOINS}
                JOIN favorites f ON f.pair_id = p.id
                WHERE f.user_id = ?1
                ORDER BY f.created_at ASC, p.id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(map_pair_row).collect()
    }
}
