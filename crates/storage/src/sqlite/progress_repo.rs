use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqliteConnection};
use vocab_core::model::{AttemptResult, Progress, UserCounts, UserId, WordPairId};

use super::{
    SqliteRepository, commit, db_err,
    mapping::{id_i64, map_attempt_row, map_progress_row, pair_id_from_i64, ser},
    user_write_err,
};
use crate::repository::{AttemptRecord, ProgressRepository, ProgressUpdate, StorageError};

async fn pair_exists(conn: &mut SqliteConnection, pair: i64) -> Result<bool, StorageError> {
    let row = sqlx::query("SELECT 1 FROM word_pairs WHERE id = ?1")
        .bind(pair)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_err)?;
    Ok(row.is_some())
}

async fn load_progress(
    conn: &mut SqliteConnection,
    user: i64,
    pair: i64,
) -> Result<Option<Progress>, StorageError> {
    let row = sqlx::query(
        r"
            SELECT user_id, pair_id, correct_streak, memorized, last_attempt_at
            FROM progress
            WHERE user_id = ?1 AND pair_id = ?2
        ",
    )
    .bind(user)
    .bind(pair)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;
    row.as_ref().map(map_progress_row).transpose()
}

fn count(row: &sqlx::sqlite::SqliteRow, column: &'static str) -> Result<u64, StorageError> {
    let v: i64 = row.try_get(column).map_err(ser)?;
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{column} sign overflow")))
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Option<Progress>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        load_progress(
            &mut conn,
            id_i64("user_id", user.value())?,
            id_i64("pair_id", pair.value())?,
        )
        .await
    }

    async fn ensure_progress(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Progress, StorageError> {
        let user_i64 = id_i64("user_id", user.value())?;
        let pair_i64 = id_i64("pair_id", pair.value())?;
        let mut tx = self.begin().await?;

        if !pair_exists(&mut tx, pair_i64).await? {
            return Err(StorageError::NotFound);
        }
        sqlx::query(
            r"
                INSERT INTO progress (user_id, pair_id, correct_streak, memorized, last_attempt_at)
                VALUES (?1, ?2, 0, 0, NULL)
                ON CONFLICT(user_id, pair_id) DO NOTHING
            ",
        )
        .bind(user_i64)
        .bind(pair_i64)
        .execute(&mut *tx)
        .await
        .map_err(user_write_err(user))?;

        let progress = load_progress(&mut tx, user_i64, pair_i64)
            .await?
            .ok_or(StorageError::NotFound)?;
        commit(tx).await?;
        Ok(progress)
    }

    async fn record_attempt(
        &self,
        attempt: &AttemptRecord,
        update: ProgressUpdate<'_>,
    ) -> Result<(i64, AttemptResult), StorageError> {
        let user_i64 = id_i64("user_id", attempt.user_id.value())?;
        let pair_i64 = id_i64("pair_id", attempt.pair_id.value())?;
        let mut tx = self.begin().await?;

        if !pair_exists(&mut tx, pair_i64).await? {
            return Err(StorageError::NotFound);
        }

        let mut progress = load_progress(&mut tx, user_i64, pair_i64)
            .await?
            .unwrap_or_else(|| Progress::new(attempt.user_id, attempt.pair_id));
        let result = update(&mut progress);

        let res = sqlx::query(
            r"
                INSERT INTO attempts (user_id, pair_id, correct, attempted_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(user_i64)
        .bind(pair_i64)
        .bind(attempt.correct)
        .bind(attempt.attempted_at)
        .execute(&mut *tx)
        .await
        .map_err(user_write_err(attempt.user_id))?;
        let attempt_id = res.last_insert_rowid();

        sqlx::query(
            r"
                INSERT INTO progress (user_id, pair_id, correct_streak, memorized, last_attempt_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, pair_id) DO UPDATE SET
                    correct_streak = excluded.correct_streak,
                    memorized = excluded.memorized,
                    last_attempt_at = excluded.last_attempt_at
            ",
        )
        .bind(user_i64)
        .bind(pair_i64)
        .bind(i64::from(progress.correct_streak()))
        .bind(progress.is_memorized())
        .bind(progress.last_attempt_at())
        .execute(&mut *tx)
        .await
        .map_err(user_write_err(attempt.user_id))?;

        commit(tx).await?;
        Ok((attempt_id, result))
    }

    async fn memorized_pair_ids(&self, user: UserId) -> Result<Vec<WordPairId>, StorageError> {
        let rows = sqlx::query(
            "SELECT pair_id FROM progress WHERE user_id = ?1 AND memorized = 1 ORDER BY pair_id",
        )
        .bind(id_i64("user_id", user.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|r| pair_id_from_i64(r.try_get("pair_id").map_err(ser)?))
            .collect()
    }

    async fn decay_stale(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<u64, StorageError> {
        let cutoff = now - window;
        let mut tx = self.begin().await?;
        let res = sqlx::query(
            r"
                UPDATE progress
                SET correct_streak = 0
                WHERE user_id = ?1
                  AND memorized = 0
                  AND correct_streak > 0
                  AND last_attempt_at IS NOT NULL
                  AND julianday(last_attempt_at) < julianday(?2)
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(cutoff)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        commit(tx).await?;
        Ok(res.rows_affected())
    }

    async fn reset_progress(&self, user: UserId, pair: WordPairId) -> Result<bool, StorageError> {
        let mut tx = self.begin().await?;
        let res = sqlx::query(
            r"
                UPDATE progress
                SET correct_streak = 0, memorized = 0
                WHERE user_id = ?1 AND pair_id = ?2
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(id_i64("pair_id", pair.value())?)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        commit(tx).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn attempts_for_pair(
        &self,
        user: UserId,
        pair: WordPairId,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, pair_id, correct, attempted_at
                FROM attempts
                WHERE user_id = ?1 AND pair_id = ?2
                ORDER BY attempted_at ASC, id ASC
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .bind(id_i64("pair_id", pair.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }

    async fn user_counts(&self, user: UserId) -> Result<UserCounts, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    (SELECT COUNT(*) FROM progress
                        WHERE user_id = ?1 AND memorized = 1) AS memorized,
                    (SELECT COUNT(*) FROM progress
                        WHERE user_id = ?1 AND memorized = 0 AND correct_streak > 0) AS in_progress,
                    (SELECT COUNT(*) FROM attempts WHERE user_id = ?1) AS total_attempts,
                    (SELECT COUNT(*) FROM attempts
                        WHERE user_id = ?1 AND correct = 1) AS correct_attempts,
                    (SELECT COUNT(*) FROM word_pairs WHERE owner_user_id = ?1) AS personal_words,
                    (SELECT COUNT(*) FROM favorites WHERE user_id = ?1) AS favorites
            ",
        )
        .bind(id_i64("user_id", user.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(UserCounts {
            memorized: count(&row, "memorized")?,
            in_progress: count(&row, "in_progress")?,
            total_attempts: count(&row, "total_attempts")?,
            correct_attempts: count(&row, "correct_attempts")?,
            personal_words: count(&row, "personal_words")?,
            favorites: count(&row, "favorites")?,
        })
    }
}
