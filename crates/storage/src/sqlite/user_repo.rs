use chrono::{DateTime, Utc};
use sqlx::Row;
use vocab_core::model::UserId;

use super::{
    SqliteRepository, commit, db_err,
    mapping::{id_i64, ser, user_id_from_i64},
};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn ensure_user(
        &self,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, StorageError> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r"
                INSERT INTO users (display_name, created_at)
                VALUES (?1, ?2)
                ON CONFLICT(display_name) DO NOTHING
            ",
        )
        .bind(display_name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        let row = sqlx::query("SELECT id FROM users WHERE display_name = ?1")
            .bind(display_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;
        let id = user_id_from_i64(row.try_get("id").map_err(ser)?)?;

        commit(tx).await?;
        Ok(id)
    }

    async fn delete_user(&self, user: UserId) -> Result<bool, StorageError> {
        // Personal pairs go with the user; their progress, attempts and
        // favorites follow through the pair foreign keys.
        let mut tx = self.begin().await?;
        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id_i64("user_id", user.value())?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        commit(tx).await?;
        Ok(res.rows_affected() > 0)
    }
}
