use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            display_name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS words (
            id INTEGER PRIMARY KEY,
            language TEXT NOT NULL CHECK (language IN ('source', 'target')),
            text TEXT NOT NULL,
            hint TEXT,
            UNIQUE (language, text)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS word_pairs (
            id INTEGER PRIMARY KEY,
            source_word_id INTEGER NOT NULL,
            target_word_id INTEGER NOT NULL,
            owner_user_id INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY (source_word_id) REFERENCES words(id),
            FOREIGN KEY (target_word_id) REFERENCES words(id),
            FOREIGN KEY (owner_user_id) REFERENCES users(id) ON DELETE CASCADE
        );
    ",
    // NULL owners never collide in a plain UNIQUE, so global and personal
    // pairs get separate partial indexes.
    r"
        CREATE UNIQUE INDEX IF NOT EXISTS ux_word_pairs_global
            ON word_pairs (source_word_id, target_word_id)
            WHERE owner_user_id IS NULL;
    ",
    r"
        CREATE UNIQUE INDEX IF NOT EXISTS ux_word_pairs_personal
            ON word_pairs (source_word_id, target_word_id, owner_user_id)
            WHERE owner_user_id IS NOT NULL;
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_word_pairs_owner
            ON word_pairs (owner_user_id);
    ",
    r"
        CREATE TABLE IF NOT EXISTS progress (
            user_id INTEGER NOT NULL,
            pair_id INTEGER NOT NULL,
            correct_streak INTEGER NOT NULL DEFAULT 0 CHECK (correct_streak >= 0),
            memorized INTEGER NOT NULL DEFAULT 0 CHECK (memorized IN (0, 1)),
            last_attempt_at TEXT,
            PRIMARY KEY (user_id, pair_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (pair_id) REFERENCES word_pairs(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS attempts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            pair_id INTEGER NOT NULL,
            correct INTEGER NOT NULL CHECK (correct IN (0, 1)),
            attempted_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (pair_id) REFERENCES word_pairs(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_attempts_user_pair_at
            ON attempts (user_id, pair_id, attempted_at);
    ",
    r"
        CREATE TABLE IF NOT EXISTS favorites (
            user_id INTEGER NOT NULL,
            pair_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, pair_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (pair_id) REFERENCES word_pairs(id) ON DELETE CASCADE
        );
    ",
];

/// Runs the versioned schema migrations.
///
/// Version 1 creates users, words, word pairs, progress, attempts and favorites.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1.iter().copied() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
