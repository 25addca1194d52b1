use async_trait::async_trait;

use super::SqliteRepository;
use super::mapping::map_attempts_row;
use crate::repository::{LoginAttemptRepository, LoginAttempts, StorageError};

#[async_trait]
impl LoginAttemptRepository for SqliteRepository {
    async fn get_attempts(&self, key: &str) -> Result<Option<LoginAttempts>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT key, failures, window_start, locked_until
            FROM login_attempts
            WHERE key = ?1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_attempts_row).transpose()
    }

    async fn save_attempts(&self, attempts: &LoginAttempts) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO login_attempts (key, failures, window_start, locked_until)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                failures = excluded.failures,
                window_start = excluded.window_start,
                locked_until = excluded.locked_until
            ",
        )
        .bind(&attempts.key)
        .bind(i64::from(attempts.failures))
        .bind(attempts.window_start)
        .bind(attempts.locked_until)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear_attempts(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM login_attempts WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
