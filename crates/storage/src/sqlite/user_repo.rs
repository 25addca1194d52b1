use async_trait::async_trait;
use quiz_core::model::UserId;

use super::SqliteRepository;
use super::mapping::{i64_from_u64, map_user_row};
use crate::repository::{StorageError, UserProfile, UserRepository};

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, email, name, level, points, created_at, updated_at
            FROM users
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn insert_user(&self, profile: &UserProfile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, email, name, level, points, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(profile.id.to_string())
        .bind(&profile.email)
        .bind(profile.name.as_deref())
        .bind(i64::from(profile.level))
        .bind(i64_from_u64("points", profile.points)?)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StorageError::Conflict
            } else {
                StorageError::Connection(err.to_string())
            }
        })?;

        Ok(())
    }

    async fn update_user(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE users
            SET email = ?2, name = ?3, level = ?4, points = ?5, updated_at = ?6
            WHERE id = ?1
            ",
        )
        .bind(profile.id.to_string())
        .bind(&profile.email)
        .bind(profile.name.as_deref())
        .bind(i64::from(profile.level))
        .bind(i64_from_u64("points", profile.points)?)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
