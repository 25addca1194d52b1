use async_trait::async_trait;
use quiz_core::model::UserId;

use super::SqliteRepository;
use super::mapping::{answers_to_json, map_result_row};
use crate::repository::{GameResultRecord, GameResultRepository, StorageError};

#[async_trait]
impl GameResultRepository for SqliteRepository {
    async fn append_result(&self, result: &GameResultRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    user_id, score, correct_answers, total_questions, answers, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(result.user_id.to_string())
        .bind(i64::from(result.score))
        .bind(i64::from(result.correct_answers))
        .bind(i64::from(result.total_questions))
        .bind(answers_to_json(&result.answers)?)
        .bind(result.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn list_results(&self, user_id: UserId) -> Result<Vec<GameResultRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, score, correct_answers, total_questions, answers, completed_at
                FROM quiz_results
                WHERE user_id = ?1
                ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_result_row).collect()
    }
}
