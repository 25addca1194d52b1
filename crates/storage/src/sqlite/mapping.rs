use quiz_core::model::{AuthProvider, UserId};
use sqlx::Row;

use crate::repository::{
    GameResultRecord, LocalAccount, LoginAttempts, StorageError, StoredAnswer, UserProfile,
};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_from_u64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    raw.parse::<UserId>().map_err(ser)
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserProfile, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let points: i64 = row.try_get("points").map_err(ser)?;
    Ok(UserProfile {
        id: user_id_from_str(&id)?,
        email: row.try_get("email").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        level: u32_from_i64("level", row.try_get::<i64, _>("level").map_err(ser)?)?,
        points: u64::try_from(points)
            .map_err(|_| StorageError::Serialization(format!("invalid points: {points}")))?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn answers_to_json(answers: &[StoredAnswer]) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn map_result_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<GameResultRecord, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    let answers: String = row.try_get("answers").map_err(ser)?;
    Ok(GameResultRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        user_id: user_id_from_str(&user_id)?,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get::<i64, _>("correct_answers").map_err(ser)?,
        )?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        answers: serde_json::from_str(&answers).map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

pub(crate) fn map_attempts_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LoginAttempts, StorageError> {
    Ok(LoginAttempts {
        key: row.try_get("key").map_err(ser)?,
        failures: u32_from_i64("failures", row.try_get::<i64, _>("failures").map_err(ser)?)?,
        window_start: row.try_get("window_start").map_err(ser)?,
        locked_until: row.try_get("locked_until").map_err(ser)?,
    })
}

pub(crate) fn map_account_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LocalAccount, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let provider: String = row.try_get("provider").map_err(ser)?;
    Ok(LocalAccount {
        id: user_id_from_str(&id)?,
        email: row.try_get("email").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        password_hash: row.try_get("password_hash").map_err(ser)?,
        provider: AuthProvider::parse(&provider)
            .ok_or_else(|| StorageError::Serialization(format!("invalid provider: {provider}")))?,
        google_linked: row.try_get("google_linked").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
