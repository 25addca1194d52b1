use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AuthProvider, UserId, credentials::truncate_profile_name};
use quiz_core::quiz::AnswerRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── USERS ─────────────────────────────────────────────────────────────────────
//

/// Row of the `users` table: the persisted profile of an authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub level: u32,
    pub points: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Fresh profile at level 1 with no points. Names over the limit are truncated.
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>, name: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.and_then(truncate_profile_name),
            level: 1,
            points: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a profile by account id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. A missing row is `Ok(None)`.
    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError>;

    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a profile with the same id exists.
    async fn insert_user(&self, profile: &UserProfile) -> Result<(), StorageError>;

    /// Overwrite an existing profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no profile with that id.
    async fn update_user(&self, profile: &UserProfile) -> Result<(), StorageError>;
}

//
// ─── GAME RESULTS ──────────────────────────────────────────────────────────────
//

/// One answered (or timed-out) question inside a stored game result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAnswer {
    pub question_id: u64,
    pub selected: Option<usize>,
    pub correct: bool,
    pub points: u32,
    pub seconds_remaining: u32,
}

impl From<&AnswerRecord> for StoredAnswer {
    fn from(record: &AnswerRecord) -> Self {
        Self {
            question_id: record.question_id.value(),
            selected: record.selected,
            correct: record.correct,
            points: record.points,
            seconds_remaining: record.seconds_remaining,
        }
    }
}

/// Row of the `quiz_results` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResultRecord {
    pub id: Option<i64>,
    pub user_id: UserId,
    pub score: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub answers: Vec<StoredAnswer>,
    pub completed_at: DateTime<Utc>,
}

#[async_trait]
pub trait GameResultRepository: Send + Sync {
    /// Append a finished game for one account. Returns the new row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &GameResultRecord) -> Result<i64, StorageError>;

    /// All results of an account, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_results(&self, user_id: UserId) -> Result<Vec<GameResultRecord>, StorageError>;
}

//
// ─── LOGIN ATTEMPTS ────────────────────────────────────────────────────────────
//

/// Row of the `login_attempts` table: failed sign-ins for one email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempts {
    pub key: String,
    pub failures: u32,
    pub window_start: DateTime<Utc>,
    pub locked_until: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait LoginAttemptRepository: Send + Sync {
    /// Attempts recorded for a normalized email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures. No row is `Ok(None)`.
    async fn get_attempts(&self, key: &str) -> Result<Option<LoginAttempts>, StorageError>;

    /// Insert or replace the row for `attempts.key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    async fn save_attempts(&self, attempts: &LoginAttempts) -> Result<(), StorageError>;

    /// Forget every attempt for `key`. Clearing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn clear_attempts(&self, key: &str) -> Result<(), StorageError>;
}

//
// ─── IDENTITY ACCOUNTS ─────────────────────────────────────────────────────────
//

/// Row of the `identity_accounts` table, owned by the local identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalAccount {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    /// `salt$digest`, absent for accounts created through OAuth or a code.
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
    pub google_linked: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Look an account up by normalized email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_account(&self, email: &str) -> Result<Option<LocalAccount>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email or id is taken.
    async fn insert_account(&self, account: &LocalAccount) -> Result<(), StorageError>;

    /// Overwrite the account with the same email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no such account.
    async fn update_account(&self, account: &LocalAccount) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<Mutex<HashMap<UserId, UserProfile>>>,
    results: Arc<Mutex<Vec<GameResultRecord>>>,
    attempts: Arc<Mutex<HashMap<String, LoginAttempts>>>,
    accounts: Arc<Mutex<HashMap<String, LocalAccount>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn insert_user(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&profile.id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn update_user(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let slot = guard.get_mut(&profile.id).ok_or(StorageError::NotFound)?;
        *slot = profile.clone();
        Ok(())
    }
}

#[async_trait]
impl GameResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &GameResultRecord) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?
            + 1;
        let mut stored = result.clone();
        stored.id = Some(id);
        guard.push(stored);
        Ok(id)
    }

    async fn list_results(&self, user_id: UserId) -> Result<Vec<GameResultRecord>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<_> = guard
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }
}

#[async_trait]
impl LoginAttemptRepository for InMemoryRepository {
    async fn get_attempts(&self, key: &str) -> Result<Option<LoginAttempts>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn save_attempts(&self, attempts: &LoginAttempts) -> Result<(), StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(attempts.key.clone(), attempts.clone());
        Ok(())
    }

    async fn clear_attempts(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryRepository {
    async fn get_account(&self, email: &str) -> Result<Option<LocalAccount>, StorageError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(email).cloned())
    }

    async fn insert_account(&self, account: &LocalAccount) -> Result<(), StorageError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&account.email) || guard.values().any(|a| a.id == account.id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(account.email.clone(), account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &LocalAccount) -> Result<(), StorageError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let slot = guard.get_mut(&account.email).ok_or(StorageError::NotFound)?;
        *slot = account.clone();
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub results: Arc<dyn GameResultRepository>,
    pub attempts: Arc<dyn LoginAttemptRepository>,
    pub accounts: Arc<dyn AccountRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            attempts: Arc::new(repo.clone()),
            accounts: Arc::new(repo),
        }
    }
}
