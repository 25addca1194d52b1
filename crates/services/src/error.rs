//! Shared error types for the services crate.

use quiz_core::bank::BankError;
use quiz_core::model::CredentialError;
use quiz_core::model::UserId;
use quiz_core::quiz::{LobbyError, SessionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use thiserror::Error;

/// Errors reported by an `IdentityProvider`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("verification code is invalid or expired")]
    InvalidOtp,
    #[error("a user with this email already exists")]
    UserAlreadyExists,
    #[error("no account exists for this email")]
    UserNotFound,
    #[error("email confirmation is required before signing in")]
    ConfirmationRequired,
    #[error("no active session")]
    NotSignedIn,
    #[error("invalid identity service URL: {0}")]
    InvalidUrl(String),
    #[error("identity service returned status {status}: {message}")]
    HttpStatus {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("unexpected identity service response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("no profile for account {0}")]
    MissingProfile(UserId),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("invalid email or password ({remaining_attempts} attempts left)")]
    InvalidCredentials { remaining_attempts: u32 },
    #[error("too many failed attempts, try again in {retry_after_secs} seconds")]
    LockedOut { retry_after_secs: u64 },
    #[error("wait {retry_after_secs} seconds before requesting another code")]
    ResendTooSoon { retry_after_secs: u64 },
    #[error("no pending registration for this email")]
    NoPendingRegistration,
    #[error("verification code is invalid or expired")]
    InvalidCode,
    #[error("not signed in")]
    NotSignedIn,
    #[error("current password is incorrect")]
    IncorrectCurrentPassword,
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while running a game.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameError {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Lobby(#[from] LobbyError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {var}: {raw}")]
    InvalidValue { var: &'static str, raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("cannot read question bank {path}: {source}")]
    BankFile {
        path: String,
        source: std::io::Error,
    },
}
