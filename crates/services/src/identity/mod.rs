//! The hosted identity boundary: accounts, sessions and one-time codes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AuthProvider, AuthenticatedUser};

use crate::error::IdentityError;

mod local;
mod rest;

pub use local::LocalIdentityProvider;
pub use rest::RestIdentityProvider;

/// What a mailed one-time code was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpKind {
    /// Sign-in or sign-up confirmation.
    Email,
    /// Password recovery.
    Recovery,
}

impl OtpKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OtpKind::Email => "email",
            OtpKind::Recovery => "recovery",
        }
    }
}

/// An authenticated session as handed out by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthenticatedUser,
}

/// Fields that can be changed on the signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttributes {
    pub password: Option<String>,
    pub name: Option<String>,
}

impl UserAttributes {
    #[must_use]
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            name: None,
        }
    }

    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            password: None,
            name: Some(name.into()),
        }
    }
}

/// Client side of the identity service. Implementations keep the current
/// session, so calls after a successful sign-in act on that account.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account with a password and sign in.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UserAlreadyExists` for a taken email.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Session, IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` when the pair does not match.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError>;

    /// Mail a one-time code. With `create_user` an unknown email gets an account.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::UserNotFound` if the email is unknown and
    /// `create_user` is false.
    async fn sign_in_with_otp(
        &self,
        email: &str,
        name: Option<&str>,
        create_user: bool,
    ) -> Result<(), IdentityError>;

    /// Exchange a mailed code of the given kind for a session.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidOtp` for wrong or expired codes.
    async fn verify_otp(
        &self,
        email: &str,
        token: &str,
        kind: OtpKind,
    ) -> Result<Session, IdentityError>;

    /// Mail a password recovery code. Unknown emails succeed silently so
    /// the call does not reveal which addresses have accounts.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the request cannot be delivered.
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError` if the session cannot be read.
    async fn get_session(&self) -> Result<Option<Session>, IdentityError>;

    /// # Errors
    ///
    /// Returns `IdentityError` if the provider rejects the sign-out.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Update the signed-in account. Setting a password marks it as having one.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotSignedIn` without a session.
    async fn update_user(&self, attrs: &UserAttributes)
    -> Result<AuthenticatedUser, IdentityError>;

    /// URL that starts an OAuth sign-in and returns to `redirect_to`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidUrl` if the URL cannot be built.
    fn oauth_url(&self, provider: AuthProvider, redirect_to: &str)
    -> Result<String, IdentityError>;
}
