//! Sign-in, registration and account flows on top of an `IdentityProvider`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use quiz_core::Clock;
use quiz_core::model::credentials::{
    normalize_email, profile_name, validate_email, validate_otp, validate_password,
    validate_sign_up_name,
};
use quiz_core::model::{AuthProvider, AuthenticatedUser, CredentialError, GuestUser, User};
use storage::repository::LoginAttemptRepository;
use tokio::sync::{Mutex, broadcast};

use crate::config::LoginLimits;
use crate::error::{AuthError, IdentityError};
use crate::identity::{IdentityProvider, OtpKind, Session, UserAttributes};
use crate::login_limiter::{FailureVerdict, LoginLimiter, seconds_until};
use crate::profile_service::ProfileService;

/// How long a mailed registration code stays usable.
pub const REGISTRATION_TTL_MINUTES: i64 = 10;
/// Minimum gap between two codes for the same email.
pub const RESEND_COOLDOWN_SECONDS: i64 = 60;
pub use quiz_core::model::GUEST_NAME;

const AUTH_EVENT_CAPACITY: usize = 16;

/// Emitted whenever the signed-in user changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut,
}

/// A registration waiting for its code.
#[derive(Debug, Clone)]
struct PendingRegistration {
    name: String,
    password: Option<String>,
    sent_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

pub struct AuthService {
    clock: Clock,
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<ProfileService>,
    limiter: LoginLimiter,
    pending: Mutex<HashMap<String, PendingRegistration>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        clock: Clock,
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<ProfileService>,
        attempts: Arc<dyn LoginAttemptRepository>,
        limits: LoginLimits,
    ) -> Self {
        let (events, _rx) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            clock,
            provider,
            profiles,
            limiter: LoginLimiter::new(limits, attempts),
            pending: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to sign-in and sign-out notifications.
    #[must_use]
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Password sign-in, rate limited per email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LockedOut` while the email is locked (the provider
    /// is not contacted), `AuthError::InvalidCredentials` with the remaining
    /// budget on a wrong password, and `AuthError::Credential` for malformed input.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(CredentialError::PasswordRequired.into());
        }
        let key = normalize_email(email);
        let now = self.clock.now();

        if let Some(until) = self.limiter.locked_until(&key, now).await? {
            tracing::info!(email = %key, "sign-in rejected while locked");
            return Err(AuthError::LockedOut {
                retry_after_secs: seconds_until(until, now),
            });
        }

        match self.provider.sign_in_with_password(&key, password).await {
            Ok(session) => {
                self.limiter.record_success(&key).await?;
                tracing::info!(email = %key, "signed in");
                self.finish_sign_in(session, None).await
            }
            Err(IdentityError::InvalidCredentials) => {
                match self.limiter.record_failure(&key, now).await? {
                    FailureVerdict::Remaining(remaining_attempts) => {
                        tracing::info!(email = %key, remaining_attempts, "sign-in failed");
                        Err(AuthError::InvalidCredentials { remaining_attempts })
                    }
                    FailureVerdict::Locked { until } => Err(AuthError::LockedOut {
                        retry_after_secs: seconds_until(until, now),
                    }),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Start a registration: validate the form and mail a code.
    ///
    /// A password given here is set on the account once the code is verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` for invalid input and
    /// `AuthError::ResendTooSoon` inside the resend cooldown.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: Option<&str>,
    ) -> Result<(), AuthError> {
        validate_email(email)?;
        validate_sign_up_name(name)?;
        if let Some(password) = password {
            validate_password(password)?;
        }
        let key = normalize_email(email);
        let now = self.clock.now();

        let name = name.trim();

        // claim the cooldown slot before mailing so the lock is not held
        // across the provider round trip
        let previous = {
            let mut pending = self.pending.lock().await;
            if let Some(existing) = pending.get(&key) {
                ensure_cooldown_over(existing, now)?;
            }
            pending.insert(
                key.clone(),
                PendingRegistration {
                    name: name.to_string(),
                    password: password.map(str::to_owned),
                    sent_at: now,
                    expires_at: now + Duration::minutes(REGISTRATION_TTL_MINUTES),
                },
            )
        };

        if let Err(err) = self.provider.sign_in_with_otp(&key, Some(name), true).await {
            self.restore_pending(&key, previous).await;
            return Err(err.into());
        }
        tracing::info!(email = %key, "registration code sent");
        Ok(())
    }

    /// Mail a new code for a pending registration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NoPendingRegistration` if nothing is pending (or it
    /// expired) and `AuthError::ResendTooSoon` inside the cooldown.
    pub async fn resend_code(&self, email: &str) -> Result<(), AuthError> {
        let key = normalize_email(email);
        let now = self.clock.now();

        let (name, previous) = {
            let mut pending = self.pending.lock().await;
            let entry = live_entry(&mut pending, &key, now)?;
            ensure_cooldown_over(entry, now)?;
            let previous = entry.clone();
            entry.sent_at = now;
            entry.expires_at = now + Duration::minutes(REGISTRATION_TTL_MINUTES);
            (entry.name.clone(), previous)
        };

        if let Err(err) = self.provider.sign_in_with_otp(&key, Some(&name), true).await {
            self.restore_pending(&key, Some(previous)).await;
            return Err(err.into());
        }
        tracing::info!(email = %key, "registration code resent");
        Ok(())
    }

    /// Mail a sign-in code to an existing account. Verify it with
    /// [`AuthService::verify`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` for a malformed email and
    /// `AuthError::Identity` if the provider has no such account.
    pub async fn request_login_code(&self, email: &str) -> Result<(), AuthError> {
        validate_email(email)?;
        let key = normalize_email(email);
        self.provider.sign_in_with_otp(&key, None, false).await?;
        tracing::info!(email = %key, "sign-in code sent");
        Ok(())
    }

    /// Exchange a code for a session. Completes a pending registration if
    /// there is one: its password is set and its name is stored on the profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` unless the code is 8 digits, and
    /// `AuthError::InvalidCode` if the provider rejects it.
    pub async fn verify(&self, email: &str, code: &str) -> Result<User, AuthError> {
        validate_otp(code)?;
        let key = normalize_email(email);
        let now = self.clock.now();

        let registration = {
            let mut pending = self.pending.lock().await;
            if pending.get(&key).is_some_and(|entry| entry.expires_at <= now) {
                pending.remove(&key);
                return Err(AuthError::NoPendingRegistration);
            }
            pending.get(&key).cloned()
        };

        let session = match self
            .provider
            .verify_otp(&key, code.trim(), OtpKind::Email)
            .await
        {
            Ok(session) => session,
            Err(IdentityError::InvalidOtp) => return Err(AuthError::InvalidCode),
            Err(err) => return Err(err.into()),
        };

        let session = match registration.as_ref().and_then(|r| r.password.as_deref()) {
            Some(password) => {
                let user = self
                    .provider
                    .update_user(&UserAttributes::password(password))
                    .await?;
                Session { user, ..session }
            }
            None => session,
        };

        self.pending.lock().await.remove(&key);
        tracing::info!(email = %key, "email verified");
        let name = registration.map(|r| r.name);
        self.finish_sign_in(session, name.as_deref()).await
    }

    /// Play without an account. Blank names become [`GUEST_NAME`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` for a one-letter name.
    pub fn sign_in_as_guest(&self, name: Option<&str>) -> Result<User, AuthError> {
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                validate_sign_up_name(name)?;
                name.to_string()
            }
            None => GUEST_NAME.to_string(),
        };
        let user = User::Guest(GuestUser {
            id: format!("guest-{}", uuid::Uuid::new_v4().simple()),
            name,
        });
        tracing::info!("guest signed in");
        self.publish(AuthEvent::SignedIn(user.clone()));
        Ok(user)
    }

    /// URL to hand the user to for Google sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` if the URL cannot be built.
    pub fn google_sign_in_url(&self, redirect_to: &str) -> Result<String, AuthError> {
        Ok(self.provider.oauth_url(AuthProvider::Google, redirect_to)?)
    }

    /// Set a first password, typically on an OAuth account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` for a weak password and
    /// `AuthError::NotSignedIn` without a session.
    pub async fn set_password(&self, password: &str) -> Result<User, AuthError> {
        validate_password(password)?;
        let user = self
            .provider
            .update_user(&UserAttributes::password(password))
            .await
            .map_err(not_signed_in)?;
        Ok(User::Authenticated(user))
    }

    /// Change the password after re-checking the current one.
    ///
    /// The check is a regular sign-in, so wrong guesses count toward the
    /// lockout like any other failed sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IncorrectCurrentPassword` if `current` is wrong,
    /// `AuthError::LockedOut` while the email is locked and
    /// `AuthError::Credential` for a weak new password.
    pub async fn change_password(
        &self,
        email: &str,
        current: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        validate_password(new_password)?;
        match self.sign_in(email, current).await {
            Ok(_) => {}
            Err(AuthError::InvalidCredentials { .. }) => {
                return Err(AuthError::IncorrectCurrentPassword);
            }
            Err(err) => return Err(err),
        }
        let user = self
            .provider
            .update_user(&UserAttributes::password(new_password))
            .await
            .map_err(not_signed_in)?;
        tracing::info!(email = %user.email, "password changed");
        Ok(User::Authenticated(user))
    }

    /// Mail a password recovery code. Unknown emails are not reported.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` for a malformed email.
    pub async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), AuthError> {
        validate_email(email)?;
        let key = normalize_email(email);
        self.provider
            .reset_password_for_email(&key, redirect_to)
            .await?;
        tracing::info!(email = %key, "password reset requested");
        Ok(())
    }

    /// Redeem a recovery code and set a new password. A completed reset
    /// also lifts any sign-in lockout on the email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` for a malformed code or weak password
    /// and `AuthError::InvalidCode` if the provider rejects the code.
    pub async fn complete_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<User, AuthError> {
        validate_otp(code)?;
        validate_password(new_password)?;
        let key = normalize_email(email);

        let session = match self
            .provider
            .verify_otp(&key, code.trim(), OtpKind::Recovery)
            .await
        {
            Ok(session) => session,
            Err(IdentityError::InvalidOtp) => return Err(AuthError::InvalidCode),
            Err(err) => return Err(err.into()),
        };
        let user = self
            .provider
            .update_user(&UserAttributes::password(new_password))
            .await?;
        self.limiter.record_success(&key).await?;
        tracing::info!(email = %key, "password reset");
        self.finish_sign_in(Session { user, ..session }, None).await
    }

    /// Rename the signed-in account and its profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Credential` for an invalid name and
    /// `AuthError::NotSignedIn` without a session.
    pub async fn update_name(&self, name: &str) -> Result<User, AuthError> {
        let name = profile_name(name)?;
        let user = self
            .provider
            .update_user(&UserAttributes::name(name.clone()))
            .await
            .map_err(not_signed_in)?;
        self.profiles.ensure_profile(user.id, &user.email, None).await?;
        self.profiles.update_name(user.id, &name).await?;
        Ok(User::Authenticated(user))
    }

    /// The user of the current provider session, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` if the session cannot be read.
    pub async fn current_user(&self) -> Result<Option<User>, AuthError> {
        let session = self.provider.get_session().await?;
        Ok(session.map(|s| User::Authenticated(s.user)))
    }

    /// # Errors
    ///
    /// Returns `AuthError::Identity` if the provider rejects the sign-out.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await?;
        tracing::info!("signed out");
        self.publish(AuthEvent::SignedOut);
        Ok(())
    }

    async fn finish_sign_in(
        &self,
        session: Session,
        name: Option<&str>,
    ) -> Result<User, AuthError> {
        let AuthenticatedUser { id, email, .. } = &session.user;
        let profile = self
            .profiles
            .ensure_profile(*id, email, name.or(Some(session.user.name.as_str())))
            .await?;
        let mut user = session.user;
        if let Some(profile_name) = profile.name {
            user.name = profile_name;
        }
        let user = User::Authenticated(user);
        self.publish(AuthEvent::SignedIn(user.clone()));
        Ok(user)
    }

    async fn restore_pending(&self, key: &str, previous: Option<PendingRegistration>) {
        let mut pending = self.pending.lock().await;
        match previous {
            Some(entry) => {
                pending.insert(key.to_string(), entry);
            }
            None => {
                pending.remove(key);
            }
        }
    }

    fn publish(&self, event: AuthEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

fn not_signed_in(err: IdentityError) -> AuthError {
    match err {
        IdentityError::NotSignedIn => AuthError::NotSignedIn,
        other => other.into(),
    }
}

fn ensure_cooldown_over(
    entry: &PendingRegistration,
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let ready_at = entry.sent_at + Duration::seconds(RESEND_COOLDOWN_SECONDS);
    if entry.expires_at > now && ready_at > now {
        return Err(AuthError::ResendTooSoon {
            retry_after_secs: seconds_until(ready_at, now),
        });
    }
    Ok(())
}

fn live_entry<'a>(
    pending: &'a mut HashMap<String, PendingRegistration>,
    key: &str,
    now: DateTime<Utc>,
) -> Result<&'a mut PendingRegistration, AuthError> {
    let expired = match pending.get(key) {
        None => return Err(AuthError::NoPendingRegistration),
        Some(entry) => entry.expires_at <= now,
    };
    if expired {
        pending.remove(key);
        return Err(AuthError::NoPendingRegistration);
    }
    pending.get_mut(key).ok_or(AuthError::NoPendingRegistration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::LocalIdentityProvider;
    use quiz_core::time::fixed_clock;
    use storage::repository::Storage;

    fn service() -> (AuthService, Arc<LocalIdentityProvider>) {
        let storage = Storage::in_memory();
        let provider = Arc::new(LocalIdentityProvider::new(
            fixed_clock(),
            storage.accounts.clone(),
        ));
        let profiles = Arc::new(ProfileService::new(
            fixed_clock(),
            storage.users,
            storage.results,
        ));
        let svc = AuthService::new(
            fixed_clock(),
            provider.clone(),
            profiles,
            storage.attempts,
            LoginLimits::default(),
        );
        (svc, provider)
    }

    #[tokio::test]
    async fn sign_in_validates_before_calling_provider() {
        let (svc, _) = service();
        assert!(matches!(
            svc.sign_in("not-an-email", "secret1").await,
            Err(AuthError::Credential(CredentialError::EmailInvalid))
        ));
        assert!(matches!(
            svc.sign_in("ana@example.com", "").await,
            Err(AuthError::Credential(CredentialError::PasswordRequired))
        ));
    }

    #[tokio::test]
    async fn register_rejects_short_names_and_passwords() {
        let (svc, _) = service();
        assert!(matches!(
            svc.register("ana@example.com", "A", None).await,
            Err(AuthError::Credential(CredentialError::NameTooShort))
        ));
        assert!(matches!(
            svc.register("ana@example.com", "Ana", Some("123")).await,
            Err(AuthError::Credential(CredentialError::PasswordTooShort))
        ));
    }

    #[tokio::test]
    async fn resend_inside_cooldown_is_refused() {
        let (svc, _) = service();
        svc.register("ana@example.com", "Ana", None).await.unwrap();
        assert!(matches!(
            svc.register("ana@example.com", "Ana", None).await,
            Err(AuthError::ResendTooSoon {
                retry_after_secs: 60
            })
        ));
        assert!(matches!(
            svc.resend_code("ana@example.com").await,
            Err(AuthError::ResendTooSoon { .. })
        ));
        assert!(matches!(
            svc.resend_code("luis@example.com").await,
            Err(AuthError::NoPendingRegistration)
        ));
    }

    #[tokio::test]
    async fn verify_rejects_malformed_and_wrong_codes() {
        let (svc, provider) = service();
        assert!(matches!(
            svc.verify("ana@example.com", "1234").await,
            Err(AuthError::Credential(CredentialError::InvalidOtp))
        ));
        svc.register("ana@example.com", "Ana", None).await.unwrap();
        let code = provider.last_code("ana@example.com").await.unwrap();
        let wrong: String = code
            .chars()
            .map(|c| if c == '9' { '0' } else { '9' })
            .collect();
        assert!(matches!(
            svc.verify("ana@example.com", &wrong).await,
            Err(AuthError::InvalidCode)
        ));
    }

    #[test]
    fn guests_get_a_default_name() {
        let (svc, _) = service();
        let guest = svc.sign_in_as_guest(None).unwrap();
        assert_eq!(guest.display_name(), GUEST_NAME);
        assert!(guest.is_guest());
        let named = svc.sign_in_as_guest(Some("  Rosa ")).unwrap();
        assert_eq!(named.display_name(), "Rosa");
        assert!(svc.sign_in_as_guest(Some("R")).is_err());
    }

    #[tokio::test]
    async fn change_password_checks_the_current_one() {
        let (svc, provider) = service();
        provider
            .sign_up("ana@example.com", "secret1", None)
            .await
            .unwrap();
        provider.sign_out().await.unwrap();

        assert!(matches!(
            svc.change_password("ana@example.com", "wrong-one", "secret2").await,
            Err(AuthError::IncorrectCurrentPassword)
        ));
        assert!(matches!(
            svc.change_password("ana@example.com", "secret1", "123").await,
            Err(AuthError::Credential(CredentialError::PasswordTooShort))
        ));
        svc.change_password("ana@example.com", "secret1", "secret2")
            .await
            .unwrap();
        assert!(matches!(
            svc.sign_in("ana@example.com", "secret1").await,
            Err(AuthError::InvalidCredentials { .. })
        ));
        svc.sign_in("ana@example.com", "secret2").await.unwrap();
    }

    #[tokio::test]
    async fn password_reset_sets_a_new_password() {
        let (svc, provider) = service();
        provider
            .sign_up("luis@example.com", "secret1", Some("Luis"))
            .await
            .unwrap();
        provider.sign_out().await.unwrap();

        svc.request_password_reset("luis@example.com", None)
            .await
            .unwrap();
        svc.request_password_reset("ghost@example.com", None)
            .await
            .unwrap();
        let code = provider.last_code("luis@example.com").await.unwrap();
        let wrong: String = code
            .chars()
            .map(|c| if c == '9' { '0' } else { '9' })
            .collect();
        assert!(matches!(
            svc.complete_password_reset("luis@example.com", &wrong, "fresh-pass")
                .await,
            Err(AuthError::InvalidCode)
        ));

        let user = svc
            .complete_password_reset("luis@example.com", &code, "fresh-pass")
            .await
            .unwrap();
        assert_eq!(user.display_name(), "Luis");
        svc.sign_out().await.unwrap();
        svc.sign_in("luis@example.com", "fresh-pass").await.unwrap();
    }

    #[tokio::test]
    async fn login_code_requires_an_existing_account() {
        let (svc, provider) = service();
        assert!(matches!(
            svc.request_login_code("nobody@example.com").await,
            Err(AuthError::Identity(IdentityError::UserNotFound))
        ));
        provider
            .add_oauth_account("maria@example.com", None)
            .await
            .unwrap();
        svc.request_login_code("maria@example.com").await.unwrap();
        let code = provider.last_code("maria@example.com").await.unwrap();
        let user = svc.verify("maria@example.com", &code).await.unwrap();
        assert!(user.has_google_linked());
        assert!(user.needs_password());
    }

    #[tokio::test]
    async fn set_password_needs_a_session() {
        let (svc, _) = service();
        assert!(matches!(
            svc.set_password("secret1").await,
            Err(AuthError::NotSignedIn)
        ));
    }
}
