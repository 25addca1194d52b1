use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use quiz_core::Clock;
use quiz_core::model::{AuthProvider, AuthenticatedUser, UserId, display_name_for};
use rand::Rng;
use sha2::{Digest, Sha256};
use storage::repository::{AccountRepository, LocalAccount, Storage, StorageError};
use tokio::sync::Mutex;

use super::{IdentityProvider, OtpKind, Session, UserAttributes};
use crate::error::IdentityError;

const SESSION_TTL_HOURS: i64 = 1;
const SALT_BYTES: usize = 16;

fn to_user(account: &LocalAccount) -> AuthenticatedUser {
    AuthenticatedUser {
        id: account.id,
        email: account.email.clone(),
        name: display_name_for(account.name.as_deref(), &account.email),
        provider: account.provider,
        has_password: account.password_hash.is_some(),
        google_linked: account.google_linked || account.provider == AuthProvider::Google,
    }
}

fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_BYTES] = rand::rng().random();
    let salt = hex::encode(salt);
    format!("{salt}${}", digest(&salt, password))
}

fn password_matches(stored: &str, password: &str) -> bool {
    stored
        .split_once('$')
        .is_some_and(|(salt, hash)| digest(salt, password) == hash)
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_code() -> String {
    format!("{:08}", rand::rng().random_range(0..100_000_000_u32))
}

#[derive(Debug, Clone)]
struct IssuedCode {
    code: String,
    kind: OtpKind,
}

#[derive(Default)]
struct State {
    codes: HashMap<String, IssuedCode>,
    current: Option<Session>,
}

/// Identity provider for running without a hosted auth service.
///
/// Accounts live in an [`AccountRepository`], so they outlast the process when
/// it is backed by `SQLite`. Passwords are kept as salted SHA-256 digests,
/// which is fine for local play and not meant for a public deployment.
/// Codes are logged instead of mailed and can be read back with
/// [`LocalIdentityProvider::last_code`]. The session is per process.
pub struct LocalIdentityProvider {
    clock: Clock,
    accounts: Arc<dyn AccountRepository>,
    state: Mutex<State>,
}

impl LocalIdentityProvider {
    #[must_use]
    pub fn new(clock: Clock, accounts: Arc<dyn AccountRepository>) -> Self {
        Self {
            clock,
            accounts,
            state: Mutex::new(State::default()),
        }
    }

    /// Provider over a throwaway in-memory account store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, Storage::in_memory().accounts)
    }

    /// The code most recently issued for `email`, if it has not been used.
    pub async fn last_code(&self, email: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .codes
            .get(&key(email))
            .map(|issued| issued.code.clone())
    }

    /// Record a Google sign-in for `email`. An existing email account gets
    /// Google linked; otherwise an OAuth-only account is created.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Storage` if the account cannot be saved.
    pub async fn add_oauth_account(
        &self,
        email: &str,
        name: Option<&str>,
    ) -> Result<AuthenticatedUser, IdentityError> {
        let email = key(email);
        if let Some(mut account) = self.accounts.get_account(&email).await? {
            account.google_linked = true;
            self.accounts.update_account(&account).await?;
            return Ok(to_user(&account));
        }
        let account = LocalAccount {
            id: UserId::generate(),
            email,
            name: name.map(str::to_owned),
            password_hash: None,
            provider: AuthProvider::Google,
            google_linked: true,
            created_at: self.clock.now(),
        };
        self.accounts.insert_account(&account).await?;
        Ok(to_user(&account))
    }

    fn open_session(&self, account: &LocalAccount) -> Session {
        Session {
            access_token: format!("local-{}", uuid::Uuid::new_v4().simple()),
            expires_at: Some(self.clock.now() + Duration::hours(SESSION_TTL_HOURS)),
            user: to_user(account),
        }
    }

    async fn issue_code(&self, email: String, kind: OtpKind) {
        let code = generate_code();
        // nothing is mailed; the log stands in for the inbox
        tracing::info!(email = %email, code = %code, kind = kind.as_str(), "one-time code issued");
        self.state
            .lock()
            .await
            .codes
            .insert(email, IssuedCode { code, kind });
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<Session, IdentityError> {
        let account = LocalAccount {
            id: UserId::generate(),
            email: key(email),
            name: name.map(str::to_owned),
            password_hash: Some(hash_password(password)),
            provider: AuthProvider::Email,
            google_linked: false,
            created_at: self.clock.now(),
        };
        match self.accounts.insert_account(&account).await {
            Err(StorageError::Conflict) => return Err(IdentityError::UserAlreadyExists),
            other => other?,
        }
        let session = self.open_session(&account);
        self.state.lock().await.current = Some(session.clone());
        Ok(session)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let account = self
            .accounts
            .get_account(&key(email))
            .await?
            .filter(|a| {
                a.password_hash
                    .as_deref()
                    .is_some_and(|stored| password_matches(stored, password))
            })
            .ok_or(IdentityError::InvalidCredentials)?;
        let session = self.open_session(&account);
        self.state.lock().await.current = Some(session.clone());
        Ok(session)
    }

    async fn sign_in_with_otp(
        &self,
        email: &str,
        name: Option<&str>,
        create_user: bool,
    ) -> Result<(), IdentityError> {
        let email = key(email);
        if self.accounts.get_account(&email).await?.is_none() {
            if !create_user {
                return Err(IdentityError::UserNotFound);
            }
            let account = LocalAccount {
                id: UserId::generate(),
                email: email.clone(),
                name: name.map(str::to_owned),
                password_hash: None,
                provider: AuthProvider::Email,
                google_linked: false,
                created_at: self.clock.now(),
            };
            match self.accounts.insert_account(&account).await {
                // created concurrently; a code for it is still wanted
                Err(StorageError::Conflict) => {}
                other => other?,
            }
        }
        self.issue_code(email, OtpKind::Email).await;
        Ok(())
    }

    async fn verify_otp(
        &self,
        email: &str,
        token: &str,
        kind: OtpKind,
    ) -> Result<Session, IdentityError> {
        let email = key(email);
        {
            let mut state = self.state.lock().await;
            let matches = state
                .codes
                .get(&email)
                .is_some_and(|issued| issued.kind == kind && issued.code == token.trim());
            if !matches {
                return Err(IdentityError::InvalidOtp);
            }
            state.codes.remove(&email);
        }
        let account = self
            .accounts
            .get_account(&email)
            .await?
            .ok_or(IdentityError::InvalidOtp)?;
        let session = self.open_session(&account);
        self.state.lock().await.current = Some(session.clone());
        Ok(session)
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        _redirect_to: Option<&str>,
    ) -> Result<(), IdentityError> {
        let email = key(email);
        if self.accounts.get_account(&email).await?.is_none() {
            tracing::debug!(email = %email, "recovery requested for unknown email");
            return Ok(());
        }
        self.issue_code(email, OtpKind::Recovery).await;
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        Ok(self.state.lock().await.current.clone())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.state.lock().await.current = None;
        Ok(())
    }

    async fn update_user(
        &self,
        attrs: &UserAttributes,
    ) -> Result<AuthenticatedUser, IdentityError> {
        let email = self
            .state
            .lock()
            .await
            .current
            .as_ref()
            .map(|s| s.user.email.clone())
            .ok_or(IdentityError::NotSignedIn)?;
        let mut account = self
            .accounts
            .get_account(&email)
            .await?
            .ok_or(IdentityError::NotSignedIn)?;
        if let Some(password) = &attrs.password {
            account.password_hash = Some(hash_password(password));
        }
        if let Some(name) = &attrs.name {
            account.name = Some(name.clone());
        }
        self.accounts.update_account(&account).await?;

        let user = to_user(&account);
        if let Some(current) = self.state.lock().await.current.as_mut() {
            current.user = user.clone();
        }
        Ok(user)
    }

    fn oauth_url(
        &self,
        provider: AuthProvider,
        redirect_to: &str,
    ) -> Result<String, IdentityError> {
        let mut url = reqwest::Url::parse("local://identity/authorize")
            .map_err(|e| IdentityError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);
        Ok(url.into())
    }
}
