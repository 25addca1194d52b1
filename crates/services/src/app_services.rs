use std::sync::Arc;

use quiz_core::bank::QuestionBank;
use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::AuthService;
use crate::config::QuizConfig;
use crate::error::AppServicesError;
use crate::game_service::GameService;
use crate::identity::{IdentityProvider, LocalIdentityProvider, RestIdentityProvider};
use crate::profile_service::ProfileService;

/// Assembles app-facing services from configuration.
#[derive(Clone)]
pub struct AppServices {
    auth: Arc<AuthService>,
    profiles: Arc<ProfileService>,
    games: Arc<GameService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the configured identity provider.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// question bank cannot be loaded.
    pub async fn new_sqlite(config: &QuizConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let provider: Arc<dyn IdentityProvider> = match &config.identity {
            Some(identity) => {
                tracing::info!(url = %identity.base_url, "using hosted identity service");
                Arc::new(RestIdentityProvider::new(identity.clone()))
            }
            None => {
                tracing::info!("no identity service configured; using local accounts");
                Arc::new(LocalIdentityProvider::new(clock, Arc::clone(&storage.accounts)))
            }
        };
        Self::assemble(config, clock, storage, provider)
    }

    /// Build services on explicit storage and identity backends.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::BankFile` if the configured bank cannot be
    /// read, `AppServicesError::Bank` if the bank is malformed and
    /// `AppServicesError::Session` for a zero-second answer window.
    pub fn assemble(
        config: &QuizConfig,
        clock: Clock,
        storage: Storage,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        let bank = Arc::new(load_bank(config.bank_file.as_deref())?);
        let session_config = config.session_config()?;

        let profiles = Arc::new(ProfileService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.results),
        ));
        let auth = Arc::new(AuthService::new(
            clock,
            provider,
            Arc::clone(&profiles),
            Arc::clone(&storage.attempts),
            config.login,
        ));
        let games = Arc::new(
            GameService::new(
                bank,
                Arc::clone(&profiles),
                session_config,
                config.questions_per_game,
            )
            .with_seed(config.seed),
        );

        Ok(Self {
            auth,
            profiles,
            games,
        })
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    #[must_use]
    pub fn games(&self) -> Arc<GameService> {
        Arc::clone(&self.games)
    }
}

fn load_bank(path: Option<&str>) -> Result<QuestionBank, AppServicesError> {
    let Some(path) = path else {
        return Ok(QuestionBank::builtin()?);
    };
    let json = std::fs::read_to_string(path).map_err(|source| AppServicesError::BankFile {
        path: path.to_string(),
        source,
    })?;
    let bank = QuestionBank::from_json(&json)?;
    tracing::info!(path, questions = bank.len(), "loaded question bank");
    Ok(bank)
}
