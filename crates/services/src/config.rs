use std::env;
use std::str::FromStr;

use chrono::Duration;
use quiz_core::bank::DEFAULT_QUESTIONS_PER_GAME;
use quiz_core::quiz::SessionConfig;

use crate::error::ConfigError;

pub const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
pub const DEFAULT_LOGIN_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOGIN_LOCKOUT_SECS: i64 = 15 * 60;

/// Where the hosted identity service lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Failed sign-in budget per email before it is locked out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoginLimits {
    pub max_attempts: u32,
    pub lockout: Duration,
}

impl Default for LoginLimits {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_LOGIN_MAX_ATTEMPTS,
            lockout: Duration::seconds(DEFAULT_LOGIN_LOCKOUT_SECS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizConfig {
    pub db_url: String,
    pub questions_per_game: usize,
    pub seconds_per_question: u32,
    /// Fixed shuffle seed. `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// `None` keeps accounts in the local database.
    pub identity: Option<IdentityConfig>,
    pub login: LoginLimits,
    /// JSON question bank to play from instead of the built-in one.
    pub bank_file: Option<String>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.into(),
            questions_per_game: DEFAULT_QUESTIONS_PER_GAME,
            seconds_per_question: SessionConfig::DEFAULT_SECONDS_PER_QUESTION,
            seed: None,
            identity: None,
            login: LoginLimits::default(),
            bank_file: None,
        }
    }
}

impl QuizConfig {
    /// Read `QUIZ_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`QuizConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_url = lookup("QUIZ_DB_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.db_url);
        let questions_per_game = parse_var(&lookup, "QUIZ_QUESTIONS_PER_GAME")?
            .filter(|n| *n > 0)
            .unwrap_or(defaults.questions_per_game);
        let seconds_per_question = parse_var(&lookup, "QUIZ_SECONDS_PER_QUESTION")?
            .filter(|n| *n > 0)
            .unwrap_or(defaults.seconds_per_question);
        let seed = parse_var(&lookup, "QUIZ_SEED")?;
        let bank_file = lookup("QUIZ_BANK_FILE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let identity = match (lookup("QUIZ_AUTH_URL"), lookup("QUIZ_AUTH_KEY")) {
            (Some(base_url), Some(api_key))
                if !base_url.trim().is_empty() && !api_key.trim().is_empty() =>
            {
                Some(IdentityConfig {
                    base_url: base_url.trim().to_string(),
                    api_key: api_key.trim().to_string(),
                })
            }
            _ => None,
        };

        let max_attempts = parse_var(&lookup, "QUIZ_LOGIN_MAX_ATTEMPTS")?
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LOGIN_MAX_ATTEMPTS);
        let lockout_secs: i64 = parse_var(&lookup, "QUIZ_LOGIN_LOCKOUT_SECS")?
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LOGIN_LOCKOUT_SECS);

        Ok(Self {
            db_url,
            questions_per_game,
            seconds_per_question,
            seed,
            identity,
            login: LoginLimits {
                max_attempts,
                lockout: Duration::seconds(lockout_secs),
            },
            bank_file,
        })
    }

    /// # Errors
    ///
    /// Fails only if `seconds_per_question` is zero.
    pub fn session_config(&self) -> Result<SessionConfig, quiz_core::quiz::SessionError> {
        SessionConfig::new(self.seconds_per_question)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = QuizConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, QuizConfig::default());
        assert_eq!(config.questions_per_game, 15);
        assert_eq!(config.seconds_per_question, 15);
        assert_eq!(config.login.max_attempts, 5);
        assert_eq!(config.login.lockout, Duration::minutes(15));
    }

    #[test]
    fn reads_overrides() {
        let config = QuizConfig::from_lookup(lookup(&[
            ("QUIZ_DB_URL", "sqlite::memory:"),
            ("QUIZ_QUESTIONS_PER_GAME", "5"),
            ("QUIZ_SECONDS_PER_QUESTION", "20"),
            ("QUIZ_SEED", "42"),
            ("QUIZ_AUTH_URL", "https://auth.example.com"),
            ("QUIZ_AUTH_KEY", "anon"),
            ("QUIZ_LOGIN_MAX_ATTEMPTS", "3"),
            ("QUIZ_LOGIN_LOCKOUT_SECS", "60"),
            ("QUIZ_BANK_FILE", " questions.json "),
        ]))
        .unwrap();
        assert_eq!(config.db_url, "sqlite::memory:");
        assert_eq!(config.questions_per_game, 5);
        assert_eq!(config.seconds_per_question, 20);
        assert_eq!(config.seed, Some(42));
        assert_eq!(
            config.identity,
            Some(IdentityConfig {
                base_url: "https://auth.example.com".into(),
                api_key: "anon".into(),
            })
        );
        assert_eq!(config.login.max_attempts, 3);
        assert_eq!(config.login.lockout, Duration::seconds(60));
        assert_eq!(config.bank_file.as_deref(), Some("questions.json"));
    }

    #[test]
    fn identity_needs_both_url_and_key() {
        let config =
            QuizConfig::from_lookup(lookup(&[("QUIZ_AUTH_URL", "https://auth.example.com")]))
                .unwrap();
        assert!(config.identity.is_none());
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = QuizConfig::from_lookup(lookup(&[("QUIZ_SEED", "lucky")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "QUIZ_SEED",
                ..
            }
        ));
    }
}
