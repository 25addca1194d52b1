//! Per-email failed sign-in budget with a timed lockout.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use storage::repository::{LoginAttemptRepository, LoginAttempts, StorageError};
use tokio::sync::Mutex;

use crate::config::LoginLimits;

/// Result of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureVerdict {
    Remaining(u32),
    Locked { until: DateTime<Utc> },
}

/// Counts failed sign-ins per key. Once `max_attempts` failures land within
/// one lockout window the key is locked for the lockout duration. Callers pass
/// `now` so lockouts follow the service clock.
///
/// Counters live in a [`LoginAttemptRepository`], so a lockout outlives the
/// process that imposed it.
pub struct LoginLimiter {
    limits: LoginLimits,
    attempts: Arc<dyn LoginAttemptRepository>,
    // serializes read-modify-write cycles within this process
    gate: Mutex<()>,
}

impl LoginLimiter {
    #[must_use]
    pub fn new(limits: LoginLimits, attempts: Arc<dyn LoginAttemptRepository>) -> Self {
        Self {
            limits,
            attempts,
            gate: Mutex::new(()),
        }
    }

    /// `Some(until)` while the key is locked. Expired rows are dropped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempts store cannot be read.
    pub async fn locked_until(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StorageError> {
        let _gate = self.gate.lock().await;
        let Some(row) = self.attempts.get_attempts(key).await? else {
            return Ok(None);
        };
        match row.locked_until {
            Some(until) if until > now => Ok(Some(until)),
            Some(_) => {
                self.attempts.clear_attempts(key).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the attempts store cannot be updated.
    pub async fn record_failure(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<FailureVerdict, StorageError> {
        let _gate = self.gate.lock().await;
        let window = self.limits.lockout;
        let fresh = LoginAttempts {
            key: key.to_string(),
            failures: 0,
            window_start: now,
            locked_until: None,
        };
        let mut row = match self.attempts.get_attempts(key).await? {
            Some(row)
                if now - row.window_start < window
                    && !row.locked_until.is_some_and(|until| until <= now) =>
            {
                row
            }
            _ => fresh,
        };

        row.failures = row.failures.saturating_add(1);
        let verdict = if row.failures >= self.limits.max_attempts {
            let until = now + window;
            row.locked_until = Some(until);
            tracing::warn!(key, failures = row.failures, %until, "sign-in locked out");
            FailureVerdict::Locked { until }
        } else {
            FailureVerdict::Remaining(self.limits.max_attempts - row.failures)
        };
        self.attempts.save_attempts(&row).await?;
        Ok(verdict)
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the attempts store cannot be updated.
    pub async fn record_success(&self, key: &str) -> Result<(), StorageError> {
        let _gate = self.gate.lock().await;
        self.attempts.clear_attempts(key).await
    }
}

/// Whole seconds until `until`, rounded up so callers never see zero while locked.
#[must_use]
pub fn seconds_until(until: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let remaining = until - now;
    let secs = remaining.num_seconds();
    let secs = if remaining > Duration::seconds(secs) {
        secs + 1
    } else {
        secs
    };
    u64::try_from(secs.max(0)).unwrap_or(0)
}
