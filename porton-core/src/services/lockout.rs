//! Per-account lockout guard.
//!
//! Tracks consecutive failed attempts on the account row and enforces a
//! timed lock. The counter update is delegated to the repository as a single
//! atomic statement so concurrent failures cannot undercount toward the
//! threshold. Locks expire lazily: an expired `locked_until` is cleared on
//! the next evaluation, before the password is ever consulted.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::{Account, AccountId, LockoutCounters},
    config::LockoutConfig,
    repositories::{AccountRepository, AccountRepositoryProvider},
};

/// Outcome of the pre-password lockout check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutGate {
    /// Proceed to password verification.
    Admit,
    /// Deny without consulting the password.
    Locked { locked_until: DateTime<Utc> },
}

/// Result of recording one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRecord {
    pub counters: LockoutCounters,
    /// True when this attempt is the one that triggered the lock.
    pub just_locked: bool,
    /// Attempts left before the lock triggers; 0 once locked.
    pub remaining_attempts: u32,
}

/// Service enforcing the per-account lockout policy.
#[derive(Clone)]
pub struct LockoutService<P: AccountRepositoryProvider> {
    provider: Arc<P>,
    config: LockoutConfig,
}

impl<P: AccountRepositoryProvider> LockoutService<P> {
    pub fn new(provider: Arc<P>, config: LockoutConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    /// Evaluate the lock state before any password comparison.
    ///
    /// A live lock denies immediately. An expired lock is cleared here (lazy
    /// unlock) and the attempt proceeds as if the account were never locked.
    pub async fn check(&self, account: &Account, now: DateTime<Utc>) -> Result<LockoutGate, Error> {
        if let Some(locked_until) = account.locked_until {
            if locked_until > now {
                return Ok(LockoutGate::Locked { locked_until });
            }
            // Lock window has passed; reset counters before proceeding.
            self.provider.accounts().clear_lockout(account.id).await?;
        }
        Ok(LockoutGate::Admit)
    }

    /// Record a password mismatch and report whether it triggered the lock.
    pub async fn record_failure(
        &self,
        id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<FailureRecord, Error> {
        let lock_until = now + self.config.lock_duration;
        let counters = self
            .provider
            .accounts()
            .record_failed_attempt(id, self.config.max_failed_attempts, lock_until, now)
            .await?;

        let just_locked = counters.failed_attempts >= self.config.max_failed_attempts
            && counters.locked_until.is_some_and(|until| until > now);

        if just_locked {
            tracing::warn!(
                account_id = %id,
                failed_attempts = counters.failed_attempts,
                "account locked after repeated failed login attempts"
            );
        }

        Ok(FailureRecord {
            counters,
            just_locked,
            remaining_attempts: self
                .config
                .max_failed_attempts
                .saturating_sub(counters.failed_attempts),
        })
    }

    /// Clear the counters as part of a successful login. Skips the write
    /// when there is nothing to clear.
    pub async fn record_success(&self, account: &Account) -> Result<(), Error> {
        if account.failed_attempts > 0 || account.locked_until.is_some() {
            self.provider.accounts().clear_lockout(account.id).await?;
        }
        Ok(())
    }
}
