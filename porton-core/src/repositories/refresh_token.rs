use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::AccountId,
    token::{NewRefreshToken, RefreshToken, RefreshTokenStats},
};

/// Repository for refresh-token rows.
///
/// Rows hold token hashes only; every lookup is by hash, never by scanning
/// plaintexts. Revocation is logical (a flag), physical deletion happens only
/// through [`purge_dead`](RefreshTokenRepository::purge_dead).
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync + 'static {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshToken, Error>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, Error>;

    /// Mark one row revoked. Returns `false` when no non-revoked row matched
    /// the hash, which makes repeated revocation a no-op rather than an
    /// error.
    async fn revoke_by_hash(
        &self,
        token_hash: &str,
        revoked_by: Option<AccountId>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, Error>;

    /// Mark every non-revoked row for the account revoked. Returns the
    /// number of rows affected.
    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        revoked_by: Option<AccountId>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, Error>;

    /// Count rows that have been in a terminal state (expired or revoked)
    /// since before `cutoff`. The dry-run side of the purge.
    async fn count_dead(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;

    /// Physically delete rows dead since before `cutoff`. Idempotent and
    /// safe to run concurrently with live validation: anything it removes
    /// was already invisible to validation for the whole retention window.
    async fn purge_dead(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;

    /// Aggregate counts for the admin surface.
    async fn stats(&self, now: DateTime<Utc>) -> Result<RefreshTokenStats, Error>;
}
