//! Refresh-token issuance, validation, revocation and purge.
//!
//! Tokens are opaque random values; only their SHA-256 hash is persisted and
//! every lookup goes through that hash. Validation applies the three-part
//! usability rule (not revoked, not expired, account active) and any failed
//! part is terminal for the token.
//!
//! This service does not rotate the refresh token on use: a successful
//! validation mints a new access token while the presented refresh token
//! stays valid until its own expiry or an explicit revocation. That is a
//! recorded trade-off, not an oversight.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    Error,
    account::{Account, AccountId},
    client::ClientInfo,
    config::RefreshTokenConfig,
    crypto,
    error::TokenError,
    repositories::{
        AccountRepository, AccountRepositoryProvider, RefreshTokenRepository,
        RefreshTokenRepositoryProvider,
    },
    token::{IssuedRefreshToken, NewRefreshToken, PurgeReport, RefreshTokenStats},
};

pub struct RefreshTokenService<P>
where
    P: AccountRepositoryProvider + RefreshTokenRepositoryProvider,
{
    provider: Arc<P>,
    config: RefreshTokenConfig,
}

// Manual impl: the derive would demand `P: Clone`, but only the Arc is cloned.
impl<P> Clone for RefreshTokenService<P>
where
    P: AccountRepositoryProvider + RefreshTokenRepositoryProvider,
{
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            config: self.config.clone(),
        }
    }
}

impl<P> RefreshTokenService<P>
where
    P: AccountRepositoryProvider + RefreshTokenRepositoryProvider,
{
    pub fn new(provider: Arc<P>, config: RefreshTokenConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &RefreshTokenConfig {
        &self.config
    }

    /// Issue a new token for the account. The returned plaintext is the only
    /// copy that will ever exist.
    pub async fn issue(
        &self,
        account_id: AccountId,
        client: &ClientInfo,
    ) -> Result<IssuedRefreshToken, Error> {
        let token = crypto::generate_refresh_token();
        let record = self
            .provider
            .refresh_tokens()
            .insert(NewRefreshToken {
                account_id,
                token_hash: crypto::hash_token(&token),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                expires_at: Utc::now() + self.config.lifetime,
            })
            .await?;

        Ok(IssuedRefreshToken { token, record })
    }

    /// Validate a presented plaintext token and return the owning account.
    ///
    /// The presented token is hashed and looked up by hash; there is no
    /// plaintext scan. Denial reasons are distinct for observability but all
    /// surface as the same unauthenticated outcome.
    pub async fn validate(&self, presented: &str) -> Result<Account, Error> {
        let now = Utc::now();
        let hash = crypto::hash_token(presented);

        let row = self
            .provider
            .refresh_tokens()
            .find_by_hash(&hash)
            .await?
            .ok_or(Error::Token(TokenError::NotFound))?;

        // The lookup collation is the store's business; the credential
        // comparison itself must be exact and constant-time.
        if !crypto::verify_token_hash(presented, &row.token_hash) {
            return Err(TokenError::NotFound.into());
        }

        if !row.is_usable(now) {
            return Err(if row.revoked {
                TokenError::Revoked
            } else {
                TokenError::Expired
            }
            .into());
        }

        let account = self
            .provider
            .accounts()
            .find_by_id(row.account_id)
            .await?
            .ok_or(Error::Token(TokenError::SubjectNotFound))?;

        if !account.is_active {
            return Err(TokenError::SubjectInactive.into());
        }

        Ok(account)
    }

    /// Revoke one token by its plaintext. Returns `false` when the token was
    /// unknown or already revoked; revoking twice is a no-op.
    pub async fn revoke(
        &self,
        presented: &str,
        revoked_by: Option<AccountId>,
        reason: &str,
    ) -> Result<bool, Error> {
        let hash = crypto::hash_token(presented);
        self.provider
            .refresh_tokens()
            .revoke_by_hash(&hash, revoked_by, reason, Utc::now())
            .await
    }

    /// Revoke every live token for an account. Returns the count affected.
    /// Serves both "log me out everywhere" and administrative deactivation.
    pub async fn revoke_all(
        &self,
        account_id: AccountId,
        revoked_by: Option<AccountId>,
        reason: &str,
    ) -> Result<u64, Error> {
        let count = self
            .provider
            .refresh_tokens()
            .revoke_all_for_account(account_id, revoked_by, reason, Utc::now())
            .await?;

        if count > 0 {
            tracing::info!(account_id = %account_id, count, reason, "revoked refresh tokens");
        }

        Ok(count)
    }

    /// Garbage-collect rows that have been expired or revoked for longer
    /// than the retention window. With `dry_run` the report carries the
    /// count that would be removed without touching anything.
    pub async fn purge(
        &self,
        retention_override: Option<Duration>,
        dry_run: bool,
    ) -> Result<PurgeReport, Error> {
        let retention = retention_override.unwrap_or(self.config.retention);
        let cutoff = Utc::now() - retention;

        let affected = if dry_run {
            self.provider.refresh_tokens().count_dead(cutoff).await?
        } else {
            let removed = self.provider.refresh_tokens().purge_dead(cutoff).await?;
            if removed > 0 {
                tracing::info!(removed, %cutoff, "purged dead refresh tokens");
            }
            removed
        };

        Ok(PurgeReport {
            affected,
            dry_run,
            cutoff,
        })
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> Result<RefreshTokenStats, Error> {
        self.provider.refresh_tokens().stats(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{LockoutCounters, Role};
    use crate::token::RefreshToken;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockProvider {
        accounts: Mutex<HashMap<i64, Account>>,
        tokens: Mutex<Vec<RefreshToken>>,
    }

    impl MockProvider {
        fn with_account(account: Account) -> Arc<Self> {
            Arc::new(Self {
                accounts: Mutex::new([(account.id.as_i64(), account)].into_iter().collect()),
                tokens: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AccountRepository for MockProvider {
        async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .values()
                .find(|a| a.username == username)
                .cloned())
        }

        async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, Error> {
            Ok(self.accounts.lock().unwrap().get(&id.as_i64()).cloned())
        }

        async fn password_hash(&self, _id: AccountId) -> Result<Option<String>, Error> {
            Ok(None)
        }

        async fn record_failed_attempt(
            &self,
            _id: AccountId,
            _threshold: u32,
            _lock_until: DateTime<Utc>,
            _now: DateTime<Utc>,
        ) -> Result<LockoutCounters, Error> {
            unimplemented!()
        }

        async fn clear_lockout(&self, _id: AccountId) -> Result<(), Error> {
            Ok(())
        }
    }

    #[async_trait]
    impl RefreshTokenRepository for MockProvider {
        async fn insert(&self, token: NewRefreshToken) -> Result<RefreshToken, Error> {
            let mut tokens = self.tokens.lock().unwrap();
            let row = RefreshToken {
                id: tokens.len() as i64 + 1,
                account_id: token.account_id,
                token_hash: token.token_hash,
                ip_address: token.ip_address,
                user_agent: token.user_agent,
                expires_at: token.expires_at,
                revoked: false,
                revoked_at: None,
                revoked_by: None,
                revoke_reason: None,
                created_at: Utc::now(),
            };
            tokens.push(row.clone());
            Ok(row)
        }

        async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, Error> {
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.token_hash == token_hash)
                .cloned())
        }

        async fn revoke_by_hash(
            &self,
            token_hash: &str,
            revoked_by: Option<AccountId>,
            reason: &str,
            now: DateTime<Utc>,
        ) -> Result<bool, Error> {
            let mut tokens = self.tokens.lock().unwrap();
            match tokens
                .iter_mut()
                .find(|t| t.token_hash == token_hash && !t.revoked)
            {
                Some(row) => {
                    row.revoked = true;
                    row.revoked_at = Some(now);
                    row.revoked_by = revoked_by;
                    row.revoke_reason = Some(reason.to_string());
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn revoke_all_for_account(
            &self,
            account_id: AccountId,
            revoked_by: Option<AccountId>,
            reason: &str,
            now: DateTime<Utc>,
        ) -> Result<u64, Error> {
            let mut tokens = self.tokens.lock().unwrap();
            let mut count = 0;
            for row in tokens
                .iter_mut()
                .filter(|t| t.account_id == account_id && !t.revoked)
            {
                row.revoked = true;
                row.revoked_at = Some(now);
                row.revoked_by = revoked_by;
                row.revoke_reason = Some(reason.to_string());
                count += 1;
            }
            Ok(count)
        }

        async fn count_dead(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .iter()
                .filter(|t| is_dead(t, cutoff))
                .count() as u64)
        }

        async fn purge_dead(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
            let mut tokens = self.tokens.lock().unwrap();
            let before = tokens.len();
            tokens.retain(|t| !is_dead(t, cutoff));
            Ok((before - tokens.len()) as u64)
        }

        async fn stats(&self, now: DateTime<Utc>) -> Result<RefreshTokenStats, Error> {
            let tokens = self.tokens.lock().unwrap();
            Ok(RefreshTokenStats {
                total: tokens.len() as u64,
                active: tokens
                    .iter()
                    .filter(|t| !t.revoked && t.expires_at > now)
                    .count() as u64,
                revoked: tokens.iter().filter(|t| t.revoked).count() as u64,
                expired: tokens.iter().filter(|t| t.expires_at <= now).count() as u64,
            })
        }
    }

    fn is_dead(token: &RefreshToken, cutoff: DateTime<Utc>) -> bool {
        token.expires_at < cutoff || token.revoked_at.is_some_and(|at| at < cutoff)
    }

    impl AccountRepositoryProvider for MockProvider {
        type AccountRepo = Self;

        fn accounts(&self) -> &Self {
            self
        }
    }

    impl RefreshTokenRepositoryProvider for MockProvider {
        type RefreshTokenRepo = Self;

        fn refresh_tokens(&self) -> &Self {
            self
        }
    }

    fn account(id: i64, active: bool) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(id),
            username: format!("user{id}"),
            role: Role::Clerk,
            is_active: active,
            failed_attempts: 0,
            locked_until: None,
            last_failed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(provider: Arc<MockProvider>) -> RefreshTokenService<MockProvider> {
        RefreshTokenService::new(provider, RefreshTokenConfig::default())
    }

    #[tokio::test]
    async fn test_issue_stores_hash_not_plaintext() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider.clone());

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();

        assert_ne!(issued.token, issued.record.token_hash);
        assert_eq!(issued.record.token_hash, crypto::hash_token(&issued.token));
        let stored = provider.tokens.lock().unwrap();
        assert_eq!(stored[0].token_hash, issued.record.token_hash);
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider);

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();
        let owner = svc.validate(&issued.token).await.unwrap();
        assert_eq!(owner.id, AccountId::new(1));
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider);

        let err = svc.validate("never-issued").await.unwrap_err();
        assert!(matches!(err, Error::Token(TokenError::NotFound)));
    }

    #[tokio::test]
    async fn test_revoked_token_invalid_regardless_of_expiry() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider);

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();
        assert!(svc.revoke(&issued.token, None, "test").await.unwrap());

        let err = svc.validate(&issued.token).await.unwrap_err();
        assert!(matches!(err, Error::Token(TokenError::Revoked)));
    }

    #[tokio::test]
    async fn test_expired_token_invalid_regardless_of_revoked_flag() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = RefreshTokenService::new(
            provider,
            RefreshTokenConfig {
                lifetime: Duration::seconds(-1),
                retention: Duration::days(30),
            },
        );

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();
        let err = svc.validate(&issued.token).await.unwrap_err();
        assert!(matches!(err, Error::Token(TokenError::Expired)));
    }

    #[tokio::test]
    async fn test_inactive_account_invalidates_token() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider.clone());

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();

        provider
            .accounts
            .lock()
            .unwrap()
            .get_mut(&1)
            .unwrap()
            .is_active = false;

        let err = svc.validate(&issued.token).await.unwrap_err();
        assert!(matches!(err, Error::Token(TokenError::SubjectInactive)));
    }

    #[tokio::test]
    async fn test_revoke_twice_is_noop() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider);

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();
        assert!(svc.revoke(&issued.token, None, "first").await.unwrap());
        assert!(!svc.revoke(&issued.token, None, "second").await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_all_counts_only_live_tokens() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider);

        let client = ClientInfo::default();
        let first = svc.issue(AccountId::new(1), &client).await.unwrap();
        svc.issue(AccountId::new(1), &client).await.unwrap();
        svc.issue(AccountId::new(1), &client).await.unwrap();

        // One already revoked; revoke-all must not double-count it.
        svc.revoke(&first.token, None, "single").await.unwrap();

        let count = svc
            .revoke_all(AccountId::new(1), Some(AccountId::new(1)), "logout all")
            .await
            .unwrap();
        assert_eq!(count, 2);

        let again = svc
            .revoke_all(AccountId::new(1), Some(AccountId::new(1)), "logout all")
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_validation_does_not_rotate() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider);

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();

        // The same token keeps validating; no rotation on use.
        svc.validate(&issued.token).await.unwrap();
        svc.validate(&issued.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_dry_run_reports_without_deleting() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider.clone());

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();
        svc.revoke(&issued.token, None, "dead").await.unwrap();

        // Zero retention makes the just-revoked row immediately purgeable.
        let report = svc.purge(Some(Duration::seconds(-1)), true).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.affected, 1);
        assert_eq!(provider.tokens.lock().unwrap().len(), 1);

        let report = svc.purge(Some(Duration::seconds(-1)), false).await.unwrap();
        assert!(!report.dry_run);
        assert_eq!(report.affected, 1);
        assert!(provider.tokens.lock().unwrap().is_empty());

        // Idempotent: nothing left to remove.
        let report = svc.purge(Some(Duration::seconds(-1)), false).await.unwrap();
        assert_eq!(report.affected, 0);
    }

    #[tokio::test]
    async fn test_purge_retains_rows_inside_window() {
        let provider = MockProvider::with_account(account(1, true));
        let svc = service(provider.clone());

        let issued = svc
            .issue(AccountId::new(1), &ClientInfo::default())
            .await
            .unwrap();
        svc.revoke(&issued.token, None, "dead").await.unwrap();

        // Default 30-day retention: the fresh corpse stays.
        let report = svc.purge(None, false).await.unwrap();
        assert_eq!(report.affected, 0);
        assert_eq!(provider.tokens.lock().unwrap().len(), 1);
    }
}
