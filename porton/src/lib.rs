//! # Portón
//!
//! Portón is the authentication and session core of the internal
//! record-keeping application. It verifies passwords, enforces the
//! per-account lockout and per-address rate limit, mints and validates the
//! two token kinds (short-lived signed access tokens, long-lived opaque
//! refresh tokens), and writes the append-only audit trail.
//!
//! The [`Porton`] coordinator owns the services and exposes one method per
//! boundary operation. Storage is abstracted behind the repository traits in
//! `porton-core`; the shipped backend is SQLite.
//!
//! ## Example
//!
//! ```rust,no_run
//! use porton::{Porton, PortonConfig, SqliteRepositoryProvider};
//! use porton_core::client::ClientInfo;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repositories = Arc::new(SqliteRepositoryProvider::connect("sqlite:porton.db").await?);
//!     let porton = Porton::new(repositories, PortonConfig::new(b"a-32-byte-minimum-signing-secret".to_vec())?);
//!     porton.migrate().await?;
//!
//!     let client = ClientInfo::new(Some("10.0.0.1".into()), None);
//!     let session = porton.login("alice", "password", &client).await?;
//!     println!("access token: {}", session.access_token);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use porton_core::{
    Error,
    account::Identity,
    audit::{AuditAction, AuditPage, AuditQuery, NewAuditEvent},
    client::ClientInfo,
    config::{AccessTokenConfig, LockoutConfig, RateLimitConfig, RefreshTokenConfig},
    error::{AuthError, ValidationError},
    repositories::{AccountRepository, AccountRepositoryProvider, RepositoryProvider},
    services::{
        AccessTokenService, AuditService, LockoutGate, LockoutService, LoginRateLimiter,
        PasswordVerifier, RateLimitDecision, RefreshTokenService,
    },
    token::{PurgeReport, RefreshTokenStats},
};

pub use porton_core::{Account, AccountId, Permission, Role};

#[cfg(feature = "sqlite")]
pub use porton_storage_sqlite::SqliteRepositoryProvider;

/// Top-level configuration, one section per policy.
#[derive(Debug, Clone)]
pub struct PortonConfig {
    pub access_token: AccessTokenConfig,
    pub lockout: LockoutConfig,
    pub refresh_token: RefreshTokenConfig,
    pub rate_limit: RateLimitConfig,
}

impl PortonConfig {
    /// Build a config with default policies around the given signing secret.
    /// Fails when the secret is below the enforced minimum length.
    pub fn new(signing_secret: Vec<u8>) -> Result<Self, Error> {
        Ok(Self {
            access_token: AccessTokenConfig::new(signing_secret)?,
            lockout: LockoutConfig::default(),
            refresh_token: RefreshTokenConfig::default(),
            rate_limit: RateLimitConfig::default(),
        })
    }
}

/// Tokens handed out by a successful login.
#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    /// Access-token lifetime in seconds, for the client's benefit.
    pub expires_in: i64,
    /// Opaque refresh token, returned in plaintext exactly once.
    pub refresh_token: String,
    pub identity: Identity,
}

/// A fresh access token minted from a refresh token. The refresh token
/// itself is untouched; there is no rotation on use.
#[derive(Debug)]
pub struct AccessGrant {
    pub access_token: String,
    pub expires_in: i64,
    pub identity: Identity,
}

/// The central coordinator: one instance per process, shared behind `Arc`.
///
/// Every boundary method writes exactly one audit event before returning,
/// on every path including denials. A failed audit append fails the whole
/// operation; the system does not act without a trail.
pub struct Porton<R: RepositoryProvider> {
    repositories: Arc<R>,
    access_tokens: AccessTokenService<R>,
    lockout: LockoutService<R>,
    refresh_tokens: RefreshTokenService<R>,
    audit: AuditService<R>,
    limiter: Arc<LoginRateLimiter>,
}

impl<R: RepositoryProvider> Porton<R> {
    pub fn new(repositories: Arc<R>, config: PortonConfig) -> Self {
        Self {
            access_tokens: AccessTokenService::new(repositories.clone(), config.access_token),
            lockout: LockoutService::new(repositories.clone(), config.lockout),
            refresh_tokens: RefreshTokenService::new(repositories.clone(), config.refresh_token),
            audit: AuditService::new(repositories.clone()),
            limiter: Arc::new(LoginRateLimiter::new(config.rate_limit)),
            repositories,
        }
    }

    /// Bring the storage schema up to date.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Liveness probe against the underlying store.
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Consume one perimeter slot for the client address. A refused attempt
    /// is audited and denied here, before any password work happens.
    async fn take_limiter_slot(
        &self,
        username: &str,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        if let RateLimitDecision::Limited { retry_after } =
            self.limiter.try_acquire(client.limiter_key(), now)
        {
            tracing::warn!(client = %client.limiter_key(), "login rate limit exceeded");
            self.audit
                .record(
                    NewAuditEvent::new(AuditAction::LoginFailure, false)
                        .claimed_username(username)
                        .client(client)
                        .status_code(429)
                        .details(json!({ "reason": "rate_limited" })),
                )
                .await?;
            return Err(AuthError::RateLimited { retry_after }.into());
        }
        Ok(())
    }

    /// Authenticate a username and password and open a session.
    ///
    /// The checks run in a fixed order: field presence, account existence,
    /// active flag, lockout gate, perimeter rate limit, and only then the
    /// password. A limiter slot is consumed only by attempts that reach
    /// password verification, so a locked account keeps answering "locked"
    /// even after its failed attempts have filled the address window.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<SessionTokens, Error> {
        let now = Utc::now();

        if username.is_empty() || password.is_empty() {
            self.audit
                .record(
                    NewAuditEvent::new(AuditAction::LoginFailure, false)
                        .claimed_username(username)
                        .client(client)
                        .status_code(400)
                        .details(json!({ "reason": "missing_fields" })),
                )
                .await?;
            let field = if username.is_empty() { "username" } else { "password" };
            return Err(ValidationError::MissingField(field.to_string()).into());
        }

        let Some(account) = self
            .repositories
            .accounts()
            .find_by_username(username)
            .await?
        else {
            self.take_limiter_slot(username, client, now).await?;
            // Burn the same verification work as a real mismatch so unknown
            // usernames are not distinguishable by timing.
            PasswordVerifier::verify_dummy(password);
            self.audit
                .record(
                    NewAuditEvent::new(AuditAction::LoginFailure, false)
                        .claimed_username(username)
                        .client(client)
                        .status_code(401)
                        .details(json!({ "reason": "unknown_username" })),
                )
                .await?;
            return Err(AuthError::InvalidCredentials {
                remaining_attempts: None,
            }
            .into());
        };

        if !account.is_active {
            self.audit
                .record(
                    NewAuditEvent::new(AuditAction::LoginFailure, false)
                        .actor(&account.identity())
                        .client(client)
                        .status_code(403)
                        .details(json!({ "reason": "account_inactive" })),
                )
                .await?;
            return Err(AuthError::AccountInactive.into());
        }

        if let LockoutGate::Locked { locked_until } = self.lockout.check(&account, now).await? {
            self.audit
                .record(
                    NewAuditEvent::new(AuditAction::LoginFailure, false)
                        .actor(&account.identity())
                        .client(client)
                        .status_code(423)
                        .details(json!({
                            "reason": "account_locked",
                            "locked_until": locked_until.to_rfc3339(),
                        })),
                )
                .await?;
            return Err(AuthError::AccountLocked { locked_until }.into());
        }

        self.take_limiter_slot(username, client, now).await?;

        let hash = self.repositories.accounts().password_hash(account.id).await?;
        let verified = hash
            .as_deref()
            .is_some_and(|hash| PasswordVerifier::verify(password, hash));

        if !verified {
            let failure = self.lockout.record_failure(account.id, now).await?;

            if failure.just_locked {
                let locked_until = failure.counters.locked_until.unwrap_or(now);
                self.audit
                    .record(
                        NewAuditEvent::new(AuditAction::AccountLocked, false)
                            .actor(&account.identity())
                            .client(client)
                            .status_code(423)
                            .details(json!({
                                "failed_attempts": failure.counters.failed_attempts,
                                "locked_until": locked_until.to_rfc3339(),
                            })),
                    )
                    .await?;
                return Err(AuthError::AccountLocked { locked_until }.into());
            }

            self.audit
                .record(
                    NewAuditEvent::new(AuditAction::LoginFailure, false)
                        .actor(&account.identity())
                        .client(client)
                        .status_code(401)
                        .details(json!({
                            "reason": "wrong_password",
                            "remaining_attempts": failure.remaining_attempts,
                        })),
                )
                .await?;
            return Err(AuthError::InvalidCredentials {
                remaining_attempts: Some(failure.remaining_attempts),
            }
            .into());
        }

        self.lockout.record_success(&account).await?;

        let identity = account.identity();
        let access_token = self.access_tokens.issue(&identity)?;
        let issued = self.refresh_tokens.issue(account.id, client).await?;

        self.audit
            .record(
                NewAuditEvent::new(AuditAction::LoginSuccess, true)
                    .actor(&identity)
                    .client(client)
                    .status_code(200),
            )
            .await?;

        tracing::info!(account_id = %identity.account_id, "login succeeded");

        Ok(SessionTokens {
            access_token,
            expires_in: self.access_tokens.lifetime_seconds(),
            refresh_token: issued.token,
            identity,
        })
    }

    /// Exchange a refresh token for a fresh access token.
    ///
    /// The refresh token stays valid afterwards; only its expiry or an
    /// explicit logout ends it.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<AccessGrant, Error> {
        if refresh_token.is_empty() {
            self.audit
                .record(
                    NewAuditEvent::new(AuditAction::RefreshFailure, false)
                        .client(client)
                        .status_code(400)
                        .details(json!({ "reason": "missing_token" })),
                )
                .await?;
            return Err(ValidationError::MissingField("refreshToken".to_string()).into());
        }

        let account = match self.refresh_tokens.validate(refresh_token).await {
            Ok(account) => account,
            Err(err @ Error::Token(_)) => {
                self.audit
                    .record(
                        NewAuditEvent::new(AuditAction::RefreshFailure, false)
                            .client(client)
                            .status_code(401)
                            .details(json!({ "reason": err.to_string() })),
                    )
                    .await?;
                return Err(err);
            }
            Err(other) => return Err(other),
        };

        let identity = account.identity();
        let access_token = self.access_tokens.issue(&identity)?;

        self.audit
            .record(
                NewAuditEvent::new(AuditAction::RefreshSuccess, true)
                    .actor(&identity)
                    .client(client)
                    .status_code(200),
            )
            .await?;

        Ok(AccessGrant {
            access_token,
            expires_in: self.access_tokens.lifetime_seconds(),
            identity,
        })
    }

    /// End one session by revoking its refresh token. Revoking a token that
    /// is already dead is a no-op, and the operation reports success either
    /// way.
    pub async fn logout(
        &self,
        identity: &Identity,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<bool, Error> {
        let revoked = self
            .refresh_tokens
            .revoke(refresh_token, Some(identity.account_id), "logout")
            .await?;

        self.audit
            .record(
                NewAuditEvent::new(AuditAction::Logout, true)
                    .actor(identity)
                    .client(client)
                    .status_code(200)
                    .details(json!({ "token_revoked": revoked })),
            )
            .await?;

        Ok(revoked)
    }

    /// End every session of the calling account. Returns how many tokens
    /// were revoked.
    pub async fn logout_all(
        &self,
        identity: &Identity,
        client: &ClientInfo,
    ) -> Result<u64, Error> {
        let revoked = self
            .refresh_tokens
            .revoke_all(identity.account_id, Some(identity.account_id), "logout_all")
            .await?;

        self.audit
            .record(
                NewAuditEvent::new(AuditAction::LogoutAll, true)
                    .actor(identity)
                    .client(client)
                    .status_code(200)
                    .details(json!({ "tokens_revoked": revoked })),
            )
            .await?;

        Ok(revoked)
    }

    /// Validate a bearer access token and resolve the live identity behind
    /// it. All rejection reasons surface as the same unauthenticated error.
    pub async fn authenticate(&self, bearer_token: &str) -> Result<Identity, Error> {
        self.access_tokens.validate(bearer_token).await
    }

    /// Revoke every refresh token of an account on behalf of the system or
    /// an administrator, for example when the account is deactivated.
    pub async fn revoke_account_sessions(
        &self,
        account_id: AccountId,
        revoked_by: Option<AccountId>,
        reason: &str,
    ) -> Result<u64, Error> {
        self.refresh_tokens
            .revoke_all(account_id, revoked_by, reason)
            .await
    }

    /// The admin audit listing: filtered, paged, newest first.
    pub async fn audit_events(&self, query: &AuditQuery) -> Result<AuditPage, Error> {
        self.audit.query(query).await
    }

    /// Aggregate refresh-token counts for the admin surface.
    pub async fn token_stats(&self) -> Result<RefreshTokenStats, Error> {
        self.refresh_tokens.stats(Utc::now()).await
    }

    /// Remove refresh-token rows dead since before the retention cutoff.
    /// `retention_override` substitutes the configured window for this run
    /// only; `dry_run` reports without deleting.
    pub async fn purge_tokens(
        &self,
        retention_override: Option<Duration>,
        dry_run: bool,
    ) -> Result<PurgeReport, Error> {
        self.refresh_tokens.purge(retention_override, dry_run).await
    }

    /// Start the periodic maintenance task.
    ///
    /// Hourly it drops elapsed rate-limiter windows; daily it purges dead
    /// refresh-token rows past the configured retention. Errors are logged
    /// and the task keeps running; the next tick retries.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let refresh_tokens = self.refresh_tokens.clone();
        let limiter = self.limiter.clone();

        const LIMITER_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);
        const PURGE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(86400);

        tokio::spawn(async move {
            let mut limiter_timer = tokio::time::interval(LIMITER_INTERVAL);
            let mut purge_timer = tokio::time::interval(PURGE_INTERVAL);

            loop {
                tokio::select! {
                    _ = limiter_timer.tick() => {
                        let evicted = limiter.evict_expired(Utc::now());
                        if evicted > 0 {
                            tracing::debug!(evicted, "evicted elapsed rate-limit windows");
                        }
                    }
                    _ = purge_timer.tick() => {
                        if let Err(e) = refresh_tokens.purge(None, false).await {
                            tracing::warn!(error = %e, "refresh token purge failed");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("shutting down maintenance task");
                        break;
                    }
                }
            }
        })
    }
}
