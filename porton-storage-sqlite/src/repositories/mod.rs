//! Repository implementations for SQLite storage.

pub mod account;
pub mod audit;
pub mod refresh_token;

pub use account::SqliteAccountRepository;
pub use audit::SqliteAuditRepository;
pub use refresh_token::SqliteRefreshTokenRepository;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use porton_core::{
    Error,
    error::StorageError,
    repositories::{
        AccountRepositoryProvider, AuditRepositoryProvider, RefreshTokenRepositoryProvider,
        RepositoryProvider,
    },
};

/// Idempotent schema statements, executed in order by [`migrate`]. The
/// accounts table carries columns owned by the wider application (for
/// example `password_hash`); this backend only ever reads those.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        role TEXT NOT NULL DEFAULT 'clerk',
        is_active INTEGER NOT NULL DEFAULT 1,
        failed_attempts INTEGER NOT NULL DEFAULT 0,
        locked_until INTEGER,
        last_failed_at INTEGER,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL REFERENCES accounts(id),
        token_hash TEXT NOT NULL UNIQUE,
        ip_address TEXT,
        user_agent TEXT,
        expires_at INTEGER NOT NULL,
        revoked INTEGER NOT NULL DEFAULT 0,
        revoked_at INTEGER,
        revoked_by INTEGER,
        revoke_reason TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_account_id ON refresh_tokens(account_id)",
    "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_expires_at ON refresh_tokens(expires_at)",
    r#"
    CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        actor_id INTEGER,
        actor_username TEXT,
        actor_role TEXT,
        action TEXT NOT NULL,
        entity TEXT,
        entity_id TEXT,
        success INTEGER NOT NULL,
        status_code INTEGER,
        ip_address TEXT,
        user_agent TEXT,
        details TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_audit_log_created_at ON audit_log(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_audit_log_actor_id ON audit_log(actor_id)",
];

/// Repository provider implementation for SQLite.
///
/// Implements the individual repository provider traits as well as the
/// unified `RepositoryProvider` trait.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    account: SqliteAccountRepository,
    refresh_token: SqliteRefreshTokenRepository,
    audit: SqliteAuditRepository,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let account = SqliteAccountRepository::new(pool.clone());
        let refresh_token = SqliteRefreshTokenRepository::new(pool.clone());
        let audit = SqliteAuditRepository::new(pool.clone());

        Self {
            pool,
            account,
            refresh_token,
            audit,
        }
    }

    /// Open a pool against the given SQLite URL with a bounded acquire
    /// timeout, so a wedged database turns into a storage error instead of
    /// an unbounded stall at the boundary.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| Error::Storage(StorageError::Connection(e.to_string())))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AccountRepositoryProvider for SqliteRepositoryProvider {
    type AccountRepo = SqliteAccountRepository;

    fn accounts(&self) -> &Self::AccountRepo {
        &self.account
    }
}

impl RefreshTokenRepositoryProvider for SqliteRepositoryProvider {
    type RefreshTokenRepo = SqliteRefreshTokenRepository;

    fn refresh_tokens(&self) -> &Self::RefreshTokenRepo {
        &self.refresh_token
    }
}

impl AuditRepositoryProvider for SqliteRepositoryProvider {
    type AuditRepo = SqliteAuditRepository;

    fn audit(&self) -> &Self::AuditRepo {
        &self.audit
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await.map_err(|e| {
                tracing::error!(error = %e, "failed to run schema migration");
                Error::Storage(StorageError::Database(e.to_string()))
            })?;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;
        Ok(())
    }
}
