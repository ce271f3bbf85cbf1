//! Repository traits for the data access layer.
//!
//! Services talk to storage exclusively through these traits. Individual
//! `*Repository` traits define the operations per data domain, matching
//! `*RepositoryProvider` traits expose each repository, and
//! [`RepositoryProvider`] is the supertrait a storage backend implements to
//! provide all of them plus lifecycle methods.

pub mod account;
pub mod audit;
pub mod refresh_token;

pub use account::AccountRepository;
pub use audit::AuditRepository;
pub use refresh_token::RefreshTokenRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for account repository access.
pub trait AccountRepositoryProvider: Send + Sync + 'static {
    type AccountRepo: AccountRepository;

    fn accounts(&self) -> &Self::AccountRepo;
}

/// Provider trait for refresh-token repository access.
pub trait RefreshTokenRepositoryProvider: Send + Sync + 'static {
    type RefreshTokenRepo: RefreshTokenRepository;

    fn refresh_tokens(&self) -> &Self::RefreshTokenRepo;
}

/// Provider trait for audit repository access.
pub trait AuditRepositoryProvider: Send + Sync + 'static {
    type AuditRepo: AuditRepository;

    fn audit(&self) -> &Self::AuditRepo;
}

/// Supertrait a storage backend implements to provide every repository the
/// authentication core needs, plus migrations and a health check.
#[async_trait]
pub trait RepositoryProvider:
    AccountRepositoryProvider + RefreshTokenRepositoryProvider + AuditRepositoryProvider
{
    /// Bring the schema up to date. Must be idempotent.
    async fn migrate(&self) -> Result<(), Error>;

    /// Cheap liveness probe against the underlying store.
    async fn health_check(&self) -> Result<(), Error>;
}
