use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::{Account, AccountId, LockoutCounters},
};

/// Repository for account reads and lockout-column writes.
///
/// The core never creates or edits accounts; those are administrative
/// operations owned elsewhere. The only mutations here are the lockout
/// counters.
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, Error>;

    /// Fetch the stored password hash. `None` for accounts without a
    /// credential (treated as a mismatch by the verifier).
    async fn password_hash(&self, id: AccountId) -> Result<Option<String>, Error>;

    /// Record one failed attempt in a single atomic statement.
    ///
    /// The increment and the threshold comparison must happen in one
    /// statement (or a transaction with row locking) so that two concurrent
    /// failures cannot both observe the pre-increment counter and undercount
    /// toward the threshold. When the incremented counter reaches
    /// `threshold`, the implementation sets `locked_until` to `lock_until`.
    /// Returns the post-update counters.
    async fn record_failed_attempt(
        &self,
        id: AccountId,
        threshold: u32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<LockoutCounters, Error>;

    /// Reset `failed_attempts` to 0 and `locked_until` to null. Used both
    /// for the lazy unlock of an expired lock and as part of a successful
    /// login.
    async fn clear_lockout(&self, id: AccountId) -> Result<(), Error>;
}
