use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use porton_core::{
    Error,
    account::{Account, AccountId, LockoutCounters},
    error::StorageError,
    repositories::AccountRepository,
};

use crate::{from_unix, from_unix_opt};

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteAccount {
    id: i64,
    username: String,
    role: String,
    is_active: bool,
    failed_attempts: i64,
    locked_until: Option<i64>,
    last_failed_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SqliteAccount> for Account {
    type Error = Error;

    fn try_from(row: SqliteAccount) -> Result<Self, Error> {
        Ok(Account {
            id: AccountId::new(row.id),
            username: row.username,
            role: row.role.parse()?,
            is_active: row.is_active,
            failed_attempts: row.failed_attempts.max(0) as u32,
            locked_until: from_unix_opt(row.locked_until),
            last_failed_at: from_unix_opt(row.last_failed_at),
            created_at: from_unix(row.created_at),
            updated_at: from_unix(row.updated_at),
        })
    }
}

pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            SELECT id, username, role, is_active, failed_attempts,
                   locked_until, last_failed_at, created_at, updated_at
            FROM accounts
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            SELECT id, username, role, is_active, failed_attempts,
                   locked_until, last_failed_at, created_at, updated_at
            FROM accounts
            WHERE id = ?1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        row.map(Account::try_from).transpose()
    }

    async fn password_hash(&self, id: AccountId) -> Result<Option<String>, Error> {
        let hash: Option<Option<String>> =
            sqlx::query_scalar("SELECT password_hash FROM accounts WHERE id = ?1")
                .bind(id.as_i64())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(hash.flatten())
    }

    async fn record_failed_attempt(
        &self,
        id: AccountId,
        threshold: u32,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<LockoutCounters, Error> {
        // Increment and threshold comparison in one statement, so concurrent
        // failures each see their own post-increment counter.
        let row: Option<(i64, Option<i64>)> = sqlx::query_as(
            r#"
            UPDATE accounts
            SET failed_attempts = failed_attempts + 1,
                last_failed_at = ?2,
                locked_until = CASE
                    WHEN failed_attempts + 1 >= ?3 THEN ?4
                    ELSE locked_until
                END,
                updated_at = ?2
            WHERE id = ?1
            RETURNING failed_attempts, locked_until
            "#,
        )
        .bind(id.as_i64())
        .bind(now.timestamp())
        .bind(threshold as i64)
        .bind(lock_until.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        let (failed_attempts, locked_until) =
            row.ok_or(Error::Storage(StorageError::NotFound))?;

        Ok(LockoutCounters {
            failed_attempts: failed_attempts.max(0) as u32,
            locked_until: from_unix_opt(locked_until),
        })
    }

    async fn clear_lockout(&self, id: AccountId) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET failed_attempts = 0, locked_until = NULL, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id.as_i64())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteRepositoryProvider;
    use chrono::Duration;
    use porton_core::account::Role;
    use porton_core::repositories::{AccountRepositoryProvider, RepositoryProvider};

    async fn setup() -> SqliteRepositoryProvider {
        let provider = SqliteRepositoryProvider::connect("sqlite::memory:")
            .await
            .unwrap();
        provider.migrate().await.unwrap();
        provider
    }

    async fn seed_account(provider: &SqliteRepositoryProvider, username: &str, role: &str) -> i64 {
        let now = Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO accounts (username, password_hash, role, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?4)
            "#,
        )
        .bind(username)
        .bind("$argon2id$stub")
        .bind(role)
        .bind(now)
        .execute(provider.pool())
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_find_by_username_and_id() {
        let provider = setup().await;
        let id = seed_account(&provider, "alice", "manager").await;

        let by_name = provider
            .accounts()
            .find_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, AccountId::new(id));
        assert_eq!(by_name.role, Role::Manager);
        assert!(by_name.is_active);
        assert_eq!(by_name.failed_attempts, 0);

        let by_id = provider
            .accounts()
            .find_by_id(AccountId::new(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.username, "alice");

        assert!(
            provider
                .accounts()
                .find_by_username("nobody")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_password_hash_fetched_separately() {
        let provider = setup().await;
        let id = seed_account(&provider, "alice", "clerk").await;

        let hash = provider
            .accounts()
            .password_hash(AccountId::new(id))
            .await
            .unwrap();
        assert_eq!(hash.as_deref(), Some("$argon2id$stub"));

        assert!(
            provider
                .accounts()
                .password_hash(AccountId::new(9999))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_failed_attempts_lock_at_threshold() {
        let provider = setup().await;
        let id = AccountId::new(seed_account(&provider, "alice", "clerk").await);
        let now = Utc::now();
        let lock_until = now + Duration::minutes(5);

        for expected in 1..3u32 {
            let counters = provider
                .accounts()
                .record_failed_attempt(id, 3, lock_until, now)
                .await
                .unwrap();
            assert_eq!(counters.failed_attempts, expected);
            assert_eq!(counters.locked_until, None);
        }

        let counters = provider
            .accounts()
            .record_failed_attempt(id, 3, lock_until, now)
            .await
            .unwrap();
        assert_eq!(counters.failed_attempts, 3);
        assert_eq!(
            counters.locked_until.map(|t| t.timestamp()),
            Some(lock_until.timestamp())
        );
    }

    #[tokio::test]
    async fn test_clear_lockout_resets_counters() {
        let provider = setup().await;
        let id = AccountId::new(seed_account(&provider, "alice", "clerk").await);
        let now = Utc::now();

        for _ in 0..3 {
            provider
                .accounts()
                .record_failed_attempt(id, 3, now + Duration::minutes(5), now)
                .await
                .unwrap();
        }

        provider.accounts().clear_lockout(id).await.unwrap();

        let account = provider.accounts().find_by_id(id).await.unwrap().unwrap();
        assert_eq!(account.failed_attempts, 0);
        assert_eq!(account.locked_until, None);
    }

    #[tokio::test]
    async fn test_failed_attempt_on_missing_account_is_not_found() {
        let provider = setup().await;
        let err = provider
            .accounts()
            .record_failed_attempt(AccountId::new(42), 3, Utc::now(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::NotFound)
        ));
    }
}
