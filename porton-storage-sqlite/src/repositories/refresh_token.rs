use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use porton_core::{
    Error,
    account::AccountId,
    error::StorageError,
    repositories::RefreshTokenRepository,
    token::{NewRefreshToken, RefreshToken, RefreshTokenStats},
};

use crate::{from_unix, from_unix_opt};

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteRefreshToken {
    id: i64,
    account_id: i64,
    token_hash: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    expires_at: i64,
    revoked: bool,
    revoked_at: Option<i64>,
    revoked_by: Option<i64>,
    revoke_reason: Option<String>,
    created_at: i64,
}

impl From<SqliteRefreshToken> for RefreshToken {
    fn from(row: SqliteRefreshToken) -> Self {
        RefreshToken {
            id: row.id,
            account_id: AccountId::new(row.account_id),
            token_hash: row.token_hash,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            expires_at: from_unix(row.expires_at),
            revoked: row.revoked,
            revoked_at: from_unix_opt(row.revoked_at),
            revoked_by: row.revoked_by.map(AccountId::new),
            revoke_reason: row.revoke_reason,
            created_at: from_unix(row.created_at),
        }
    }
}

pub struct SqliteRefreshTokenRepository {
    pool: SqlitePool,
}

impl SqliteRefreshTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for SqliteRefreshTokenRepository {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshToken, Error> {
        let row = sqlx::query_as::<_, SqliteRefreshToken>(
            r#"
            INSERT INTO refresh_tokens
                (account_id, token_hash, ip_address, user_agent, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
        )
        .bind(token.account_id.as_i64())
        .bind(&token.token_hash)
        .bind(&token.ip_address)
        .bind(&token.user_agent)
        .bind(token.expires_at.timestamp())
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(row.into())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, Error> {
        let row = sqlx::query_as::<_, SqliteRefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token_hash = ?1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(row.map(|t| t.into()))
    }

    async fn revoke_by_hash(
        &self,
        token_hash: &str,
        revoked_by: Option<AccountId>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        // Guarding on `revoked = 0` makes double revocation a no-op.
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = 1, revoked_at = ?2, revoked_by = ?3, revoke_reason = ?4
            WHERE token_hash = ?1 AND revoked = 0
            "#,
        )
        .bind(token_hash)
        .bind(now.timestamp())
        .bind(revoked_by.map(|id| id.as_i64()))
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        revoked_by: Option<AccountId>,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = 1, revoked_at = ?2, revoked_by = ?3, revoke_reason = ?4
            WHERE account_id = ?1 AND revoked = 0
            "#,
        )
        .bind(account_id.as_i64())
        .bind(now.timestamp())
        .bind(revoked_by.map(|id| id.as_i64()))
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(result.rows_affected())
    }

    async fn count_dead(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM refresh_tokens
            WHERE expires_at < ?1 OR (revoked = 1 AND revoked_at < ?1)
            "#,
        )
        .bind(cutoff.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(count as u64)
    }

    async fn purge_dead(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at < ?1 OR (revoked = 1 AND revoked_at < ?1)
            "#,
        )
        .bind(cutoff.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(result.rows_affected())
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<RefreshTokenStats, Error> {
        let (total, active, revoked, expired): (i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(revoked = 0 AND expires_at > ?1), 0),
                   COALESCE(SUM(revoked = 1), 0),
                   COALESCE(SUM(expires_at <= ?1), 0)
            FROM refresh_tokens
            "#,
        )
        .bind(now.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;

        Ok(RefreshTokenStats {
            total: total as u64,
            active: active as u64,
            revoked: revoked as u64,
            expired: expired as u64,
        })
    }
}
