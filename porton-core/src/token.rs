//! Token types: persisted refresh-token rows and access-token claims.
//!
//! Refresh tokens are long-lived opaque credentials. The plaintext value is
//! returned to the caller exactly once at issuance and never persisted; only
//! its SHA-256 hash is stored. Access tokens are short-lived signed JWTs and
//! are never persisted at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{AccountId, Role};

/// A refresh-token row as stored. Holds the hash, never the plaintext.
///
/// A token is usable if and only if it is not revoked, not expired, and the
/// owning account is active. Any one of these failing is terminal for the
/// token; there is no partial-validity state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: i64,
    pub account_id: AccountId,
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    /// Who revoked it. `None` on a revoked row means the system did.
    pub revoked_by: Option<AccountId>,
    pub revoke_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Row-local usability: not revoked and not expired. The account-active
    /// part of the three-part check needs the account row and lives in the
    /// refresh service.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Insert payload for a refresh-token row.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub account_id: AccountId,
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued refresh token. `token` is the only copy of the plaintext
/// that will ever exist; hand it to the caller and drop it.
#[derive(Debug)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub record: RefreshToken,
}

/// Counts reported by the purge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Rows removed, or that would be removed in dry-run mode.
    pub affected: u64,
    pub dry_run: bool,
    /// Terminal rows older than this instant were (or would be) removed.
    pub cutoff: DateTime<Utc>,
}

/// Aggregate refresh-token counts, for the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshTokenStats {
    pub total: u64,
    pub active: u64,
    pub revoked: u64,
    pub expired: u64,
}

/// Claims carried by an access token.
///
/// `sub` is the numeric account id. Everything the validator needs is in the
/// payload; the live-account recheck exists only to catch deactivation and
/// role changes that postdate issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}
