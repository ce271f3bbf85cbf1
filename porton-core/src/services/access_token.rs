//! Access-token issuance and validation.
//!
//! Access tokens are short-lived HS256 JWTs over `{sub, username, role}`.
//! They are stateless except for one deliberate lookup: every validation
//! re-fetches the account and rejects the token if the account has vanished,
//! been deactivated, or changed username or role since issuance. That is
//! what keeps a deactivated account's outstanding tokens from being honored
//! until their natural expiry.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Header, errors::ErrorKind};
use serde::Deserialize;

use crate::{
    Error,
    account::{AccountId, Identity, Role},
    config::AccessTokenConfig,
    error::TokenError,
    repositories::{AccountRepository, AccountRepositoryProvider},
    token::AccessTokenClaims,
};

/// Claims as decoded, before the required-field check. Identity fields are
/// optional here so a payload missing them yields a distinct denial instead
/// of a generic parse error.
#[derive(Debug, Deserialize)]
struct RawClaims {
    sub: Option<i64>,
    username: Option<String>,
    role: Option<Role>,
    #[allow(dead_code)]
    exp: i64,
}

#[derive(Clone)]
pub struct AccessTokenService<P: AccountRepositoryProvider> {
    provider: Arc<P>,
    config: AccessTokenConfig,
}

impl<P: AccountRepositoryProvider> AccessTokenService<P> {
    /// Anything shorter than this cannot be a JWT; reject before touching
    /// the signature machinery.
    pub const MIN_TOKEN_LEN: usize = 20;

    pub fn new(provider: Arc<P>, config: AccessTokenConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &AccessTokenConfig {
        &self.config
    }

    /// Lifetime of issued tokens in whole seconds, for the `expiresIn` echo.
    pub fn lifetime_seconds(&self) -> i64 {
        self.config.lifetime.num_seconds()
    }

    /// Mint a token for a validated identity.
    pub fn issue(&self, identity: &Identity) -> Result<String, Error> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: identity.account_id.as_i64(),
            username: identity.username.clone(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + self.config.lifetime).timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.config.encoding_key())
            .map_err(|e| TokenError::Malformed(format!("failed to encode token: {e}")).into())
    }

    /// Validate a presented token and return the live identity.
    ///
    /// Checks, in order: sanity length, signature/expiry/algorithm, required
    /// claims, then the live account record. Each denial reason is distinct
    /// for observability but every one of them is an unauthenticated outcome
    /// to the caller.
    pub async fn validate(&self, token: &str) -> Result<Identity, Error> {
        if token.len() < Self::MIN_TOKEN_LEN {
            return Err(TokenError::Malformed("token too short".to_string()).into());
        }

        let decoded = jsonwebtoken::decode::<RawClaims>(
            token,
            &self.config.decoding_key(),
            &self.config.validation(),
        )
        .map_err(|e| Error::Token(map_jwt_error(&e)))?;

        let claims = decoded.claims;
        let (sub, username, role) = match (claims.sub, claims.username, claims.role) {
            (Some(sub), Some(username), Some(role)) => (sub, username, role),
            _ => return Err(TokenError::MissingClaims.into()),
        };

        let account = self
            .provider
            .accounts()
            .find_by_id(AccountId::new(sub))
            .await?
            .ok_or_else(|| {
                tracing::debug!(account_id = sub, "token rejected: account gone");
                Error::Token(TokenError::SubjectNotFound)
            })?;

        if !account.is_active {
            tracing::debug!(account_id = sub, "token rejected: account deactivated");
            return Err(TokenError::SubjectInactive.into());
        }

        if account.username != username || account.role != role {
            tracing::debug!(account_id = sub, "token rejected: stale identity claims");
            return Err(TokenError::ClaimsMismatch.into());
        }

        Ok(account.identity())
    }
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::RejectedAlgorithm
        }
        other => TokenError::Malformed(format!("{other:?}")),
    }
}
