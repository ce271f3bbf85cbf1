use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Denials produced by the credential and lockout checks.
///
/// All of these are terminal for the request; none is retried internally.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password or unknown username. The two are indistinguishable to
    /// the caller. `remaining_attempts` is populated when the account exists
    /// and the lockout threshold has not yet been reached.
    #[error("Invalid credentials")]
    InvalidCredentials { remaining_attempts: Option<u32> },

    #[error("Account is deactivated")]
    AccountInactive,

    /// The account is locked until the given instant. Returned both when a
    /// locked account is attempted and at the moment the threshold is hit.
    #[error("Account is locked")]
    AccountLocked { locked_until: DateTime<Utc> },

    /// Perimeter rate limit exceeded for the client address.
    #[error("Too many login attempts")]
    RateLimited { retry_after: Duration },

    #[error("Permission denied")]
    PermissionDenied,
}

/// Why a token was rejected. The distinctions exist for observability; every
/// variant surfaces externally as the same unauthenticated outcome.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token declared an algorithm other than the one fixed at configuration.
    #[error("Token algorithm rejected")]
    RejectedAlgorithm,

    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Decoded payload lacks one of the required identity claims.
    #[error("Token missing required claims")]
    MissingClaims,

    /// Claims disagree with the live account record (role change, rename).
    #[error("Token claims do not match the account")]
    ClaimsMismatch,

    /// The account the token was minted for no longer exists.
    #[error("Token subject no longer exists")]
    SubjectNotFound,

    /// The account was deactivated after the token was minted.
    #[error("Token subject is deactivated")]
    SubjectInactive,

    /// Refresh token hash not present in the store.
    #[error("Unknown token")]
    NotFound,

    #[error("Token revoked")]
    Revoked,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Signing key shorter than the enforced minimum. Fatal at startup.
    #[error("Signing key too short: {actual} bytes, need at least {min}")]
    SigningKeyTooShort { actual: usize, min: usize },
}

impl Error {
    /// True for denials that must surface as "unauthenticated" (401).
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::InvalidCredentials { .. }) | Error::Token(_)
        )
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// True for throttling denials that carry a retry-after delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::RateLimited { .. }) | Error::Auth(AuthError::AccountLocked { .. })
        )
    }
}
