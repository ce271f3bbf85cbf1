//! Configuration for the authentication services.
//!
//! Defaults mirror the shipped deployment: 1-hour access tokens, 7-day
//! refresh tokens with a 30-day retention window for dead rows, lockout
//! after 5 consecutive failures for 5 minutes, and a perimeter limit of
//! 5 login attempts per address per 15 minutes.

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};

use crate::error::{Error, ValidationError};

/// Access-token signing configuration.
///
/// One fixed symmetric algorithm (HS256) and nothing else: the validator is
/// built from the same config and rejects any token declaring a different
/// algorithm, so algorithm confusion is structurally impossible.
#[derive(Clone)]
pub struct AccessTokenConfig {
    secret: Vec<u8>,
    pub lifetime: Duration,
    pub issuer: Option<String>,
}

impl AccessTokenConfig {
    /// Minimum accepted signing-key length in bytes.
    pub const MIN_SECRET_LEN: usize = 32;

    /// Build a config from a shared secret.
    ///
    /// Rejects keys shorter than [`Self::MIN_SECRET_LEN`]; a weak key is a
    /// deployment error and must be fatal at startup, not discovered later.
    pub fn new(secret: Vec<u8>) -> Result<Self, Error> {
        if secret.len() < Self::MIN_SECRET_LEN {
            return Err(ValidationError::SigningKeyTooShort {
                actual: secret.len(),
                min: Self::MIN_SECRET_LEN,
            }
            .into());
        }
        Ok(Self {
            secret,
            lifetime: Duration::hours(1),
            issuer: None,
        })
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }

    pub fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

impl std::fmt::Debug for AccessTokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenConfig")
            .field("secret", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Per-account lockout behaviour.
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    /// Consecutive failures that trigger a lock.
    pub max_failed_attempts: u32,
    /// How long a triggered lock lasts.
    pub lock_duration: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lock_duration: Duration::minutes(5),
        }
    }
}

/// Refresh-token lifetimes.
#[derive(Debug, Clone)]
pub struct RefreshTokenConfig {
    /// Absolute lifetime of a token from issuance.
    pub lifetime: Duration,
    /// How long expired or revoked rows are kept before the purge removes
    /// them. Rows inside the window are dead to validation but retained for
    /// forensics.
    pub retention: Duration,
}

impl Default for RefreshTokenConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::days(7),
            retention: Duration::days(30),
        }
    }
}

/// Perimeter rate limiting on the login boundary.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::minutes(15),
        }
    }
}
