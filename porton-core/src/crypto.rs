//! Cryptographic utilities for refresh-token handling.
//!
//! Refresh tokens are high-entropy random values. We store only their SHA-256
//! hash and look rows up by that hash; the plaintext exists solely on the
//! return path at issuance. Comparison against a stored hash goes through a
//! constant-time equality check from the `subtle` crate so verification time
//! does not depend on where the values diverge.
//!
//! SHA-256 (rather than a slow password hash) is appropriate here: with 512
//! bits of entropy in the token, offline brute force is infeasible and the
//! work factor of argon2/bcrypt buys nothing.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Entropy carried by a refresh token, in bytes.
pub const REFRESH_TOKEN_BYTES: usize = 64;

/// Generate a new opaque refresh-token value.
///
/// 64 bytes from the OS RNG, URL-safe base64 encoded (86 characters).
///
/// # Panics
///
/// Panics if the OS random number generator fails; there is no safe way to
/// continue issuing credentials without an entropy source.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a token for storage and lookup. Hex-encoded SHA-256.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a plaintext token against a stored hash in constant time.
pub fn verify_token_hash(token: &str, stored_hash: &str) -> bool {
    let computed = hash_token(token);
    constant_time_compare(computed.as_bytes(), stored_hash.as_bytes())
}

/// Constant-time byte comparison. Length mismatch short-circuits, which is
/// fine: hash lengths are public.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
