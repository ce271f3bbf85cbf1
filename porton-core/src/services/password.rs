//! Password hashing and verification.
//!
//! Verification is a slow, salted comparison (argon2id via `password-auth`,
//! hundreds of milliseconds by design). The plaintext is never logged or
//! persisted, and any internal error from the hashing library is collapsed
//! into "no match" rather than surfaced as a distinct error class.

use password_auth::{generate_hash, verify_password};

/// A syntactically valid argon2id hash that matches no password. Used to
/// burn the same verification work when the username does not resolve, so a
/// nonexistent account is indistinguishable from a wrong password by timing.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Stateless password verifier with a fixed work factor.
pub struct PasswordVerifier;

impl PasswordVerifier {
    /// Hash a password for storage. Used by account provisioning and tests;
    /// the authentication path itself never writes hashes.
    pub fn hash(password: &str) -> String {
        generate_hash(password)
    }

    /// Compare a candidate against a stored hash. Parse failures, malformed
    /// hashes and library errors all come back as `false`.
    pub fn verify(password: &str, hash: &str) -> bool {
        verify_password(password, hash).is_ok()
    }

    /// Perform a verification against a dummy hash and discard the result.
    /// Called on the unknown-username path to keep its timing profile
    /// aligned with a real mismatch.
    pub fn verify_dummy(password: &str) {
        let _ = verify_password(password, DUMMY_HASH);
    }
}
