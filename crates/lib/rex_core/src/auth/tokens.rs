//! Opaque tokens (refresh, password reset): generation and storage hashing.

use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};

/// Refresh token lifetime: 30 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

/// Password reset token lifetime: 1 hour.
pub const RESET_TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Generate a cryptographically random token (64 alphanumeric chars).
pub fn generate_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// SHA-256 hash a token for storage. Plaintext tokens are never persisted.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
