//! Authentication: password hashing, JWT management, opaque tokens, and the
//! identity provider used by the chat core and the HTTP layer.

pub mod jwt;
pub mod password;
pub mod service;
pub mod session;
pub mod tokens;

use thiserror::Error;

pub use service::{Authenticator, LogMailer, ResetMailer};
pub use session::IdentitySession;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials | AuthError::TokenError(_) => "unauthenticated",
            AuthError::ValidationError(_) => "invalid-argument",
            AuthError::Store(_) | AuthError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                AuthError::ValidationError("Email already registered".into())
            }
            _ => AuthError::Store(e.to_string()),
        }
    }
}
