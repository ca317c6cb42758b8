//! Chat error taxonomy.
//!
//! Every fallible chat operation returns [`ChatError`]. Each variant carries a
//! short machine-readable code (see [`ChatError::code`]) so outer layers can
//! surface it without string matching.

use thiserror::Error;

use crate::auth::AuthError;

/// Convenience alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Closed set of failures the chat core can report.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing or blank required field, including a missing scoping identity.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced room, message or log entry does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Underlying persistence failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Language-model call failed or returned no usable choice.
    #[error("Model error: {0}")]
    Model(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ChatError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "invalid-argument",
            ChatError::NotFound(_) => "not-found",
            ChatError::Store(_) => "internal",
            ChatError::Model(_) => "unknown",
            ChatError::Auth(e) => e.code(),
        }
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => ChatError::NotFound("row not found".into()),
            _ => ChatError::Store(e.to_string()),
        }
    }
}

/// Reject blank (empty or whitespace-only) required fields.
pub(crate) fn require_field(value: &str, field: &str) -> ChatResult<()> {
    if value.trim().is_empty() {
        return Err(ChatError::Validation(format!("Missing required field: {field}")));
    }
    Ok(())
}
