//! Application error types.
//!
//! Every failure renders as `{ "error": code, "message": text }` where `code`
//! is the same machine code the core reports.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rex_core::ChatError;
use rex_core::auth::AuthError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The language model failed and there is nothing to fall back on.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "invalid-argument",
            AppError::NotFound(_) => "not-found",
            AppError::Unauthorized(_) => "unauthenticated",
            AppError::Upstream(_) => "unknown",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.as_str()),
            AppError::Upstream(m) => {
                error!("upstream failure: {m}");
                (StatusCode::BAD_GATEWAY, "The language model request failed")
            }
            AppError::Internal(m) => {
                error!("internal error: {m}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };
        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Validation(msg) => AppError::Validation(msg),
            ChatError::NotFound(msg) => AppError::NotFound(msg),
            ChatError::Store(msg) => AppError::Internal(msg),
            ChatError::Model(msg) => AppError::Upstream(msg),
            ChatError::Auth(e) => AppError::from(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::TokenError(msg) => AppError::Unauthorized(msg),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Store(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_core_taxonomy() {
        let cases = [
            ChatError::Validation("x".into()),
            ChatError::NotFound("x".into()),
            ChatError::Store("x".into()),
            ChatError::Model("x".into()),
            ChatError::Auth(AuthError::InvalidCredentials),
        ];
        for e in cases {
            let core_code = e.code();
            assert_eq!(AppError::from(e).code(), core_code);
        }
    }

    #[tokio::test]
    async fn json_rejection_is_invalid_argument() {
        use axum::extract::FromRequest;
        use axum::extract::Request;

        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let rejection = Json::<crate::models::CreateChatRequest>::from_request(req, &())
            .await
            .unwrap_err();
        let err = AppError::from(rejection);
        assert_eq!(err.code(), "invalid-argument");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn statuses() {
        let status = |e: AppError| e.into_response().status();
        assert_eq!(status(AppError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::Upstream("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
