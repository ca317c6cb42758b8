//! Request extractors that report failures in the API error format.

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body extractor. Malformed or incomplete bodies become
/// `invalid-argument` instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
