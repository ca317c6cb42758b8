//! Authentication request handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::models::{
    LoginRequest, LogoutRequest, PasswordResetConfirmRequest, PasswordResetRequest,
    PasswordResetResponse, RefreshRequest, RegisterRequest, SuccessResponse, TokenResponse,
};
use crate::services::auth;

/// `POST /auth/login` — authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::login(&state.auth, &body.email, &body.password).await?;
    Ok(Json(resp))
}

/// `POST /auth/register` — create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::register(
        &state.auth,
        &body.email,
        &body.password,
        body.name.as_deref(),
    )
    .await?;
    Ok(Json(resp))
}

/// `POST /auth/refresh` — exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::refresh(&state.auth, &body.refresh_token).await?;
    Ok(Json(resp))
}

/// `POST /auth/logout` — revoke a refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LogoutRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let resp = auth::logout(&state.auth, body.refresh_token.as_deref()).await?;
    Ok(Json(resp))
}

/// `POST /auth/password-reset` — email a reset token.
pub async fn password_reset_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<PasswordResetRequest>,
) -> Json<PasswordResetResponse> {
    Json(auth::request_password_reset(&state.auth, &body.email).await)
}

/// `POST /auth/password-reset/confirm` — set a new password with a reset token.
pub async fn password_reset_confirm_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<PasswordResetConfirmRequest>,
) -> AppResult<Json<SuccessResponse>> {
    let resp = auth::confirm_password_reset(&state.auth, &body.token, &body.new_password).await?;
    Ok(Json(resp))
}
