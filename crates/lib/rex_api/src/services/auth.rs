//! Authentication service: login/register flows delegating to `rex_core::auth`.

use rex_core::auth::Authenticator;
use rex_core::auth::service::TokenPair;
use rex_core::models::auth::Identity;

use crate::error::AppResult;
use crate::models::{PasswordResetResponse, SuccessResponse, TokenResponse};

/// Build a `TokenResponse` from user data plus a fresh token pair.
fn build_token_response(user: Identity, pair: TokenPair) -> TokenResponse {
    TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        expires_in: pair.expires_in,
        token_type: "Bearer".to_string(),
        user,
    }
}

/// Authenticate with email + password.
pub async fn login(auth: &Authenticator, email: &str, password: &str) -> AppResult<TokenResponse> {
    let user = auth.sign_in(email, password).await?;
    let pair = auth.issue_tokens(&user).await?;
    Ok(build_token_response(user, pair))
}

/// Register a new user account and sign it in.
pub async fn register(
    auth: &Authenticator,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> AppResult<TokenResponse> {
    let user = auth.register(email, password, name).await?;
    let pair = auth.issue_tokens(&user).await?;
    Ok(build_token_response(user, pair))
}

/// Refresh an access token using a refresh token (single-use rotation).
pub async fn refresh(auth: &Authenticator, refresh_token: &str) -> AppResult<TokenResponse> {
    let (user, pair) = auth.refresh(refresh_token).await?;
    Ok(build_token_response(user, pair))
}

/// Logout: revoke a specific refresh token.
pub async fn logout(auth: &Authenticator, refresh_token: Option<&str>) -> AppResult<SuccessResponse> {
    auth.logout(refresh_token).await?;
    Ok(SuccessResponse { success: true })
}

/// Send a reset email. Unknown addresses are not distinguishable to callers
/// beyond `sent: false`.
pub async fn request_password_reset(auth: &Authenticator, email: &str) -> PasswordResetResponse {
    PasswordResetResponse {
        sent: auth.send_reset_email(email).await,
    }
}

pub async fn confirm_password_reset(
    auth: &Authenticator,
    token: &str,
    new_password: &str,
) -> AppResult<SuccessResponse> {
    auth.reset_password(token, new_password).await?;
    Ok(SuccessResponse { success: true })
}
