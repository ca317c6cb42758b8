//! Usage statistics handler.

use axum::extract::State;
use axum::{Extension, Json};
use rex_core::usage::monthly_usage;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::UsageResponse;
use crate::services::scope::UserScope;

/// `GET /usage` — message totals per month of room creation.
pub async fn usage_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<UsageResponse>> {
    let scope = UserScope::new(&state, user.0);
    let rooms = scope.rooms.list_rooms().await?;
    Ok(Json(UsageResponse {
        usage: monthly_usage(&rooms),
    }))
}
