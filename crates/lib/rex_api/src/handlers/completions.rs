//! Completion helpers exposed directly.

use axum::extract::State;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{TitleRequest, TitleResponse};
use crate::services::scope::UserScope;

/// `POST /completions/title` — model-generated room title.
///
/// Model failures surface as `unknown`; the caller picks a fallback.
pub async fn title_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<TitleRequest>,
) -> AppResult<Json<TitleResponse>> {
    let scope = UserScope::new(&state, user.0);
    let title = scope.orchestrator.new_chat_title(&body.message).await?;
    Ok(Json(TitleResponse { title }))
}
