//! Full chat exchange: user message in, stored assistant reply out.

use axum::extract::State;
use axum::{Extension, Json};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ChatExchangeRequest, ChatExchangeResponse};
use crate::services::scope::UserScope;

/// `POST /chat` — send a message and wait for the reply.
///
/// Without `chatId` a room is started first, named by the model or, failing
/// that, by the message itself.
pub async fn chat_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<ChatExchangeRequest>,
) -> AppResult<Json<ChatExchangeResponse>> {
    if body.text.trim().is_empty() {
        return Err(AppError::Validation("Missing required field: text".into()));
    }
    let scope = UserScope::new(&state, user.0);

    let room_id = match body.chat_id {
        Some(id) => id,
        None => {
            let room = scope.orchestrator.start_room(&body.text).await?;
            info!(room_id = %room.id, "started chat room from first message");
            room.id
        }
    };

    let (user_message, reply) = scope.orchestrator.exchange(room_id, &body.text).await?;
    let chat_room = scope.rooms.get_room(room_id).await?;
    Ok(Json(ChatExchangeResponse {
        chat_room,
        user_message,
        reply,
    }))
}
