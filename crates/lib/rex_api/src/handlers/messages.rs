//! Message handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rex_core::models::chat::{ASSISTANT_SENDER_ID, ChatRoom, Message};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{MessagesResponse, PostMessageRequest, PostMessageResponse, STATUS_SUCCESS};
use crate::services::scope::UserScope;

/// `GET /chats/{id}/messages` — messages in rendering order.
pub async fn list_messages_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessagesResponse>> {
    let scope = UserScope::new(&state, user.0);
    let messages = scope.messages.list(id).await?;
    Ok(Json(MessagesResponse { messages }))
}

/// `POST /chats/{id}/messages` — append a message without asking the model.
pub async fn post_message_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<PostMessageResponse>)> {
    let scope = UserScope::new(&state, user.0);
    let sender_id = match body.sender_id {
        None => scope.user.id.clone(),
        Some(sender) if sender == scope.user.id || sender == ASSISTANT_SENDER_ID => sender,
        Some(_) => {
            return Err(AppError::Validation(
                "senderId must be the caller or the assistant".into(),
            ));
        }
    };
    let message = scope.messages.append(id, &body.text, &sender_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(PostMessageResponse {
            status: STATUS_SUCCESS.into(),
            chat_id: id,
            message_id: message.id,
        }),
    ))
}

/// `GET /chats/{id}/messages/{message_id}`
pub async fn get_message_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Message>> {
    let scope = UserScope::new(&state, user.0);
    Ok(Json(scope.messages.get(id, message_id).await?))
}

/// `POST /chats/{id}/reconcile` — recompute the room summary.
pub async fn reconcile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ChatRoom>> {
    let scope = UserScope::new(&state, user.0);
    Ok(Json(scope.messages.reconcile(id).await?))
}
