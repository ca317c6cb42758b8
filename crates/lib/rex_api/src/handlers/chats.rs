//! Chat room handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use rex_core::models::chat::ChatRoom;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ChatRoomsResponse, CreateChatRequest, CreateChatResponse, DeleteChatResponse, STATUS_SUCCESS,
    UpdateChatRequest,
};
use crate::services::scope::UserScope;

/// `GET /chats` — the caller's rooms, newest first.
pub async fn list_chats_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<ChatRoomsResponse>> {
    let scope = UserScope::new(&state, user.0);
    let chat_rooms = scope.rooms.list_rooms().await?;
    Ok(Json(ChatRoomsResponse { chat_rooms }))
}

/// `POST /chats` — create a room.
pub async fn create_chat_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    AppJson(body): AppJson<CreateChatRequest>,
) -> AppResult<(StatusCode, Json<CreateChatResponse>)> {
    let scope = UserScope::new(&state, user.0);
    let room = scope.rooms.create_room(&body.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateChatResponse {
            status: STATUS_SUCCESS.into(),
            chat_id: room.id,
        }),
    ))
}

/// `GET /chats/{id}`
pub async fn get_chat_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ChatRoom>> {
    let scope = UserScope::new(&state, user.0);
    Ok(Json(scope.rooms.get_room(id).await?))
}

/// `PATCH /chats/{id}` — mark a room active or ended.
pub async fn update_chat_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<UpdateChatRequest>,
) -> AppResult<Json<ChatRoom>> {
    let scope = UserScope::new(&state, user.0);
    Ok(Json(scope.rooms.set_active(id, body.is_active).await?))
}

/// `DELETE /chats/{id}` — delete a room and its messages.
pub async fn delete_chat_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteChatResponse>> {
    let scope = UserScope::new(&state, user.0);
    let outcome = scope.rooms.delete_room(id).await?;
    Ok(Json(DeleteChatResponse {
        status: STATUS_SUCCESS.into(),
        messages_deleted: outcome.messages_deleted,
        room_deleted: outcome.room_deleted,
    }))
}
