//! Persistence seams.
//!
//! Repositories take the owning user id explicitly on every call. Callers in
//! the chat core go through the identity-scoped stores
//! ([`crate::rooms::ChatRoomStore`], [`crate::messages::MessageStore`]) rather
//! than calling these traits directly.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::error::ChatResult;
use crate::models::auth::{Identity, IdentityWithPassword};
use crate::models::chat::{ChatRoom, Message};
use crate::models::log::EventLog;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// Outcome of a cascading room delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomDeletion {
    pub messages_deleted: u64,
    pub room_deleted: bool,
}

/// Chat rooms and their messages.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn create_room(&self, user_id: &str, name: &str) -> ChatResult<ChatRoom>;

    async fn list_rooms(&self, user_id: &str) -> ChatResult<Vec<ChatRoom>>;

    async fn get_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<Option<ChatRoom>>;

    /// Flip `is_active`. Returns `None` when the room does not exist.
    async fn set_room_active(
        &self,
        user_id: &str,
        room_id: Uuid,
        is_active: bool,
    ) -> ChatResult<Option<ChatRoom>>;

    /// Delete every message of the room, then the room itself.
    async fn delete_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<RoomDeletion>;

    /// Insert a message and update the room summary as one unit.
    ///
    /// Fails with `NotFound` when the room does not exist.
    async fn append_message(
        &self,
        user_id: &str,
        room_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> ChatResult<Message>;

    /// Messages of a room in rendering order. Unknown rooms yield no messages.
    async fn list_messages(&self, user_id: &str, room_id: Uuid) -> ChatResult<Vec<Message>>;

    async fn get_message(
        &self,
        user_id: &str,
        room_id: Uuid,
        message_id: Uuid,
    ) -> ChatResult<Option<Message>>;

    /// Recompute `total_messages` and `most_recent_message` from stored messages.
    async fn reconcile_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<Option<ChatRoom>>;
}

/// Accounts and their tokens.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<IdentityWithPassword>, AuthError>;

    async fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<Identity, AuthError>;

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<Identity>, AuthError>;

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<(), AuthError>;

    async fn store_refresh_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Find a valid, non-revoked, non-expired refresh token. Returns (token_id, user_id).
    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<(String, String)>, AuthError>;

    async fn revoke_refresh_token(&self, token_id: &str) -> Result<(), AuthError>;

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<(), AuthError>;

    async fn revoke_all_refresh_tokens(&self, user_id: &str) -> Result<(), AuthError>;

    async fn store_reset_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Mark an unexpired, unused reset token as used. Returns its user id.
    async fn consume_reset_token(&self, token_hash: &str) -> Result<Option<String>, AuthError>;
}

/// Global diagnostic event log.
#[async_trait]
pub trait EventLogRepository: Send + Sync {
    async fn post_log(&self, description: &str) -> ChatResult<EventLog>;

    async fn get_log(&self, log_id: Uuid) -> ChatResult<Option<EventLog>>;

    /// Replace the description and refresh the timestamp.
    async fn update_log(&self, log_id: Uuid, description: &str) -> ChatResult<Option<EventLog>>;

    async fn delete_log(&self, log_id: Uuid) -> ChatResult<bool>;
}
