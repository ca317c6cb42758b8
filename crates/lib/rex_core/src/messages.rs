//! Message store scoped to the current identity.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ChatError, ChatResult, require_field};
use crate::identity::IdentityContext;
use crate::models::chat::{ChatRoom, Message};
use crate::store::ChatRepository;

/// Append and read messages of rooms owned by the signed-in user.
///
/// Appending also maintains the parent room's `most_recent_message` and
/// `total_messages` in the same write.
#[derive(Clone)]
pub struct MessageStore {
    repo: Arc<dyn ChatRepository>,
    identity: IdentityContext,
}

impl MessageStore {
    pub fn new(repo: Arc<dyn ChatRepository>, identity: IdentityContext) -> Self {
        Self { repo, identity }
    }

    /// Store a message from `sender_id` and update the room summary.
    pub async fn append(&self, room_id: Uuid, text: &str, sender_id: &str) -> ChatResult<Message> {
        let user_id = self.identity.user_id()?;
        require_field(text, "text")?;
        require_field(sender_id, "senderId")?;
        let message = self
            .repo
            .append_message(&user_id, room_id, sender_id, text)
            .await?;
        debug!(
            room_id = %room_id,
            message_id = %message.id,
            sender_id,
            seq = message.seq,
            "appended message"
        );
        Ok(message)
    }

    /// Messages ordered by timestamp, ties broken by store sequence.
    pub async fn list(&self, room_id: Uuid) -> ChatResult<Vec<Message>> {
        let user_id = self.identity.user_id()?;
        self.repo.list_messages(&user_id, room_id).await
    }

    pub async fn get(&self, room_id: Uuid, message_id: Uuid) -> ChatResult<Message> {
        let user_id = self.identity.user_id()?;
        self.repo
            .get_message(&user_id, room_id, message_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("Message {message_id}")))
    }

    /// Recompute the room summary from its stored messages.
    pub async fn reconcile(&self, room_id: Uuid) -> ChatResult<ChatRoom> {
        let user_id = self.identity.user_id()?;
        let room = self
            .repo
            .reconcile_room(&user_id, room_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("Chat room {room_id}")))?;
        info!(
            room_id = %room_id,
            total_messages = room.total_messages,
            "reconciled chat room summary"
        );
        Ok(room)
    }
}
