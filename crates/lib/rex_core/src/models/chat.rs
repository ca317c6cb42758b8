//! Chat room and message models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender id reserved for assistant-authored messages.
///
/// Distinct from any user identity: user ids are UUIDs.
pub const ASSISTANT_SENDER_ID: &str = "Rex";

/// A named chat session owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub most_recent_message: Option<String>,
    pub total_messages: i64,
}

/// One turn in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Store-assigned, strictly increasing; breaks timestamp ties.
    pub seq: i64,
}

impl Message {
    /// Whether the assistant authored this message.
    pub fn is_from_assistant(&self) -> bool {
        self.sender_id == ASSISTANT_SENDER_ID
    }
}

/// Rendering order: timestamp first, store sequence second.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.seq.cmp(&b.seq)));
}

/// Rooms split by status, as shown in the inbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPartition {
    pub active: Vec<ChatRoom>,
    pub ended: Vec<ChatRoom>,
}

impl RoomPartition {
    pub fn from_rooms(rooms: Vec<ChatRoom>) -> Self {
        let (active, ended) = rooms.into_iter().partition(|r| r.is_active);
        Self { active, ended }
    }
}
