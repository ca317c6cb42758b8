//! In-process repository.
//!
//! Backs tests and database-less local runs. Each operation takes a single
//! write lock, so message insert and summary update are one unit unless
//! summary faults are injected with [`MemoryRepository::inject_summary_faults`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ChatRepository, EventLogRepository, RoomDeletion, UserRepository};
use crate::auth::AuthError;
use crate::error::{ChatError, ChatResult};
use crate::models::auth::{Identity, IdentityWithPassword};
use crate::models::chat::{ChatRoom, Message, sort_messages};
use crate::models::log::EventLog;
use crate::uuid::uuidv7;

#[derive(Debug, Clone)]
struct StoredUser {
    identity: Identity,
    password_hash: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredToken {
    id: String,
    token_hash: String,
    user_id: String,
    expires_at: DateTime<Utc>,
    /// Revocation time for refresh tokens, use time for reset tokens.
    closed_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.closed_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Default)]
struct State {
    rooms: HashMap<Uuid, ChatRoom>,
    messages: HashMap<Uuid, Vec<Message>>,
    users: HashMap<String, StoredUser>,
    refresh_tokens: Vec<StoredToken>,
    reset_tokens: Vec<StoredToken>,
    logs: HashMap<Uuid, EventLog>,
    next_seq: i64,
}

impl State {
    fn owned_room(&self, user_id: &str, room_id: Uuid) -> Option<&ChatRoom> {
        self.rooms.get(&room_id).filter(|r| r.user_id == user_id)
    }
}

/// Repository holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
    summary_faults: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// While enabled, `append_message` inserts the message and then fails
    /// before updating the room summary, leaving the counters stale.
    pub fn inject_summary_faults(&self, enabled: bool) {
        self.summary_faults.store(enabled, Ordering::SeqCst);
    }

    /// Number of stored messages for a room, regardless of owner.
    pub async fn message_count(&self, room_id: Uuid) -> usize {
        self.state
            .read()
            .await
            .messages
            .get(&room_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl ChatRepository for MemoryRepository {
    async fn create_room(&self, user_id: &str, name: &str) -> ChatResult<ChatRoom> {
        let room = ChatRoom {
            id: uuidv7(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
            is_active: true,
            most_recent_message: None,
            total_messages: 0,
        };
        self.state.write().await.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn list_rooms(&self, user_id: &str) -> ChatResult<Vec<ChatRoom>> {
        let state = self.state.read().await;
        let mut rooms: Vec<ChatRoom> = state
            .rooms
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rooms)
    }

    async fn get_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<Option<ChatRoom>> {
        Ok(self.state.read().await.owned_room(user_id, room_id).cloned())
    }

    async fn set_room_active(
        &self,
        user_id: &str,
        room_id: Uuid,
        is_active: bool,
    ) -> ChatResult<Option<ChatRoom>> {
        let mut state = self.state.write().await;
        let room = state
            .rooms
            .get_mut(&room_id)
            .filter(|r| r.user_id == user_id)
            .map(|r| {
                r.is_active = is_active;
                r.clone()
            });
        Ok(room)
    }

    async fn delete_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<RoomDeletion> {
        let mut state = self.state.write().await;
        if state.owned_room(user_id, room_id).is_none() {
            return Ok(RoomDeletion {
                messages_deleted: 0,
                room_deleted: false,
            });
        }
        let messages_deleted = state
            .messages
            .remove(&room_id)
            .map_or(0, |m| m.len() as u64);
        let room_deleted = state.rooms.remove(&room_id).is_some();
        Ok(RoomDeletion {
            messages_deleted,
            room_deleted,
        })
    }

    async fn append_message(
        &self,
        user_id: &str,
        room_id: Uuid,
        sender_id: &str,
        text: &str,
    ) -> ChatResult<Message> {
        let mut state = self.state.write().await;
        if state.owned_room(user_id, room_id).is_none() {
            return Err(ChatError::NotFound(format!("Chat room {room_id}")));
        }

        state.next_seq += 1;
        let message = Message {
            id: uuidv7(),
            chat_room_id: room_id,
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            seq: state.next_seq,
        };
        state
            .messages
            .entry(room_id)
            .or_default()
            .push(message.clone());

        if self.summary_faults.load(Ordering::SeqCst) {
            return Err(ChatError::Store(
                "injected failure while updating room summary".into(),
            ));
        }

        if let Some(room) = state.rooms.get_mut(&room_id) {
            room.most_recent_message = Some(text.to_string());
            room.total_messages += 1;
        }
        Ok(message)
    }

    async fn list_messages(&self, user_id: &str, room_id: Uuid) -> ChatResult<Vec<Message>> {
        let state = self.state.read().await;
        if state.owned_room(user_id, room_id).is_none() {
            return Ok(Vec::new());
        }
        let mut messages = state.messages.get(&room_id).cloned().unwrap_or_default();
        sort_messages(&mut messages);
        Ok(messages)
    }

    async fn get_message(
        &self,
        user_id: &str,
        room_id: Uuid,
        message_id: Uuid,
    ) -> ChatResult<Option<Message>> {
        let state = self.state.read().await;
        if state.owned_room(user_id, room_id).is_none() {
            return Ok(None);
        }
        Ok(state
            .messages
            .get(&room_id)
            .and_then(|m| m.iter().find(|m| m.id == message_id))
            .cloned())
    }

    async fn reconcile_room(&self, user_id: &str, room_id: Uuid) -> ChatResult<Option<ChatRoom>> {
        let mut state = self.state.write().await;
        if state.owned_room(user_id, room_id).is_none() {
            return Ok(None);
        }
        let mut messages = state.messages.get(&room_id).cloned().unwrap_or_default();
        sort_messages(&mut messages);
        let latest = messages.last().map(|m| m.text.clone());
        let total = messages.len() as i64;
        Ok(state.rooms.get_mut(&room_id).map(|room| {
            room.total_messages = total;
            room.most_recent_message = latest;
            room.clone()
        }))
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<IdentityWithPassword>, AuthError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.identity.email == email)
            .map(|u| IdentityWithPassword {
                identity: u.identity.clone(),
                password_hash: u.password_hash.clone(),
            }))
    }

    async fn create_user(
        &self,
        email: &str,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<Identity, AuthError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.identity.email == email) {
            return Err(AuthError::ValidationError("Email already registered".into()));
        }
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: name.map(str::to_string),
        };
        state.users.insert(
            identity.id.clone(),
            StoredUser {
                identity: identity.clone(),
                password_hash: Some(password_hash.to_string()),
            },
        );
        Ok(identity)
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<Identity>, AuthError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .get(user_id)
            .map(|u| u.identity.clone()))
    }

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<(), AuthError> {
        if let Some(user) = self.state.write().await.users.get_mut(user_id) {
            user.password_hash = Some(password_hash.to_string());
        }
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.state.write().await.refresh_tokens.push(StoredToken {
            id: uuidv7().to_string(),
            token_hash: token_hash.to_string(),
            user_id: user_id.to_string(),
            expires_at,
            closed_at: None,
        });
        Ok(())
    }

    async fn find_valid_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<(String, String)>, AuthError> {
        let now = Utc::now();
        Ok(self
            .state
            .read()
            .await
            .refresh_tokens
            .iter()
            .find(|t| t.token_hash == token_hash && t.is_live(now))
            .map(|t| (t.id.clone(), t.user_id.clone())))
    }

    async fn revoke_refresh_token(&self, token_id: &str) -> Result<(), AuthError> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        for token in state.refresh_tokens.iter_mut().filter(|t| t.id == token_id) {
            token.closed_at = Some(now);
        }
        Ok(())
    }

    async fn revoke_refresh_token_by_hash(&self, token_hash: &str) -> Result<(), AuthError> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        for token in state
            .refresh_tokens
            .iter_mut()
            .filter(|t| t.token_hash == token_hash && t.closed_at.is_none())
        {
            token.closed_at = Some(now);
        }
        Ok(())
    }

    async fn revoke_all_refresh_tokens(&self, user_id: &str) -> Result<(), AuthError> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        for token in state
            .refresh_tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.closed_at.is_none())
        {
            token.closed_at = Some(now);
        }
        Ok(())
    }

    async fn store_reset_token(
        &self,
        token_hash: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.state.write().await.reset_tokens.push(StoredToken {
            id: uuidv7().to_string(),
            token_hash: token_hash.to_string(),
            user_id: user_id.to_string(),
            expires_at,
            closed_at: None,
        });
        Ok(())
    }

    async fn consume_reset_token(&self, token_hash: &str) -> Result<Option<String>, AuthError> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        Ok(state
            .reset_tokens
            .iter_mut()
            .find(|t| t.token_hash == token_hash && t.is_live(now))
            .map(|t| {
                t.closed_at = Some(now);
                t.user_id.clone()
            }))
    }
}

#[async_trait]
impl EventLogRepository for MemoryRepository {
    async fn post_log(&self, description: &str) -> ChatResult<EventLog> {
        let log = EventLog {
            id: uuidv7(),
            event_description: description.to_string(),
            timestamp: Utc::now(),
        };
        self.state.write().await.logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn get_log(&self, log_id: Uuid) -> ChatResult<Option<EventLog>> {
        Ok(self.state.read().await.logs.get(&log_id).cloned())
    }

    async fn update_log(&self, log_id: Uuid, description: &str) -> ChatResult<Option<EventLog>> {
        let mut state = self.state.write().await;
        Ok(state.logs.get_mut(&log_id).map(|log| {
            log.event_description = description.to_string();
            log.timestamp = Utc::now();
            log.clone()
        }))
    }

    async fn delete_log(&self, log_id: Uuid) -> ChatResult<bool> {
        Ok(self.state.write().await.logs.remove(&log_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rooms_are_scoped_to_their_owner() {
        let repo = MemoryRepository::new();
        let room = repo.create_room("u1", "mine").await.unwrap();
        assert!(repo.get_room("u2", room.id).await.unwrap().is_none());
        assert!(repo.list_rooms("u2").await.unwrap().is_empty());
        assert!(matches!(
            repo.append_message("u2", room.id, "u2", "hi").await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn seq_is_strictly_increasing_across_rooms() {
        let repo = MemoryRepository::new();
        let a = repo.create_room("u1", "a").await.unwrap();
        let b = repo.create_room("u1", "b").await.unwrap();
        let m1 = repo.append_message("u1", a.id, "u1", "1").await.unwrap();
        let m2 = repo.append_message("u1", b.id, "u1", "2").await.unwrap();
        let m3 = repo.append_message("u1", a.id, "u1", "3").await.unwrap();
        assert!(m1.seq < m2.seq && m2.seq < m3.seq);
    }

    #[tokio::test]
    async fn injected_fault_leaves_summary_stale() {
        let repo = MemoryRepository::new();
        let room = repo.create_room("u1", "r").await.unwrap();
        repo.inject_summary_faults(true);
        assert!(repo.append_message("u1", room.id, "u1", "hi").await.is_err());
        assert_eq!(repo.message_count(room.id).await, 1);
        let stale = repo.get_room("u1", room.id).await.unwrap().unwrap();
        assert_eq!(stale.total_messages, 0);
    }

    #[tokio::test]
    async fn reset_tokens_are_single_use() {
        let repo = MemoryRepository::new();
        let user = repo.create_user("a@b.c", None, "hash").await.unwrap();
        let expires = Utc::now() + chrono::Duration::minutes(5);
        repo.store_reset_token("h", &user.id, expires).await.unwrap();
        assert_eq!(repo.consume_reset_token("h").await.unwrap(), Some(user.id));
        assert_eq!(repo.consume_reset_token("h").await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = MemoryRepository::new();
        repo.create_user("a@b.c", None, "hash").await.unwrap();
        assert!(matches!(
            repo.create_user("a@b.c", None, "hash").await,
            Err(AuthError::ValidationError(_))
        ));
    }
}
