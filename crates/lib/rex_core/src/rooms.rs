//! Chat room store scoped to the current identity.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ChatError, ChatResult, require_field};
use crate::identity::IdentityContext;
use crate::models::chat::{ChatRoom, RoomPartition};
use crate::store::{ChatRepository, RoomDeletion};

/// Create, list, update and delete rooms owned by the signed-in user.
#[derive(Clone)]
pub struct ChatRoomStore {
    repo: Arc<dyn ChatRepository>,
    identity: IdentityContext,
}

impl ChatRoomStore {
    pub fn new(repo: Arc<dyn ChatRepository>, identity: IdentityContext) -> Self {
        Self { repo, identity }
    }

    pub fn identity(&self) -> &IdentityContext {
        &self.identity
    }

    /// New active room with no messages.
    pub async fn create_room(&self, name: &str) -> ChatResult<ChatRoom> {
        let user_id = self.identity.user_id()?;
        require_field(name, "name")?;
        let room = self.repo.create_room(&user_id, name).await?;
        info!(room_id = %room.id, user_id = %user_id, "created chat room");
        Ok(room)
    }

    pub async fn list_rooms(&self) -> ChatResult<Vec<ChatRoom>> {
        let user_id = self.identity.user_id()?;
        self.repo.list_rooms(&user_id).await
    }

    /// Rooms split into active and ended.
    pub async fn partition(&self) -> ChatResult<RoomPartition> {
        Ok(RoomPartition::from_rooms(self.list_rooms().await?))
    }

    pub async fn get_room(&self, room_id: Uuid) -> ChatResult<ChatRoom> {
        let user_id = self.identity.user_id()?;
        self.repo
            .get_room(&user_id, room_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("Chat room {room_id}")))
    }

    /// Flip the active/ended status. Nothing else on the room changes.
    pub async fn set_active(&self, room_id: Uuid, is_active: bool) -> ChatResult<ChatRoom> {
        let user_id = self.identity.user_id()?;
        let room = self
            .repo
            .set_room_active(&user_id, room_id, is_active)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("Chat room {room_id}")))?;
        debug!(room_id = %room_id, is_active, "updated chat room status");
        Ok(room)
    }

    /// Delete the room and all of its messages. Missing rooms are a no-op.
    pub async fn delete_room(&self, room_id: Uuid) -> ChatResult<RoomDeletion> {
        let user_id = self.identity.user_id()?;
        let outcome = self.repo.delete_room(&user_id, room_id).await?;
        if outcome.room_deleted {
            info!(
                room_id = %room_id,
                messages_deleted = outcome.messages_deleted,
                "deleted chat room"
            );
        } else {
            info!(room_id = %room_id, "delete requested for missing chat room");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Identity;
    use crate::store::MemoryRepository;

    fn store_for(user: &str) -> (ChatRoomStore, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let identity = IdentityContext::signed_in(Identity {
            id: user.into(),
            email: format!("{user}@example.com"),
            display_name: None,
        });
        (ChatRoomStore::new(repo.clone(), identity), repo)
    }

    #[tokio::test]
    async fn new_room_starts_active_and_empty() {
        let (store, _) = store_for("u1");
        let room = store.create_room("Career advice").await.unwrap();
        assert!(room.is_active);
        assert_eq!(room.total_messages, 0);
        assert!(room.most_recent_message.is_none());
        assert_eq!(room.user_id, "u1");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (store, _) = store_for("u1");
        assert!(matches!(
            store.create_room("   ").await,
            Err(ChatError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn signed_out_calls_fail_validation() {
        let store = ChatRoomStore::new(Arc::new(MemoryRepository::new()), IdentityContext::new());
        assert!(matches!(
            store.list_rooms().await,
            Err(ChatError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn set_active_on_missing_room_is_not_found() {
        let (store, _) = store_for("u1");
        assert!(matches!(
            store.set_active(Uuid::now_v7(), false).await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn partition_splits_by_status() {
        let (store, _) = store_for("u1");
        let a = store.create_room("a").await.unwrap();
        let b = store.create_room("b").await.unwrap();
        store.set_active(b.id, false).await.unwrap();
        let parts = store.partition().await.unwrap();
        assert_eq!(parts.active.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id]);
        assert_eq!(parts.ended.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b.id]);
    }

    #[tokio::test]
    async fn delete_cascades_for_various_sizes() {
        for n in [0usize, 1, 50] {
            let (store, repo) = store_for("u1");
            let room = store.create_room("doomed").await.unwrap();
            for i in 0..n {
                repo.append_message("u1", room.id, "u1", &format!("m{i}"))
                    .await
                    .unwrap();
            }
            let outcome = store.delete_room(room.id).await.unwrap();
            assert!(outcome.room_deleted);
            assert_eq!(outcome.messages_deleted, n as u64);
            assert_eq!(repo.message_count(room.id).await, 0);
            assert!(matches!(
                store.get_room(room.id).await,
                Err(ChatError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn deleting_missing_room_is_idempotent() {
        let (store, _) = store_for("u1");
        let outcome = store.delete_room(Uuid::now_v7()).await.unwrap();
        assert!(!outcome.room_deleted);
    }
}
