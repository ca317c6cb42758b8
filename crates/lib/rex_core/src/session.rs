//! Chat screen session.
//!
//! Holds the selected room and its in-memory thread. All state mutations go
//! through one `std::sync::Mutex` that is never held across an await. Sends
//! are serialized per session by an async lock so one exchange finishes
//! before the next starts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::completion::CompletionOrchestrator;
use crate::error::{ChatError, ChatResult};
use crate::identity::IdentityContext;
use crate::models::chat::{ChatRoom, Message, RoomPartition};
use crate::store::RoomDeletion;

/// One rendered row of the thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadEntry {
    /// Persisted message.
    Stored(Message),
    /// User text shown before the store confirms it.
    Optimistic { local_id: Uuid, text: String },
    /// Assistant typing indicator.
    Typing,
}

impl ThreadEntry {
    pub fn message(&self) -> Option<&Message> {
        match self {
            ThreadEntry::Stored(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    owner: Option<String>,
    selected: Option<Uuid>,
    thread: Vec<ThreadEntry>,
}

impl SessionState {
    fn clear(&mut self) {
        self.selected = None;
        self.thread.clear();
    }

    fn is_showing(&self, room_id: Uuid) -> bool {
        self.selected == Some(room_id)
    }
}

/// Removes the typing indicator when dropped, including on error and
/// cancellation.
struct TypingGuard {
    state: Arc<Mutex<SessionState>>,
}

impl TypingGuard {
    fn show(state: &Arc<Mutex<SessionState>>, room_id: Uuid) -> Self {
        let mut s = lock(state);
        if s.is_showing(room_id) {
            s.thread.push(ThreadEntry::Typing);
        }
        Self {
            state: state.clone(),
        }
    }
}

impl Drop for TypingGuard {
    fn drop(&mut self) {
        lock(&self.state)
            .thread
            .retain(|e| !matches!(e, ThreadEntry::Typing));
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives a single chat screen.
#[derive(Clone)]
pub struct SessionController {
    orchestrator: CompletionOrchestrator,
    identity: IdentityContext,
    state: Arc<Mutex<SessionState>>,
    send_lock: Arc<tokio::sync::Mutex<()>>,
}

impl SessionController {
    pub fn new(orchestrator: CompletionOrchestrator) -> Self {
        let identity = orchestrator.rooms().identity().clone();
        Self {
            orchestrator,
            identity,
            state: Arc::default(),
            send_lock: Arc::default(),
        }
    }

    /// Lock the state, resetting it first if the signed-in identity changed.
    fn state(&self) -> MutexGuard<'_, SessionState> {
        let current = self.identity.current().map(|i| i.id);
        let mut s = lock(&self.state);
        if s.owner != current {
            debug!("identity changed, resetting chat session");
            s.clear();
            s.owner = current;
        }
        s
    }

    pub fn selected_room(&self) -> Option<Uuid> {
        self.state().selected
    }

    /// Snapshot of the thread as currently rendered.
    pub fn thread(&self) -> Vec<ThreadEntry> {
        self.state().thread.clone()
    }

    /// Persisted messages of the thread, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.state()
            .thread
            .iter()
            .filter_map(ThreadEntry::message)
            .cloned()
            .collect()
    }

    pub async fn rooms(&self) -> ChatResult<RoomPartition> {
        self.orchestrator.rooms().partition().await
    }

    /// Show `room_id` and load its messages.
    pub async fn select_room(&self, room_id: Uuid) -> ChatResult<()> {
        self.orchestrator.rooms().get_room(room_id).await?;
        let messages = self.orchestrator.messages().list(room_id).await?;
        let mut s = self.state();
        s.selected = Some(room_id);
        s.thread = messages.into_iter().map(ThreadEntry::Stored).collect();
        Ok(())
    }

    /// Leave the current room; the next send starts a new one.
    pub fn new_thread(&self) {
        self.state().clear();
    }

    /// Send `text` and wait for the assistant's reply.
    ///
    /// With no room selected a room is created first, named after `text`.
    /// Returns the stored assistant message.
    pub async fn send(&self, text: &str) -> ChatResult<Message> {
        if text.trim().is_empty() {
            return Err(ChatError::Validation("Missing required field: text".into()));
        }
        let _sending = self.send_lock.lock().await;

        let room_id = match self.selected_room() {
            Some(id) => id,
            None => {
                let room = self.orchestrator.start_room(text).await?;
                let mut s = self.state();
                s.selected = Some(room.id);
                s.thread.clear();
                room.id
            }
        };

        let local_id = Uuid::new_v4();
        let prior = {
            let mut s = self.state();
            let prior: Vec<Message> = s
                .thread
                .iter()
                .filter_map(ThreadEntry::message)
                .cloned()
                .collect();
            if s.is_showing(room_id) {
                s.thread.push(ThreadEntry::Optimistic {
                    local_id,
                    text: text.to_string(),
                });
            }
            prior
        };

        let sent = self.orchestrator.send_user_message(room_id, text).await;
        {
            let mut s = self.state();
            let slot = s.thread.iter().position(
                |e| matches!(e, ThreadEntry::Optimistic { local_id: id, .. } if *id == local_id),
            );
            match (&sent, slot) {
                (Ok(message), Some(i)) => s.thread[i] = ThreadEntry::Stored(message.clone()),
                (Err(_), Some(i)) => {
                    s.thread.remove(i);
                }
                _ => {}
            }
        }
        sent?;

        let typing = TypingGuard::show(&self.state, room_id);
        let reply = self.orchestrator.complete_reply(room_id, &prior, text).await;
        drop(typing);

        let reply = reply?;
        let mut s = self.state();
        if s.is_showing(room_id) {
            s.thread.push(ThreadEntry::Stored(reply.clone()));
        }
        Ok(reply)
    }

    /// Change a room's status. Ending the shown room clears the screen.
    pub async fn set_room_active(&self, room_id: Uuid, is_active: bool) -> ChatResult<ChatRoom> {
        let room = self
            .orchestrator
            .rooms()
            .set_active(room_id, is_active)
            .await?;
        if !is_active {
            let mut s = self.state();
            if s.is_showing(room_id) {
                s.clear();
            }
        }
        Ok(room)
    }

    /// Delete a room. Deleting the shown room clears the screen.
    pub async fn delete_room(&self, room_id: Uuid) -> ChatResult<RoomDeletion> {
        let outcome = self.orchestrator.rooms().delete_room(room_id).await?;
        let mut s = self.state();
        if s.is_showing(room_id) {
            s.clear();
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::completion::{
        CompletionConfig, CompletionModel, CompletionRequest, FALLBACK_REPLY, ScriptedModel,
    };
    use crate::messages::MessageStore;
    use crate::models::auth::Identity;
    use crate::models::chat::ASSISTANT_SENDER_ID;
    use crate::rooms::ChatRoomStore;
    use crate::store::MemoryRepository;

    /// Holds every completion until a permit is released.
    struct GatedModel {
        gate: Semaphore,
    }

    #[async_trait]
    impl CompletionModel for GatedModel {
        async fn complete(&self, _request: &CompletionRequest) -> ChatResult<Vec<String>> {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| ChatError::Model(e.to_string()))?;
            permit.forget();
            Ok(vec!["gated reply".into()])
        }
    }

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.into(),
            email: format!("{id}@example.com"),
            display_name: None,
        }
    }

    fn controller(model: Arc<dyn CompletionModel>) -> (SessionController, IdentityContext) {
        let repo = Arc::new(MemoryRepository::new());
        let ctx = IdentityContext::signed_in(identity("u1"));
        let orch = CompletionOrchestrator::new(
            model,
            ChatRoomStore::new(repo.clone(), ctx.clone()),
            MessageStore::new(repo, ctx.clone()),
            CompletionConfig::default(),
        );
        (SessionController::new(orch), ctx)
    }

    fn has_typing(session: &SessionController) -> bool {
        session.thread().contains(&ThreadEntry::Typing)
    }

    #[tokio::test]
    async fn send_without_selection_starts_a_titled_room() {
        let model = ScriptedModel::new().reply("Career Growth").reply("Let's talk.");
        let (session, _) = controller(Arc::new(model));

        let reply = session.send("How do I get promoted?").await.unwrap();
        assert_eq!(reply.text, "Let's talk.");

        let room_id = session.selected_room().expect("room selected");
        let rooms = session.rooms().await.unwrap();
        assert_eq!(rooms.active.len(), 1);
        assert_eq!(rooms.active[0].id, room_id);
        assert_eq!(rooms.active[0].name, "Career Growth");
        assert_eq!(rooms.active[0].total_messages, 2);

        let senders: Vec<String> = session.messages().into_iter().map(|m| m.sender_id).collect();
        assert_eq!(senders, ["u1", ASSISTANT_SENDER_ID]);
    }

    #[tokio::test]
    async fn placeholder_is_gone_after_success_and_failure() {
        let model = ScriptedModel::new().reply("title").reply("ok").fail("boom");
        let (session, _) = controller(Arc::new(model));

        session.send("first").await.unwrap();
        assert!(!has_typing(&session));

        let reply = session.send("second").await.unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);
        assert!(!has_typing(&session));
        assert_eq!(session.messages().len(), 4);
        assert!(
            session
                .thread()
                .iter()
                .all(|e| matches!(e, ThreadEntry::Stored(_)))
        );
    }

    #[tokio::test]
    async fn placeholder_shows_while_awaiting_reply() {
        let model = Arc::new(GatedModel {
            gate: Semaphore::new(0),
        });
        let (session, _) = controller(model.clone());
        let room = session
            .orchestrator
            .rooms()
            .create_room("r")
            .await
            .unwrap();
        session.select_room(room.id).await.unwrap();

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.send("hello").await })
        };
        while !has_typing(&session) {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(matches!(session.thread()[0], ThreadEntry::Stored(_)));

        model.gate.add_permits(1);
        let reply = task.await.unwrap().unwrap();
        assert_eq!(reply.text, "gated reply");
        assert!(!has_typing(&session));
    }

    #[tokio::test]
    async fn cancelled_send_removes_placeholder() {
        let model = Arc::new(GatedModel {
            gate: Semaphore::new(0),
        });
        let (session, _) = controller(model);
        let room = session
            .orchestrator
            .rooms()
            .create_room("r")
            .await
            .unwrap();
        session.select_room(room.id).await.unwrap();

        let outcome = tokio::time::timeout(Duration::from_millis(50), session.send("hello")).await;
        assert!(outcome.is_err());
        assert!(!has_typing(&session));
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_side_effects() {
        let (session, _) = controller(Arc::new(ScriptedModel::new()));
        assert!(matches!(
            session.send("   ").await,
            Err(ChatError::Validation(_))
        ));
        assert!(session.selected_room().is_none());
        assert!(session.rooms().await.unwrap().active.is_empty());
    }

    #[tokio::test]
    async fn ending_selected_room_clears_selection() {
        let model = ScriptedModel::new().reply("title").reply("reply");
        let (session, _) = controller(Arc::new(model));
        session.send("hi").await.unwrap();
        let room_id = session.selected_room().unwrap();

        let room = session.set_room_active(room_id, false).await.unwrap();
        assert!(!room.is_active);
        assert!(session.selected_room().is_none());
        assert!(session.thread().is_empty());

        let rooms = session.rooms().await.unwrap();
        assert_eq!(rooms.ended.len(), 1);
    }

    #[tokio::test]
    async fn ending_another_room_keeps_selection() {
        let (session, _) = controller(Arc::new(ScriptedModel::new()));
        let rooms = session.orchestrator.rooms();
        let shown = rooms.create_room("shown").await.unwrap();
        let other = rooms.create_room("other").await.unwrap();
        session.select_room(shown.id).await.unwrap();
        session.set_room_active(other.id, false).await.unwrap();
        assert_eq!(session.selected_room(), Some(shown.id));
    }

    #[tokio::test]
    async fn deleting_selected_room_clears_selection() {
        let model = ScriptedModel::new().reply("title").reply("reply");
        let (session, _) = controller(Arc::new(model));
        session.send("hi").await.unwrap();
        let room_id = session.selected_room().unwrap();
        let outcome = session.delete_room(room_id).await.unwrap();
        assert_eq!(outcome.messages_deleted, 2);
        assert!(session.selected_room().is_none());
    }

    #[tokio::test]
    async fn identity_change_resets_session() {
        let model = ScriptedModel::new().reply("title").reply("reply");
        let (session, ctx) = controller(Arc::new(model));
        session.send("hi").await.unwrap();
        assert!(session.selected_room().is_some());

        ctx.publish(Some(identity("u2")));
        assert!(session.selected_room().is_none());
        assert!(session.thread().is_empty());
    }

    #[tokio::test]
    async fn overlapping_sends_are_serialized() {
        let model = ScriptedModel::new().reply("r1").reply("r2");
        let (session, _) = controller(Arc::new(model));
        let room = session
            .orchestrator
            .rooms()
            .create_room("r")
            .await
            .unwrap();
        session.select_room(room.id).await.unwrap();

        let (a, b) = tokio::join!(session.send("one"), session.send("two"));
        a.unwrap();
        b.unwrap();

        let texts: Vec<String> = session
            .orchestrator
            .messages()
            .list(room.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["one", "r1", "two", "r2"]);
    }

    #[tokio::test]
    async fn select_unknown_room_is_not_found() {
        let (session, _) = controller(Arc::new(ScriptedModel::new()));
        assert!(matches!(
            session.select_room(Uuid::now_v7()).await,
            Err(ChatError::NotFound(_))
        ));
    }
}
