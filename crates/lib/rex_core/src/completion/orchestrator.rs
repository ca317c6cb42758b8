//! Prompt building, model invocation and reply persistence.
//!
//! A reply exchange moves `Idle -> Sending -> AwaitingReply` and ends in
//! `Resolved` or `Failed`. Model failures never escape [`complete_reply`]:
//! the fallback text is persisted in place of the reply. Store failures do.
//!
//! [`complete_reply`]: CompletionOrchestrator::complete_reply

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ChatTurn, CompletionConfig, CompletionModel, CompletionRequest, Role};
use crate::error::{ChatError, ChatResult};
use crate::messages::MessageStore;
use crate::models::chat::{ASSISTANT_SENDER_ID, ChatRoom, Message};
use crate::rooms::ChatRoomStore;

/// Longest fallback title, in characters.
pub const FALLBACK_TITLE_LEN: usize = 60;

/// Room name used when the first message has no usable text at all.
const UNTITLED_ROOM: &str = "New chat";

/// Progress of the most recent exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    Sending,
    AwaitingReply,
    Resolved,
    Failed,
}

#[derive(Clone)]
pub struct CompletionOrchestrator {
    model: Arc<dyn CompletionModel>,
    rooms: ChatRoomStore,
    messages: MessageStore,
    config: CompletionConfig,
    state: Arc<watch::Sender<ExchangeState>>,
}

impl CompletionOrchestrator {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        rooms: ChatRoomStore,
        messages: MessageStore,
        config: CompletionConfig,
    ) -> Self {
        let (state, _rx) = watch::channel(ExchangeState::Idle);
        Self {
            model,
            rooms,
            messages,
            config,
            state: Arc::new(state),
        }
    }

    pub fn rooms(&self) -> &ChatRoomStore {
        &self.rooms
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn state(&self) -> ExchangeState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ExchangeState> {
        self.state.subscribe()
    }

    fn transition(&self, next: ExchangeState) {
        self.state.send_replace(next);
    }

    /// System instruction, then prior turns, then the new user turn.
    pub fn build_prompt(&self, prior: &[Message], new_text: &str) -> Vec<ChatTurn> {
        let mut turns = Vec::with_capacity(prior.len() + 2);
        turns.push(ChatTurn::new(Role::System, self.config.system_instruction.as_str()));
        turns.extend(prior.iter().map(|m| {
            let role = if m.is_from_assistant() {
                Role::Assistant
            } else {
                Role::User
            };
            ChatTurn::new(role, m.text.as_str())
        }));
        turns.push(ChatTurn::new(Role::User, new_text));
        turns
    }

    /// Ask the model to name a room after its first message.
    pub async fn new_chat_title(&self, first_message: &str) -> ChatResult<String> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatTurn::new(Role::System, self.config.title_instruction.as_str()),
                ChatTurn::new(Role::User, first_message),
            ],
        };
        let title = self
            .model
            .complete(&request)
            .await?
            .into_iter()
            .next()
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if title.is_empty() {
            return Err(ChatError::Model("model returned an empty title".into()));
        }
        Ok(title)
    }

    /// Model title, or the first message cut to [`FALLBACK_TITLE_LEN`].
    pub async fn title_or_fallback(&self, first_message: &str) -> String {
        match self.new_chat_title(first_message).await {
            Ok(title) => title,
            Err(e) => {
                warn!("title generation failed, using message text: {e}");
                fallback_title(first_message)
            }
        }
    }

    /// Create a room named after `first_message`.
    pub async fn start_room(&self, first_message: &str) -> ChatResult<ChatRoom> {
        let name = self.title_or_fallback(first_message).await;
        self.rooms.create_room(&name).await
    }

    /// Persist the signed-in user's message.
    pub async fn send_user_message(&self, room_id: Uuid, text: &str) -> ChatResult<Message> {
        self.transition(ExchangeState::Sending);
        let result = match self.rooms.identity().user_id() {
            Ok(user_id) => self.messages.append(room_id, text, &user_id).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.transition(ExchangeState::Failed);
        }
        result
    }

    /// Generate and persist the assistant's answer to `new_text`.
    ///
    /// `prior` is the room history before `new_text`. Always yields a stored
    /// assistant message unless the store itself fails.
    pub async fn complete_reply(
        &self,
        room_id: Uuid,
        prior: &[Message],
        new_text: &str,
    ) -> ChatResult<Message> {
        self.transition(ExchangeState::AwaitingReply);
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: self.build_prompt(prior, new_text),
        };

        let reply = match self.model.complete(&request).await {
            Ok(candidates) => candidates
                .into_iter()
                .next()
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| ChatError::Model("model returned no usable choice".into())),
            Err(e) => Err(e),
        };

        let (text, outcome) = match reply {
            Ok(text) => (text, ExchangeState::Resolved),
            Err(e) => {
                warn!(room_id = %room_id, "completion failed, storing fallback reply: {e}");
                (self.config.fallback_reply.clone(), ExchangeState::Failed)
            }
        };

        match self.messages.append(room_id, &text, ASSISTANT_SENDER_ID).await {
            Ok(message) => {
                debug!(room_id = %room_id, message_id = %message.id, "stored assistant reply");
                self.transition(outcome);
                Ok(message)
            }
            Err(e) => {
                self.transition(ExchangeState::Failed);
                Err(e)
            }
        }
    }

    /// Full server-side exchange: store the user message, then the reply.
    pub async fn exchange(&self, room_id: Uuid, text: &str) -> ChatResult<(Message, Message)> {
        let prior = self.messages.list(room_id).await?;
        let sent = self.send_user_message(room_id, text).await?;
        let reply = self.complete_reply(room_id, &prior, text).await?;
        Ok((sent, reply))
    }
}

/// Trimmed message text, at most [`FALLBACK_TITLE_LEN`] characters.
pub fn fallback_title(first_message: &str) -> String {
    let title: String = first_message
        .trim()
        .chars()
        .take(FALLBACK_TITLE_LEN)
        .collect();
    let title = title.trim_end();
    if title.is_empty() {
        UNTITLED_ROOM.to_string()
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedModel;
    use crate::identity::IdentityContext;
    use crate::models::auth::Identity;
    use crate::store::MemoryRepository;

    fn orchestrator(model: ScriptedModel) -> (CompletionOrchestrator, Arc<ScriptedModel>) {
        let repo = Arc::new(MemoryRepository::new());
        let identity = IdentityContext::signed_in(Identity {
            id: "u1".into(),
            email: "u1@example.com".into(),
            display_name: None,
        });
        let model = Arc::new(model);
        let orch = CompletionOrchestrator::new(
            model.clone(),
            ChatRoomStore::new(repo.clone(), identity.clone()),
            MessageStore::new(repo, identity),
            CompletionConfig::default(),
        );
        (orch, model)
    }

    fn stored(sender: &str, text: &str, seq: i64) -> Message {
        Message {
            id: Uuid::now_v7(),
            chat_room_id: Uuid::nil(),
            sender_id: sender.into(),
            text: text.into(),
            timestamp: chrono::Utc::now(),
            seq,
        }
    }

    #[test]
    fn prompt_maps_roles_and_prepends_instruction() {
        let (orch, _) = orchestrator(ScriptedModel::new());
        let prior = [stored("u1", "Hi", 1), stored(ASSISTANT_SENDER_ID, "Hello", 2)];
        let turns = orch.build_prompt(&prior, "Help me");
        let roles: Vec<Role> = turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(turns[0].content, crate::completion::MENTOR_INSTRUCTION);
        assert_eq!(turns[3].content, "Help me");
    }

    #[tokio::test]
    async fn career_advice_scenario() {
        let (orch, model) =
            orchestrator(ScriptedModel::new().reply("Hello! How can I help your career today?"));
        let room = orch.rooms().create_room("Career advice").await.unwrap();
        assert!(room.is_active);
        assert_eq!(room.total_messages, 0);

        let hi = orch.messages().append(room.id, "Hi", "u1").await.unwrap();
        let room_after = orch.rooms().get_room(room.id).await.unwrap();
        assert_eq!(room_after.total_messages, 1);
        assert_eq!(room_after.most_recent_message.as_deref(), Some("Hi"));

        let reply = orch
            .complete_reply(room.id, std::slice::from_ref(&hi), "Hi")
            .await
            .unwrap();
        assert_eq!(reply.sender_id, ASSISTANT_SENDER_ID);
        assert_eq!(reply.text, "Hello! How can I help your career today?");
        assert_eq!(orch.state(), ExchangeState::Resolved);

        let room_final = orch.rooms().get_room(room.id).await.unwrap();
        assert_eq!(room_final.total_messages, 2);

        let request = &model.requests()[0];
        assert_eq!(request.model, "gpt-3.5-turbo");
        assert_eq!(request.messages.len(), 3);
    }

    #[tokio::test]
    async fn model_failure_stores_fallback_reply() {
        let (orch, _) = orchestrator(ScriptedModel::new().fail("upstream 500"));
        let room = orch.rooms().create_room("r").await.unwrap();
        let reply = orch.complete_reply(room.id, &[], "Hi").await.unwrap();
        assert_eq!(reply.text, crate::completion::FALLBACK_REPLY);
        assert_eq!(reply.sender_id, ASSISTANT_SENDER_ID);
        assert_eq!(orch.state(), ExchangeState::Failed);
    }

    #[tokio::test]
    async fn blank_candidate_counts_as_failure() {
        let (orch, _) = orchestrator(ScriptedModel::new().reply("   "));
        let room = orch.rooms().create_room("r").await.unwrap();
        let reply = orch.complete_reply(room.id, &[], "Hi").await.unwrap();
        assert_eq!(reply.text, crate::completion::FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn store_failure_escapes() {
        let (orch, _) = orchestrator(ScriptedModel::new().reply("ok"));
        assert!(matches!(
            orch.complete_reply(Uuid::now_v7(), &[], "Hi").await,
            Err(ChatError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn title_is_trimmed_and_falls_back() {
        let (orch, _) = orchestrator(ScriptedModel::new().reply("  Career Growth  \n").fail("down"));
        assert_eq!(orch.new_chat_title("How do I grow?").await.unwrap(), "Career Growth");

        let long = "x".repeat(100);
        assert_eq!(orch.title_or_fallback(&long).await, "x".repeat(FALLBACK_TITLE_LEN));
    }

    #[tokio::test]
    async fn empty_title_is_a_model_error() {
        let (orch, _) = orchestrator(ScriptedModel::new().reply(""));
        assert!(matches!(
            orch.new_chat_title("Hi").await,
            Err(ChatError::Model(_))
        ));
    }

    #[tokio::test]
    async fn exchange_stores_both_sides() {
        let (orch, model) = orchestrator(ScriptedModel::new().reply("first").reply("second"));
        let room = orch.rooms().create_room("r").await.unwrap();
        orch.exchange(room.id, "one").await.unwrap();
        let (sent, reply) = orch.exchange(room.id, "two").await.unwrap();
        assert_eq!(sent.sender_id, "u1");
        assert_eq!(reply.text, "second");

        let second_prompt = &model.requests()[1].messages;
        let contents: Vec<&str> = second_prompt.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents[1..],
            ["one", "first", "two"]
        );
        assert_eq!(orch.messages().list(room.id).await.unwrap().len(), 4);
    }

    #[test]
    fn fallback_title_handles_edges() {
        assert_eq!(fallback_title("  hello  "), "hello");
        assert_eq!(fallback_title("   "), UNTITLED_ROOM);
        assert_eq!(fallback_title(&"é".repeat(80)).chars().count(), FALLBACK_TITLE_LEN);
    }

    #[tokio::test]
    async fn signed_out_send_ends_in_failed() {
        let (orch, _) = orchestrator(ScriptedModel::new());
        let room = orch.rooms().create_room("r").await.unwrap();
        orch.rooms().identity().publish(None);

        assert!(orch.send_user_message(room.id, "Hi").await.is_err());
        assert_eq!(orch.state(), ExchangeState::Failed);
    }
}
