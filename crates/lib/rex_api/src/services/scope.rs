//! Per-request chat stores bound to the caller's identity.

use rex_core::IdentityContext;
use rex_core::completion::CompletionOrchestrator;
use rex_core::logs::EventLogStore;
use rex_core::messages::MessageStore;
use rex_core::models::auth::Identity;
use rex_core::rooms::ChatRoomStore;

use crate::AppState;

/// Stores and orchestrator scoped to one authenticated caller.
pub struct UserScope {
    pub user: Identity,
    pub rooms: ChatRoomStore,
    pub messages: MessageStore,
    pub orchestrator: CompletionOrchestrator,
}

impl UserScope {
    pub fn new(state: &AppState, user: Identity) -> Self {
        let identity = IdentityContext::signed_in(user.clone());
        let rooms = ChatRoomStore::new(state.chats.clone(), identity.clone());
        let messages = MessageStore::new(state.chats.clone(), identity);
        let orchestrator = CompletionOrchestrator::new(
            state.model.clone(),
            rooms.clone(),
            messages.clone(),
            state.completion.clone(),
        );
        Self {
            user,
            rooms,
            messages,
            orchestrator,
        }
    }
}

impl AppState {
    /// Event log store; logs are not user scoped.
    pub fn event_logs(&self) -> EventLogStore {
        EventLogStore::new(self.logs.clone())
    }
}
