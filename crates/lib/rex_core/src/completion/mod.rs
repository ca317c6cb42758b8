//! Language-model completions.
//!
//! [`CompletionModel`] is the seam to the model provider; [`OpenAiModel`]
//! talks to any OpenAI-compatible endpoint and [`ScriptedModel`] replays
//! canned replies. The [`CompletionOrchestrator`] turns message history into
//! prompts and persists the assistant's answer.

pub mod openai;
pub mod orchestrator;
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatResult;

pub use openai::OpenAiModel;
pub use orchestrator::{CompletionOrchestrator, ExchangeState};
pub use scripted::ScriptedModel;

/// Default model id.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// System instruction prepended to every reply prompt.
pub const MENTOR_INSTRUCTION: &str =
    "Explain things as if you are a professional career mentor giving advice to someone";

/// System instruction used to name a new room.
pub const TITLE_INSTRUCTION: &str = "Generate a short title of at most six words for a \
     conversation that starts with the following message. Reply with the title only.";

/// Reply persisted when the model call fails.
pub const FALLBACK_REPLY: &str = "Sorry, something went wrong";

/// Prompt role of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged prompt entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request handed to a [`CompletionModel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
}

/// Prompt and model settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub model: String,
    pub system_instruction: String,
    pub title_instruction: String,
    pub fallback_reply: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_instruction: MENTOR_INSTRUCTION.to_string(),
            title_instruction: TITLE_INSTRUCTION.to_string(),
            fallback_reply: FALLBACK_REPLY.to_string(),
        }
    }
}

/// A chat-completion provider.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Text of every candidate the provider returned, in order.
    ///
    /// Failures are reported as `ChatError::Model`. No retry is attempted.
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<Vec<String>>;
}
