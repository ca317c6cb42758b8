//! Model that replays queued replies. Used by tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionModel, CompletionRequest};
use crate::error::{ChatError, ChatResult};

#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failed call.
    pub fn fail(self, cause: impl Into<String>) -> Self {
        self.push(Err(cause.into()));
        self
    }

    pub fn push(&self, outcome: Result<String, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(outcome);
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<Vec<String>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self
            .replies
            .lock()
            .map_err(|e| ChatError::Model(format!("scripted model poisoned: {e}")))?
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(vec![text]),
            Some(Err(cause)) => Err(ChatError::Model(cause)),
            None => Err(ChatError::Model("no scripted reply left".into())),
        }
    }
}
