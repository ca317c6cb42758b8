//! OpenAI-compatible chat completions client.
//!
//! Posts `{model, messages}` to `{base_url}/chat/completions`. One attempt
//! per call; the orchestrator decides what a failure means.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{CompletionModel, CompletionRequest};
use crate::error::{ChatError, ChatResult};

/// Default API root.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiModel {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiModel {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionModel for OpenAiModel {
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<Vec<String>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ChatError::Model("OPENAI_API_KEY is not configured".into()))?;

        debug!(model = %request.model, turns = request.messages.len(), "requesting completion");
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Model(format!("OpenAI request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ChatError::Model(format!(
                "OpenAI completion failed: {status} {body}"
            )));
        }

        let data: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Model(format!("OpenAI response parse error: {e}")))?;

        Ok(data
            .choices
            .into_iter()
            .map(|c| c.message.content.unwrap_or_default())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{ChatTurn, Role};

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let model = OpenAiModel::new(Client::new(), "http://localhost:9999/v1/", None);
        assert_eq!(model.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn request_serializes_roles_in_lowercase() {
        let request = CompletionRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![
                ChatTurn::new(Role::System, "be helpful"),
                ChatTurn::new(Role::Assistant, "hello"),
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["model"], "gpt-3.5-turbo");
    }

    #[test]
    fn response_choices_are_decoded() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Hi"}},{"message":{"role":"assistant"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        let texts: Vec<String> = parsed
            .choices
            .into_iter()
            .map(|c| c.message.content.unwrap_or_default())
            .collect();
        assert_eq!(texts, ["Hi", ""]);
    }

    #[tokio::test]
    async fn missing_key_is_a_model_error() {
        let model = OpenAiModel::new(Client::new(), OPENAI_BASE_URL, None);
        let request = CompletionRequest {
            model: "gpt-3.5-turbo".into(),
            messages: Vec::new(),
        };
        assert!(matches!(
            model.complete(&request).await,
            Err(ChatError::Model(_))
        ));
    }
}
