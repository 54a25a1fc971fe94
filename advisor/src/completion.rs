//! Completion provider boundary.
//!
//! The advisor's replies come from an OpenRouter-compatible chat-completions
//! endpoint. The provider sits behind a trait so API tests substitute a
//! canned implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use shared_types::{ChatMessage, Role};

use crate::knowledge::KnowledgeError;

/// System prompt for the advisor persona. The retrieved internship context
/// is appended after the trailing newline.
pub const ADVISOR_SYSTEM_PROMPT: &str = "You are a helpful assistant that is tailored to give advice to users in topics to advance someone's career, including general advising on different career-related fields in computer science. Additionally, here is some more information context regarding recent internship offerings:\n";

/// Prepend the system turn (persona + retrieval context) to the
/// conversation history.
pub fn build_turn_messages(context: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::new(
        Role::System,
        format!("{ADVISOR_SYSTEM_PROMPT}{context}"),
    ));
    messages.extend_from_slice(history);
    messages
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, KnowledgeError>;
}

/// Non-streaming OpenRouter chat-completions client.
pub struct OpenRouterClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, KnowledgeError> {
        let api_key = api_key.ok_or(KnowledgeError::MissingApiKey("OPENROUTER_API_KEY"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KnowledgeError::Transport {
                service: "completion",
                detail: format!("client build: {e}"),
            })?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, KnowledgeError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": messages,
            }))
            .send()
            .await
            .map_err(|e| KnowledgeError::from_reqwest("completion", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Transport {
                service: "completion",
                detail: format!("status {status}: {body}"),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| KnowledgeError::Parse {
                service: "completion",
                detail: e.to_string(),
            })?;

        payload
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| KnowledgeError::Parse {
                service: "completion",
                detail: "missing choices[0].message.content".to_string(),
            })
    }
}
