// src/tools/llm.rs

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode provider response: {0}")]
    Decode(String),
    #[error("provider response has no message content")]
    MissingContent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".into(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".into(),
            content: content.to_string(),
        }
    }
}

/// One request to a chat model: a system and a user message.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f64,
    pub messages: Vec<ChatMessage>,
    /// Ask the provider for a JSON object response.
    pub json_response: bool,
}

impl ChatRequest {
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": self.messages,
            "temperature": self.temperature,
        });
        if self.json_response {
            payload["response_format"] = json!({ "type": "json_object" });
        }
        payload
    }
}

/// A blocking call-and-response language model.
pub trait LlmClient: Send + Sync {
    fn complete(&self, request: &ChatRequest) -> Result<String, TransportError>;
}

/// Talks to any endpoint shaped like `/chat/completions` (OpenAI, Ollama's `/v1`).
pub struct OpenAiCompatibleClient {
    base_url: String,
    api_key: String,
    http: reqwest::blocking::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

pub(crate) fn extract_content(body: &str) -> Result<String, TransportError> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(TransportError::MissingContent)
}

impl LlmClient for OpenAiCompatibleClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request.to_payload())
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        extract_content(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json_response: bool) -> ChatRequest {
        ChatRequest {
            model: "gpt-4o".into(),
            temperature: 0.0,
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("go")],
            json_response,
        }
    }

    #[test]
    fn payload_carries_format_hint_only_when_requested() {
        let payload = request(true).to_payload();
        assert_eq!(payload["response_format"]["type"], "json_object");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "go");

        assert!(request(false).to_payload().get("response_format").is_none());
    }

    #[test]
    fn extracts_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "{}");

        let empty = r#"{"choices":[]}"#;
        assert_eq!(extract_content(empty), Err(TransportError::MissingContent));
        assert!(matches!(extract_content("nope"), Err(TransportError::Decode(_))));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let client =
            OpenAiCompatibleClient::new("http://localhost:11434/v1/", "ollama", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }
}
