// src/ai/mod.rs

pub mod adaptive;
pub mod chat;
pub mod exam_generator;
pub mod openai;
pub mod writing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the provider for a reply that is a single JSON object.
    pub json_response: bool,
}

impl CompletionRequest {
    /// A system instruction followed by one user prompt, JSON reply requested.
    pub fn json(system: &str, prompt: String, temperature: f32) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(prompt)],
            temperature,
            json_response: true,
        }
    }
}

/// External text-completion service.
///
/// Implemented by [`openai::OpenAiClient`] in production; tests plug in stubs.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the text of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError>;
}

/// Parses the first JSON object or array found in a model reply.
///
/// Replies often wrap the payload in prose or code fences; anything before
/// the first `{` or `[` and anything after the value is ignored.
pub fn extract_json<T: DeserializeOwned>(content: &str) -> Result<T, AppError> {
    let start = content
        .find(|c| c == '{' || c == '[')
        .ok_or_else(|| AppError::InternalServerError("No JSON found in completion".to_string()))?;

    serde_json::Deserializer::from_str(&content[start..])
        .into_iter::<T>()
        .next()
        .ok_or_else(|| AppError::InternalServerError("No JSON found in completion".to_string()))?
        .map_err(|e| AppError::InternalServerError(format!("Failed to parse completion: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_extract_json_plain_object() {
        let v: Value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_extract_json_ignores_surrounding_text() {
        let reply = "Sure! Here it is:\n```json\n{\"level\": \"B2\"}\n```\nGood luck.";
        let v: Value = extract_json(reply).unwrap();
        assert_eq!(v["level"], "B2");
    }

    #[test]
    fn test_extract_json_array_first() {
        let v: Vec<i32> = extract_json("result: [1, 2, 3] then {\"x\": 1}").unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn test_extract_json_missing() {
        let r: Result<Value, _> = extract_json("no structured data here");
        assert!(matches!(r, Err(AppError::InternalServerError(_))));
    }

    #[test]
    fn test_extract_json_malformed() {
        let r: Result<Value, _> = extract_json("{\"a\": ");
        assert!(r.is_err());
    }

    #[test]
    fn test_chat_message_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
