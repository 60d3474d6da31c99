//! Core data models for translation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Message role in a chat request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
        }
    }
}

/// One chat message as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: Role,
    /// Message text
    pub content: String,
}

/// Request sent to the model endpoint: one system instruction, one user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// System instruction
    pub system: String,
    /// User message carrying the text
    pub user: String,
}

impl ChatRequest {
    /// Create a request
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Messages in wire order
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage {
                role: Role::System,
                content: self.system.clone(),
            },
            ChatMessage {
                role: Role::User,
                content: self.user.clone(),
            },
        ]
    }
}

/// Generated text returned by the model endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated text
    pub content: String,
    /// Token usage reported by the endpoint
    pub total_tokens: Option<usize>,
}

impl ChatResponse {
    /// Response without usage data
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            total_tokens: None,
        }
    }

    /// Attach the reported token count
    pub fn with_tokens(mut self, total_tokens: usize) -> Self {
        self.total_tokens = Some(total_tokens);
        self
    }
}

/// One key/text pair from the input mapping
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    /// Key in the input object
    pub key: String,
    /// Value exactly as it appeared in the input
    pub original: Value,
    /// Text sent for translation; non-strings are serialized
    pub text: String,
}

impl TranslationUnit {
    /// Unit for one input entry
    pub fn new(key: impl Into<String>, original: Value) -> Self {
        let text = match &original {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            key: key.into(),
            original,
            text,
        }
    }

    /// Empty or whitespace-only units are copied through untranslated
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Units of a flat JSON object, in document order
    pub fn from_map(map: &Map<String, Value>) -> Vec<Self> {
        map.iter()
            .map(|(key, value)| Self::new(key.clone(), value.clone()))
            .collect()
    }
}

/// Durable resume state written after every batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index of the next unprocessed key
    #[serde(default)]
    pub index: usize,
    /// Output accumulated so far
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_text_from_values() {
        assert_eq!(TranslationUnit::new("1", json!("こんにちは")).text, "こんにちは");
        assert_eq!(TranslationUnit::new("2", json!(null)).text, "");
        assert_eq!(TranslationUnit::new("3", json!(42)).text, "42");
        assert!(TranslationUnit::new("4", json!("  \n")).is_blank());
    }

    #[test]
    fn test_units_keep_document_order() {
        let map = json!({"b": "x", "a": "y", "10": "z"});
        let keys: Vec<String> = TranslationUnit::from_map(map.as_object().unwrap())
            .into_iter()
            .map(|u| u.key)
            .collect();
        assert_eq!(keys, vec!["b", "a", "10"]);
    }

    #[test]
    fn test_checkpoint_shape() {
        let checkpoint: Checkpoint =
            serde_json::from_value(json!({"index": 40, "data": {"1": "a"}})).unwrap();
        assert_eq!(checkpoint.index, 40);
        assert_eq!(checkpoint.data.len(), 1);

        let back = serde_json::to_value(&checkpoint).unwrap();
        assert_eq!(back, json!({"index": 40, "data": {"1": "a"}}));
    }

    #[test]
    fn test_request_messages_order() {
        let messages = ChatRequest::new("sys", "hello").messages();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "hello");
        assert_eq!(Role::User.to_string(), "user");
    }
}
