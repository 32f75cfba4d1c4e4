//! Decision oracle: turns the conversation so far into the next snippet

mod openai;

pub use openai::OpenAiOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Oracle request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Oracle returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Oracle response invalid: {0}")]
    InvalidResponse(String),

    #[error("Oracle response missing content")]
    EmptyResponse,
}

/// Black-box decision service. Receives the full ordered history and returns
/// the text of one assistant message.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::assistant("x = 1");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "assistant", "content": "x = 1"})
        );
    }
}
