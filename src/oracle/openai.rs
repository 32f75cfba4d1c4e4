//! OpenAI-compatible `/chat/completions` oracle

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ChatMessage, Oracle, OracleError};
use crate::OracleConfig;

pub struct OpenAiOracle {
    client: Client,
    api_key: String,
    url: String,
    model: String,
    temperature: f64,
    max_tokens: u64,
}

impl OpenAiOracle {
    pub fn new(config: &OracleConfig, api_key: impl Into<String>) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| OracleError::Client(err.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            url: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Read the key from the environment variable named by `config.api_key_env`
    pub fn from_env(config: &OracleConfig) -> Result<Self, OracleError> {
        let key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OracleError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, key)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<Value>,
}

/// Message content is either a plain string or a list of typed text parts
fn content_text(content: &Value) -> Option<String> {
    let text = match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let text: String = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            Some(text)
        }
        _ => None,
    };
    text.filter(|t| !t.trim().is_empty())
}

fn first_choice_text(response: &ChatCompletionResponse) -> Result<String, OracleError> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_ref())
        .and_then(content_text)
        .ok_or(OracleError::EmptyResponse)
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(&self, history: &[ChatMessage]) -> Result<String, OracleError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: history,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!("Sending {} messages to {}", history.len(), self.url);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(OracleError::Status { status, body });
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| OracleError::InvalidResponse(err.to_string()))?;

        let text = first_choice_text(&response)?;
        debug!("Oracle replied with {} chars", text.len());
        Ok(text)
    }
}
