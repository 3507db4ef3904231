use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Failures of the text-generation service itself
///
/// These are distinct from a response that arrives but cannot be parsed,
/// which stages handle locally.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response contained no text")]
    EmptyResponse,
}

impl ClientError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Auth(_) | Self::EmptyResponse => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Anything that turns a prompt into a response
#[async_trait]
pub trait TextGenerationClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ClientError>;
}

/// Configuration for the Anthropic API client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (from ANTHROPIC_API_KEY env var)
    pub api_key: String,
    /// Model to use (REGTRACK_MODEL overrides the default)
    pub model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
    /// System prompt sent with every request
    pub system: String,
}

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const DEFAULT_SYSTEM: &str = "You are a regulatory compliance analyst. \
Answer precisely and return JSON whenever it is requested.";

impl AnthropicConfig {
    /// Create config from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set")?;
        let model = std::env::var("REGTRACK_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, model))
    }

    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            temperature: 0.1,
            max_tokens: 4096,
            system: DEFAULT_SYSTEM.to_string(),
        }
    }
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl TextGenerationClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, ClientError> {
        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            system: Some(&self.config.system),
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth(body),
                _ => ClientError::Api {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let response: AnthropicResponse = response.json().await?;
        let text: String = response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        debug!("Received {} chars from {}", text.len(), self.config.model);

        if text.trim().is_empty() {
            return Err(ClientError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}
