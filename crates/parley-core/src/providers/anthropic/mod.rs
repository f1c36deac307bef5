//! Anthropic API key provider (Messages API).

use anyhow::Result;
use futures_util::StreamExt;
use serde::Serialize;

use self::sse::SseParser;
use crate::providers::shared::{
    Message, ProviderError, Role, TextStream, classify_reqwest_error, resolve_api_key,
    resolve_base_url,
};

mod sse;

/// Default base URL for the Anthropic API.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Configuration for the Anthropic client.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl AnthropicConfig {
    /// Creates a new config from the given values and the environment.
    ///
    /// Authentication resolution order:
    /// 1. `config_api_key` parameter (from config file)
    /// 2. `ANTHROPIC_API_KEY` environment variable
    ///
    /// Base URL resolution order:
    /// 1. `ANTHROPIC_BASE_URL` env var (if set and non-empty)
    /// 2. `config_base_url` parameter (if Some and non-empty)
    /// 3. Default: `https://api.anthropic.com`
    pub fn from_env(
        model: String,
        max_tokens: Option<u32>,
        config_base_url: Option<&str>,
        config_api_key: Option<&str>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(config_api_key, "ANTHROPIC_API_KEY", "anthropic")?;
        let base_url = resolve_base_url(
            config_base_url,
            "ANTHROPIC_BASE_URL",
            DEFAULT_BASE_URL,
            "Anthropic",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model,
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }
}

/// Anthropic API client.
#[derive(Debug)]
pub struct AnthropicClient {
    config: AnthropicConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Maps the transcript role onto Anthropic's role vocabulary.
fn api_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

impl AnthropicClient {
    /// Creates a new Anthropic client with the given configuration.
    ///
    /// # Panics
    /// In test builds, panics if `base_url` is the production API. This
    /// prevents tests from accidentally making real network requests; point
    /// `ANTHROPIC_BASE_URL` at a mock server instead.
    pub fn new(config: AnthropicConfig) -> Self {
        #[cfg(test)]
        assert!(
            config.base_url != DEFAULT_BASE_URL,
            "Tests must not use the production Anthropic API. \
             Set ANTHROPIC_BASE_URL to a mock server."
        );

        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends the transcript and returns a stream of text increments.
    ///
    /// # Errors
    /// Returns an error when the request cannot be sent or the server
    /// responds with a non-success status.
    pub async fn stream_reply(&self, transcript: &[Message]) -> Result<TextStream, ProviderError> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: transcript
                .iter()
                .map(|m| ApiMessage {
                    role: api_role(m.role),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };

        let url = format!("{}/v1/messages", self.config.base_url);
        tracing::debug!(model = %self.config.model, "anthropic stream request");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .header("user-agent", crate::providers::shared::USER_AGENT)
            .header("anthropic-version", API_VERSION)
            .header("x-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &error_body));
        }

        Ok(SseParser::new(response.bytes_stream()).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_onto_anthropic_vocabulary() {
        assert_eq!(api_role(Role::User), "user");
        assert_eq!(api_role(Role::Assistant), "assistant");
    }

    #[test]
    fn request_serializes_full_history() {
        let transcript = vec![
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("again"),
        ];
        let request = MessagesRequest {
            model: "claude-sonnet-4-5",
            max_tokens: 4096,
            messages: transcript
                .iter()
                .map(|m| ApiMessage {
                    role: api_role(m.role),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], serde_json::json!(true));
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][1]["role"], "assistant");
        assert_eq!(value["messages"][2]["content"], "again");
    }
}
