//! OpenAI provider (Chat Completions API).

use anyhow::Result;
use futures_util::StreamExt;
use serde::Serialize;

use self::sse::ChatCompletionsSseParser;
use crate::providers::shared::{
    Message, ProviderError, Role, TextStream, classify_reqwest_error, resolve_api_key,
    resolve_base_url,
};

mod sse;

/// Default base URL for the OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// OpenAI chat completions configuration.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl OpenAIConfig {
    /// Creates a new config from the given values and the environment.
    ///
    /// Authentication: `config_api_key`, then `OPENAI_API_KEY`.
    /// Base URL: `OPENAI_BASE_URL`, then config, then the default.
    pub fn from_env(
        model: String,
        config_base_url: Option<&str>,
        config_api_key: Option<&str>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(config_api_key, "OPENAI_API_KEY", "openai")?;
        let base_url = resolve_base_url(
            config_base_url,
            "OPENAI_BASE_URL",
            DEFAULT_BASE_URL,
            "OpenAI",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model,
        })
    }
}

/// OpenAI chat completions client.
#[derive(Debug)]
pub struct OpenAIClient {
    config: OpenAIConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatCompletionMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Maps the transcript role onto the chat-completions role vocabulary.
fn api_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

impl OpenAIClient {
    /// Creates a new OpenAI client with the given configuration.
    ///
    /// # Panics
    /// In test builds, panics if `base_url` is the production API.
    pub fn new(config: OpenAIConfig) -> Self {
        #[cfg(test)]
        assert!(
            config.base_url != DEFAULT_BASE_URL,
            "Tests must not use the production OpenAI API. \
             Set OPENAI_BASE_URL to a mock server."
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
        let request = ChatCompletionRequest {
            model: &self.config.model,
            stream: true,
            messages: transcript
                .iter()
                .map(|m| ChatCompletionMessage {
                    role: api_role(m.role),
                    content: &m.content,
                })
                .collect(),
        };

        let url = format!("{}{}", self.config.base_url, CHAT_COMPLETIONS_PATH);
        tracing::debug!(model = %self.config.model, "openai stream request");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .header("user-agent", crate::providers::shared::USER_AGENT)
            .header(
                "authorization",
                format!("Bearer {}", self.config.api_key),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &error_body));
        }

        Ok(ChatCompletionsSseParser::new(response.bytes_stream()).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_onto_chat_completions_vocabulary() {
        assert_eq!(api_role(Role::User), "user");
        assert_eq!(api_role(Role::Assistant), "assistant");
    }

    #[test]
    fn request_marks_streaming_and_keeps_order() {
        let transcript = vec![Message::user("a"), Message::assistant("b")];
        let request = ChatCompletionRequest {
            model: "gpt-5-mini",
            stream: true,
            messages: transcript
                .iter()
                .map(|m| ChatCompletionMessage {
                    role: api_role(m.role),
                    content: &m.content,
                })
                .collect(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stream"], serde_json::json!(true));
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][1]["role"], "assistant");
    }
}
