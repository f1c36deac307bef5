//! Google Gemini API key provider (Generative Language API).

use anyhow::Result;
use futures_util::StreamExt;
use serde::Serialize;

use self::sse::GeminiSseParser;
use crate::providers::shared::{
    Message, ProviderError, Role, TextStream, classify_reqwest_error, resolve_api_key,
    resolve_base_url,
};

mod sse;

/// Default base URL for the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GoogleConfig {
    /// Creates a new config from the given values and the environment.
    ///
    /// Authentication: `config_api_key`, then `GEMINI_API_KEY`.
    /// Base URL: `GEMINI_BASE_URL`, then config, then the default.
    pub fn from_env(
        model: String,
        config_base_url: Option<&str>,
        config_api_key: Option<&str>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(config_api_key, "GEMINI_API_KEY", "google")?;
        let base_url = resolve_base_url(
            config_base_url,
            "GEMINI_BASE_URL",
            DEFAULT_BASE_URL,
            "Gemini",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model,
        })
    }
}

/// Google Gemini client.
#[derive(Debug)]
pub struct GoogleClient {
    config: GoogleConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Maps the transcript role onto Gemini's role vocabulary.
///
/// Gemini labels the assistant side `model`; the mapping must stay total
/// over both stored roles.
fn api_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

impl GoogleClient {
    /// Creates a new Gemini client with the given configuration.
    ///
    /// # Panics
    /// In test builds, panics if `base_url` is the production API.
    pub fn new(config: GoogleConfig) -> Self {
        #[cfg(test)]
        assert!(
            config.base_url != DEFAULT_BASE_URL,
            "Tests must not use the production Gemini API. \
             Set GEMINI_BASE_URL to a mock server."
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
        let request = GenerateContentRequest {
            contents: transcript
                .iter()
                .map(|m| Content {
                    role: api_role(m.role),
                    parts: vec![Part { text: &m.content }],
                })
                .collect(),
        };

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, self.config.model
        );
        tracing::debug!(model = %self.config.model, "gemini stream request");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .header("user-agent", crate::providers::shared::USER_AGENT)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http_status(status.as_u16(), &error_body));
        }

        Ok(GeminiSseParser::new(response.bytes_stream()).boxed())
    }
}
