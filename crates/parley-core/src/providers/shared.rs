//! Provider-agnostic types shared across LLM backends.

use std::fmt;

use anyhow::{Context, Result};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard User-Agent header for parley API requests.
pub const USER_AGENT: &str = concat!("parley/", env!("CARGO_PKG_VERSION"));

/// Conversational role of a message.
///
/// This is the vocabulary stored in transcripts and conversation logs.
/// Vendors with a different assistant label (Gemini uses `model`)
/// translate inside their adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transcript message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
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

// ============================================================================
// Config resolution helpers
// ============================================================================

/// Resolves an API key with precedence: config > env.
///
/// # Errors
/// Fails when neither the config value nor the environment variable is set.
pub fn resolve_api_key(
    config_api_key: Option<&str>,
    env_var: &str,
    config_section: &str,
) -> Result<String> {
    if let Some(key) = config_api_key {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    std::env::var(env_var).context(format!(
        "No API key available. Set {env_var} or api_key in [providers.{config_section}]."
    ))
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Fails when the chosen URL does not parse.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    provider_name: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str, provider_name: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {provider_name} base URL: {url}"))?;
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

/// Categories of provider errors for consistent error handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection timeout or request timeout
    Timeout,
    /// Failed to parse response (JSON parse error, invalid SSE, etc.)
    Parse,
    /// API-level error returned by the provider (e.g. overloaded, `rate_limit`)
    ApiError,
    /// The stream was canceled before the vendor finished.
    Canceled,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::HttpStatus => write!(f, "http_status"),
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::ApiError => write!(f, "api_error"),
            ProviderErrorKind::Canceled => write!(f, "canceled"),
        }
    }
}

/// Structured error from the provider with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    /// Error category
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g. raw error body)
    pub details: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, extracting the vendor message when the
    /// body carries a JSON `error.message`.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}");
        let details = if body.is_empty() {
            None
        } else {
            if let Ok(json) = serde_json::from_str::<Value>(body)
                && let Some(error_obj) = json.get("error")
                && let Some(msg) = error_obj.get("message").and_then(|v| v.as_str())
            {
                return Self {
                    kind: ProviderErrorKind::HttpStatus,
                    message: format!("HTTP {status}: {msg}"),
                    details: Some(body.to_string()),
                };
            }
            Some(body.to_string())
        };
        Self {
            kind: ProviderErrorKind::HttpStatus,
            message,
            details,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Parse, message)
    }

    /// Creates an API error (from a mid-stream error event).
    pub fn api_error(error_type: &str, message: &str) -> Self {
        Self {
            kind: ProviderErrorKind::ApiError,
            message: format!("{error_type}: {message}"),
            details: None,
        }
    }

    pub fn canceled() -> Self {
        Self::new(ProviderErrorKind::Canceled, "Canceled")
    }

    pub fn is_canceled(&self) -> bool {
        self.kind == ProviderErrorKind::Canceled
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Result type for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Boxed stream of text increments.
///
/// Only actual reply text crosses this boundary; vendor framing (pings,
/// usage frames, block lifecycle events) is filtered by each parser.
pub type TextStream = BoxStream<'static, ProviderResult<String>>;

/// Classifies a reqwest transport error into the provider taxonomy.
pub(crate) fn classify_reqwest_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::timeout(format!("Connection failed: {e}"))
    } else if e.is_request() {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Request error: {e}"))
    } else {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Network error: {e}"))
    }
}
