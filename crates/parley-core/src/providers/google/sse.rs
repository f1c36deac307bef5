//! Gemini SSE stream parser.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde_json::Value;

use crate::providers::shared::{ProviderError, ProviderResult};

/// Gemini SSE stream parser.
///
/// Each SSE data frame carries one JSON chunk with zero or more candidate
/// parts. Text parts are queued in frame order; thought parts, empty
/// parts, metadata-only chunks, and the `[DONE]` sentinel are discarded.
/// An `error` object ends the stream with the one terminal error.
pub struct GeminiSseParser<S> {
    inner: EventStream<S>,
    pending: VecDeque<String>,
    done: bool,
}

impl<S> GeminiSseParser<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn handle_event_data(&mut self, data: &str) -> ProviderResult<()> {
        let trimmed = data.trim();
        if trimmed.is_empty() || trimmed == "[DONE]" {
            return Ok(());
        }

        let value = serde_json::from_str::<Value>(trimmed)
            .map_err(|err| ProviderError::parse(format!("Failed to parse SSE JSON: {err}")))?;
        self.handle_chunk(&value)
    }

    fn handle_chunk(&mut self, value: &Value) -> ProviderResult<()> {
        if let Some(error) = value.get("error") {
            let error_type = error
                .get("status")
                .or_else(|| error.get("code"))
                .and_then(Value::as_str)
                .unwrap_or("error");
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(ProviderError::api_error(error_type, message));
        }

        let Some(parts) = value
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
        else {
            // Usage metadata, finish reasons, empty candidates: not text.
            return Ok(());
        };

        for part in parts {
            let is_thought = part
                .get("thought")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if is_thought {
                continue;
            }
            if let Some(text) = part.get("text").and_then(Value::as_str)
                && !text.is_empty()
            {
                self.pending.push_back(text.to_string());
            }
        }

        Ok(())
    }
}

impl<S, E> Stream for GeminiSseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ProviderResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(text)));
            }
            if self.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    if let Err(err) = self.handle_event_data(&event.data) {
                        self.done = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(ProviderError::parse(format!(
                        "SSE stream error: {e}"
                    )))));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
