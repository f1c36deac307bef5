//! Anthropic SSE stream parser.

use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde::Deserialize;

use crate::providers::shared::{ProviderError, ProviderResult};

/// SSE parser yielding only the text increments of a streamed reply.
///
/// Every event that is not a `text_delta` (message lifecycle, pings,
/// block start/stop, usage frames, unknown future event types) is
/// silently discarded. An `error` event ends the stream with the one
/// terminal error.
pub struct SseParser<S> {
    inner: EventStream<S>,
    done: bool,
}

impl<S> SseParser<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
            done: false,
        }
    }
}

impl<S, E> Stream for SseParser<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ProviderResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    match parse_event(&event.event, &event.data) {
                        Parsed::Text(text) => return Poll::Ready(Some(Ok(text))),
                        Parsed::Error(err) => {
                            self.done = true;
                            return Poll::Ready(Some(Err(err)));
                        }
                        Parsed::Skip => {}
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

enum Parsed {
    Text(String),
    Error(ProviderError),
    Skip,
}

fn parse_event(event_type: &str, data: &str) -> Parsed {
    match event_type {
        "content_block_delta" => {
            let Ok(parsed) = serde_json::from_str::<SseContentBlockDelta>(data) else {
                // Malformed delta frames carry no recoverable text; skip them
                // rather than killing an otherwise healthy stream.
                return Parsed::Skip;
            };
            match (parsed.delta.delta_type.as_str(), parsed.delta.text) {
                ("text_delta", Some(text)) => Parsed::Text(text),
                _ => Parsed::Skip,
            }
        }
        "error" => match serde_json::from_str::<SseError>(data) {
            Ok(parsed) => Parsed::Error(ProviderError::api_error(
                &parsed.error.error_type,
                &parsed.error.message,
            )),
            Err(err) => Parsed::Error(ProviderError::parse(format!(
                "Failed to parse error event: {err}"
            ))),
        },
        // message_start, content_block_start/stop, message_delta,
        // message_stop, ping, and anything the API grows later.
        _ => Parsed::Skip,
    }
}

#[derive(Debug, Deserialize)]
struct SseContentBlockDelta {
    delta: SseDelta,
}

#[derive(Debug, Deserialize)]
struct SseDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseError {
    error: SseErrorInfo,
}

#[derive(Debug, Deserialize)]
struct SseErrorInfo {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
