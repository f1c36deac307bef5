//! OpenAI chat-completions SSE stream parser.

use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use serde_json::Value;

use crate::providers::shared::{ProviderError, ProviderResult};

/// SSE parser for OpenAI-compatible chat completions.
///
/// Yields `choices[0].delta.content` chunks in arrival order. Role
/// prologues, finish reasons, usage chunks, and the `[DONE]` sentinel are
/// discarded. An `error` object ends the stream with the one terminal
/// error.
pub struct ChatCompletionsSseParser<S> {
    inner: EventStream<SseTerminatedStream<S>>,
    done: bool,
}

/// Appends a blank line when the upstream body ends without one, so the
/// final buffered event is still flushed by the SSE decoder.
struct SseTerminatedStream<S> {
    inner: S,
    emitted_terminator: bool,
}

impl<S> SseTerminatedStream<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            emitted_terminator: false,
        }
    }
}

impl<S, E> Stream for SseTerminatedStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
{
    type Item = std::result::Result<bytes::Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.emitted_terminator {
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(item)) => Poll::Ready(Some(item)),
            Poll::Ready(None) => {
                self.emitted_terminator = true;
                Poll::Ready(Some(Ok(bytes::Bytes::from_static(b"\n\n"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S> ChatCompletionsSseParser<S> {
    pub fn new<E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    {
        Self {
            inner: SseTerminatedStream::new(stream).eventsource(),
            done: false,
        }
    }

    fn handle_event_data(&mut self, data: &str) -> ProviderResult<Option<String>> {
        let trimmed = data.trim();
        if trimmed.is_empty() || trimmed == "[DONE]" {
            return Ok(None);
        }

        let value = serde_json::from_str::<Value>(trimmed)
            .map_err(|err| ProviderError::parse(format!("Failed to parse SSE JSON: {err}")))?;

        if let Some(error) = value.get("error") {
            let error_type = error
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("error");
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(ProviderError::api_error(error_type, message));
        }

        let text = value
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("delta"))
            .and_then(|delta| delta.get("content"))
            .and_then(Value::as_str);

        match text {
            Some(text) if !text.is_empty() => Ok(Some(text.to_string())),
            _ => Ok(None),
        }
    }
}

impl<S, E> Stream for ChatCompletionsSseParser<S>
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
                Poll::Ready(Some(Ok(event))) => match self.handle_event_data(&event.data) {
                    Ok(Some(text)) => return Poll::Ready(Some(Ok(text))),
                    Ok(None) => {}
                    Err(err) => {
                        self.done = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                },
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

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::providers::shared::ProviderErrorKind;

    const SSE_TEXT_RESPONSE: &str = r#"data: {"id":"chatcmpl-1","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}

data: {"id":"chatcmpl-1","choices":[{"index":0,"delta":{"content":"Hel"}}]}

data: {"id":"chatcmpl-1","choices":[{"index":0,"delta":{"content":"lo"}}]}

data: {"id":"chatcmpl-1","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}

data: [DONE]

"#;

    const SSE_ERROR_RESPONSE: &str = r#"data: {"error":{"message":"Rate limit reached","type":"rate_limit_error"}}

"#;

    fn mock_byte_stream(
        data: &str,
    ) -> impl Stream<Item = std::result::Result<bytes::Bytes, std::io::Error>> {
        let chunks: Vec<_> = data
            .as_bytes()
            .chunks(32)
            .map(|c| Ok(bytes::Bytes::copy_from_slice(c)))
            .collect();
        futures_util::stream::iter(chunks)
    }

    async fn collect(data: &str) -> Vec<ProviderResult<String>> {
        let mut parser = ChatCompletionsSseParser::new(mock_byte_stream(data));
        let mut items = Vec::new();
        while let Some(item) = parser.next().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn yields_content_deltas_in_order() {
        let items = collect(SSE_TEXT_RESPONSE).await;
        let texts: Vec<String> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn error_object_is_terminal() {
        let items = collect(SSE_ERROR_RESPONSE).await;
        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ApiError);
        assert!(err.message.contains("rate_limit_error"));
    }

    #[tokio::test]
    async fn missing_done_sentinel_still_flushes_last_event() {
        // No trailing blank line and no [DONE]; the terminator shim flushes it.
        let data = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"tail\"}}]}";
        let items = collect(data).await;
        let texts: Vec<String> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(texts, vec!["tail"]);
    }

    #[tokio::test]
    async fn usage_only_chunks_are_skipped() {
        let data = "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":3}}\n\ndata: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"hi\"}}]}\n\ndata: [DONE]\n\n";
        let items = collect(data).await;
        let texts: Vec<String> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(texts, vec!["hi"]);
    }
}
