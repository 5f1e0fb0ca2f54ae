//! Streaming relay between the generation provider and the caller.
//!
//! The relay opens a streaming chat-completions request and forwards
//! each incremental token to the caller as it arrives. It is an
//! explicit state machine:
//!
//! - **Init / AwaitingHeaders**: [`HttpGenerator::open_stream`]. Any
//!   transport failure or non-success provider status surfaces as an
//!   [`AppError`] before a single byte is committed to the caller.
//! - **Streaming**: [`TokenStream`] parses the provider's SSE lines
//!   and yields token bytes. The stream is pull-based, so upstream is
//!   only read as fast as the caller sink drains it, and dropping the
//!   stream (caller disconnect) releases the provider connection.
//! - **Done**: the provider's `data: [DONE]` marker or EOF; nothing is
//!   forwarded past it.
//! - **Failed**: an upstream read error after commit. The 200 header is
//!   already on the wire, so the stream yields one error (aborting the
//!   connection mid-body) and the failure is logged; callers observe a
//!   truncated stream.

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::prompt::ChatMessage;

/// Opens a token stream for an assembled conversation prompt.
///
/// Trait seam mirroring [`crate::embed::Embedder`]; production
/// implementation is [`HttpGenerator`].
#[async_trait]
pub trait Generator: Send + Sync {
    async fn open_stream(&self, messages: &[ChatMessage]) -> AppResult<TokenStream>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Streaming client for an OpenAI-compatible chat-completions endpoint.
pub struct HttpGenerator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpGenerator {
    /// Build a generator client.
    ///
    /// No total request timeout: the response body is a long-lived
    /// stream. Connect establishment is still bounded.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn open_stream(&self, messages: &[ChatMessage]) -> AppResult<TokenStream> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::ProviderRejected {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                detail,
            });
        }

        tracing::debug!(model = %self.model, "Provider stream opened");

        let bytes = response
            .bytes_stream()
            .map(|item| item.map_err(|e| Box::new(e) as BoxedStreamError))
            .boxed();

        Ok(TokenStream::new(bytes))
    }
}

type BoxedStreamError = Box<dyn std::error::Error + Send + Sync>;

/// Error yielded when the provider stream breaks after the response has
/// committed. Aborts the caller connection mid-body.
#[derive(Debug, thiserror::Error)]
#[error("provider stream aborted: {0}")]
pub struct RelayAborted(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Streaming,
    Done,
    Failed,
}

/// Result of parsing one provider event line.
enum LineEvent {
    /// A non-empty incremental token.
    Token(String),
    /// The `data: [DONE]` end-of-stream marker.
    EndOfStream,
    /// Anything else: keep-alives, empty deltas, malformed payloads.
    Skip,
}

/// Parse a single line of the provider's SSE-style event stream.
///
/// Only `data: `-prefixed lines carry payloads. Unparseable payloads
/// are skipped rather than aborting the stream, so unknown event shapes
/// from newer provider versions pass through harmlessly.
fn parse_event_line(line: &[u8]) -> LineEvent {
    let Ok(text) = std::str::from_utf8(line) else {
        return LineEvent::Skip;
    };
    let Some(raw) = text.trim_end_matches(['\r', '\n']).strip_prefix("data: ") else {
        return LineEvent::Skip;
    };

    if raw == "[DONE]" {
        return LineEvent::EndOfStream;
    }

    let Ok(chunk) = serde_json::from_str::<StreamChunk>(raw) else {
        return LineEvent::Skip;
    };

    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        Some(token) if !token.is_empty() => LineEvent::Token(token),
        _ => LineEvent::Skip,
    }
}

/// Token stream over a provider byte stream.
///
/// Buffers raw bytes only until a newline completes an event line, then
/// parses and queues the extracted tokens. Tokens are yielded in
/// arrival order and never held back until end-of-stream.
pub struct TokenStream {
    upstream: BoxStream<'static, Result<Bytes, BoxedStreamError>>,
    buf: Vec<u8>,
    pending: VecDeque<Bytes>,
    state: RelayState,
}

impl TokenStream {
    pub fn new(upstream: BoxStream<'static, Result<Bytes, BoxedStreamError>>) -> Self {
        Self {
            upstream,
            buf: Vec::new(),
            pending: VecDeque::new(),
            state: RelayState::Streaming,
        }
    }

    /// Parse whatever is left in the buffer as a final line. The
    /// provider normally newline-terminates every event, but a body
    /// that ends mid-line still carries a token that must not be lost.
    fn flush_trailing_line(&mut self) {
        if self.state != RelayState::Streaming || self.buf.is_empty() {
            return;
        }
        let line = std::mem::take(&mut self.buf);
        if let LineEvent::Token(token) = parse_event_line(&line) {
            self.pending.push_back(Bytes::from(token));
        }
    }

    /// Split off every complete line in the buffer and parse it.
    /// Lines arriving after the end marker are dropped unparsed.
    fn drain_complete_lines(&mut self) {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if self.state != RelayState::Streaming {
                continue;
            }
            match parse_event_line(&line) {
                LineEvent::Token(token) => self.pending.push_back(Bytes::from(token)),
                LineEvent::EndOfStream => self.state = RelayState::Done,
                LineEvent::Skip => {}
            }
        }
    }
}

impl Stream for TokenStream {
    type Item = Result<Bytes, RelayAborted>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(token) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(token)));
            }
            if this.state != RelayState::Streaming {
                return Poll::Ready(None);
            }

            match this.upstream.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.buf.extend_from_slice(&chunk);
                    this.drain_complete_lines();
                }
                Poll::Ready(Some(Err(err))) => {
                    // Headers are committed; an error here can only
                    // truncate the response, not change the status.
                    this.state = RelayState::Failed;
                    tracing::warn!(error = %err, "Provider stream failed mid-relay, truncating");
                    return Poll::Ready(Some(Err(RelayAborted(err.to_string()))));
                }
                Poll::Ready(None) => {
                    this.flush_trailing_line();
                    this.state = RelayState::Done;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_line_yields_token() {
        let line = br#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        match parse_event_line(line) {
            LineEvent::Token(token) => assert_eq!(token, "Hello"),
            _ => panic!("expected token"),
        }
    }

    #[test]
    fn test_done_marker_ends_stream() {
        assert!(matches!(
            parse_event_line(b"data: [DONE]\r\n"),
            LineEvent::EndOfStream
        ));
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        assert!(matches!(
            parse_event_line(b"data: {not json"),
            LineEvent::Skip
        ));
    }

    #[test]
    fn test_non_data_line_is_skipped() {
        assert!(matches!(parse_event_line(b": keep-alive"), LineEvent::Skip));
        assert!(matches!(parse_event_line(b""), LineEvent::Skip));
    }

    #[test]
    fn test_empty_delta_is_skipped() {
        let line = br#"data: {"choices":[{"delta":{}}]}"#;
        assert!(matches!(parse_event_line(line), LineEvent::Skip));
        let empty = br#"data: {"choices":[{"delta":{"content":""}}]}"#;
        assert!(matches!(parse_event_line(empty), LineEvent::Skip));
    }

    #[test]
    fn test_crlf_line_ending_is_handled() {
        let line = b"data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\r\n";
        match parse_event_line(line) {
            LineEvent::Token(token) => assert_eq!(token, "hi"),
            _ => panic!("expected token"),
        }
    }
}
