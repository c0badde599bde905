//! The network boundary shared by all provider adapters.
//!
//! Adapters describe a streaming request as a [`ProviderRequest`]; a
//! [`ChatTransport`] turns it into a stream of JSON events, one per SSE
//! `data:` payload or per JSON line. The stream is pulled by the caller, so
//! the response body is only read as fast as fragments are consumed.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use memchr::memchr;
use serde_json::Value;
use tracing::debug;

use crate::core::adapter::AdapterError;

/// Wire framing of a provider's streaming response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// `data: {...}` lines, optionally terminated by `data: [DONE]`.
    ServerSentEvents,
    /// One JSON object per line.
    JsonLines,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub format: StreamFormat,
}

pub type EventStream = BoxStream<'static, Result<Value, AdapterError>>;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Submit a streaming request. Connection and HTTP status failures are
    /// returned here; failures after the stream opened arrive as stream
    /// items.
    async fn open_stream(&self, request: ProviderRequest) -> Result<EventStream, AdapterError>;
}

#[derive(Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, request: ProviderRequest) -> Result<EventStream, AdapterError> {
        debug!(url = %request.url, "opening provider stream");

        let mut http_request = self
            .client
            .post(&request.url)
            .header("Content-Type", "application/json");
        for (name, value) in &request.headers {
            http_request = http_request.header(name, value);
        }

        let response = http_request.json(&request.body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(AdapterError::Api {
                status,
                message: format_api_error(&error_text),
            });
        }

        Ok(decode_events(response.bytes_stream(), request.format))
    }
}

/// Join a base URL and an endpoint path without doubling slashes.
pub fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

enum LineOutcome {
    Event(Value),
    Skip,
    Done,
    Failed(AdapterError),
}

fn decode_line(line: &[u8], format: StreamFormat) -> LineOutcome {
    let line = match std::str::from_utf8(line) {
        Ok(line) => line.trim(),
        Err(err) => {
            debug!("skipping stream line with invalid UTF-8: {err}");
            return LineOutcome::Skip;
        }
    };

    let payload = match format {
        StreamFormat::ServerSentEvents => match line.strip_prefix("data:") {
            Some(payload) => payload.trim_start(),
            // event:, id:, retry: and comment lines carry no data
            None => return LineOutcome::Skip,
        },
        StreamFormat::JsonLines => line,
    };

    if payload.is_empty() {
        return LineOutcome::Skip;
    }
    if format == StreamFormat::ServerSentEvents && payload == "[DONE]" {
        return LineOutcome::Done;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => LineOutcome::Event(value),
        Err(_) => LineOutcome::Failed(AdapterError::Provider(format_api_error(payload))),
    }
}

struct DecoderState<S> {
    bytes: std::pin::Pin<Box<S>>,
    buffer: Vec<u8>,
    format: StreamFormat,
    eof: bool,
    finished: bool,
}

/// Split a byte stream into lines and decode each one into a JSON event.
///
/// The stream ends at EOF, at an SSE `[DONE]` marker, or after the first
/// error it yields.
pub fn decode_events<S, B, E>(bytes: S, format: StreamFormat) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<AdapterError> + Send + 'static,
{
    let state = DecoderState {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        format,
        eof: false,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(newline_pos) = memchr(b'\n', &state.buffer) {
                let line: Vec<u8> = state.buffer.drain(..=newline_pos).collect();
                match decode_line(&line, state.format) {
                    LineOutcome::Event(value) => return Some((Ok(value), state)),
                    LineOutcome::Skip => continue,
                    LineOutcome::Done => return None,
                    LineOutcome::Failed(err) => {
                        state.finished = true;
                        return Some((Err(err), state));
                    }
                }
            }

            if state.eof {
                if state.buffer.is_empty() {
                    return None;
                }
                // flush a final line that had no trailing newline
                state.buffer.push(b'\n');
                continue;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err.into()), state));
                }
                None => state.eof = true,
            }
        }
    })
    .boxed()
}

/// Pull a human-readable summary out of a provider error body.
pub fn extract_error_summary(value: &Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_owned)
        });

    summary
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Render a provider error body as a short summary plus a fenced block.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            return match extract_error_summary(&json_value) {
                Some(summary) => format!("API Error: {summary}\n```json\n{pretty_json}\n```"),
                None => format!("API Error:\n```json\n{pretty_json}\n```"),
            };
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{trimmed}\n```")
    } else {
        format!("API Error:\n```\n{trimmed}\n```")
    }
}
