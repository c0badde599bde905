//! Provider adapters.
//!
//! Every backend implements [`ApiAdapter`]: it is built from user parameters,
//! translates the provider-agnostic [`Message`] list into its own request
//! shape, and returns a [`Completion`] that streams text fragments while
//! filling in the assistant reply.
//!
//! The set of adapters is closed and enumerated by [`AdapterKind`].

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod options;
pub mod registry;

use std::error::Error;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::stream::{Stream, StreamExt};
use futures_util::ready;
use serde_json::{Map, Value};

use crate::core::message::{Message, Payload, Role};
use crate::core::transport::{ChatTransport, EventStream};

pub use options::{parse_params, AdapterConfig, AdapterOption, AdapterParams};
pub use registry::{AdapterRegistry, RegistryError};

/// Output cap applied when images are sent without an explicit limit.
pub const SAFE_MAX_TOKENS: u32 = 1000;

#[derive(Debug)]
pub enum AdapterError {
    /// The adapter does not provide completions.
    Unimplemented(&'static str),
    /// The request could not be sent or the connection failed mid-stream.
    Transport(reqwest::Error),
    /// The provider answered with a non-success HTTP status.
    Api { status: u16, message: String },
    /// The provider reported an error inside the stream.
    Provider(String),
    /// The request body could not be encoded.
    Encode(serde_json::Error),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Unimplemented(adapter) => {
                write!(f, "get_completion() is not implemented for {adapter}")
            }
            AdapterError::Transport(err) => write!(f, "Request failed: {err}"),
            AdapterError::Api { status, message } => write!(f, "HTTP {status}: {message}"),
            AdapterError::Provider(message) => f.write_str(message),
            AdapterError::Encode(err) => write!(f, "Unable to encode request: {err}"),
        }
    }
}

impl Error for AdapterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AdapterError::Transport(err) => Some(err),
            AdapterError::Encode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        AdapterError::Transport(err)
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Encode(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    OpenAi,
    Anthropic,
    Ollama,
}

impl AdapterKind {
    pub const ALL: [AdapterKind; 3] = [AdapterKind::OpenAi, AdapterKind::Anthropic, AdapterKind::Ollama];

    pub fn id(self) -> &'static str {
        match self {
            AdapterKind::OpenAi => openai::ID,
            AdapterKind::Anthropic => anthropic::ID,
            AdapterKind::Ollama => ollama::ID,
        }
    }

    pub fn human_name(self) -> &'static str {
        match self {
            AdapterKind::OpenAi => openai::HUMAN_NAME,
            AdapterKind::Anthropic => anthropic::HUMAN_NAME,
            AdapterKind::Ollama => ollama::HUMAN_NAME,
        }
    }

    pub fn extra_help(self) -> &'static str {
        match self {
            AdapterKind::OpenAi => openai::EXTRA_HELP,
            AdapterKind::Anthropic => anthropic::EXTRA_HELP,
            AdapterKind::Ollama => ollama::EXTRA_HELP,
        }
    }

    /// Option declarations, built fresh on every call.
    pub fn options(self) -> Vec<AdapterOption> {
        match self {
            AdapterKind::OpenAi => openai::options(),
            AdapterKind::Anthropic => anthropic::options(),
            AdapterKind::Ollama => ollama::options(),
        }
    }

    /// Configuration keys that never leave the adapter.
    pub fn masked_keys(self) -> &'static [&'static str] {
        match self {
            AdapterKind::OpenAi => openai::MASKED_OPTIONS,
            AdapterKind::Anthropic => anthropic::MASKED_OPTIONS,
            AdapterKind::Ollama => ollama::MASKED_OPTIONS,
        }
    }

    /// Exact, case-sensitive match on the id or the human-readable name.
    pub fn find(identifier: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| identifier == kind.id() || identifier == kind.human_name())
    }

    pub fn build(self, params: &AdapterParams, transport: Arc<dyn ChatTransport>) -> Arc<dyn ApiAdapter> {
        match self {
            AdapterKind::OpenAi => Arc::new(openai::OpenAiAdapter::new(params, transport)),
            AdapterKind::Anthropic => Arc::new(anthropic::AnthropicAdapter::new(params, transport)),
            AdapterKind::Ollama => Arc::new(ollama::OllamaAdapter::new(params, transport)),
        }
    }
}

#[async_trait]
pub trait ApiAdapter: Send + Sync {
    fn kind(&self) -> AdapterKind;

    fn config(&self) -> &AdapterConfig;

    /// Configuration with secrets and nulls removed, safe to store in a
    /// transcript.
    fn masked_config(&self) -> Map<String, Value> {
        self.config().masked(self.kind().masked_keys())
    }

    fn display_name(&self) -> String {
        match self.config().get_str("model") {
            Some(model) => format!("{} / {}", self.kind().human_name(), model),
            None => self.kind().human_name().to_string(),
        }
    }

    /// The empty assistant message a completion streams into.
    fn response_message(&self) -> Message {
        Message::text(Role::Assistant, "")
            .with_adapter(self.kind().id(), self.masked_config())
            .with_display_name(self.display_name())
    }

    /// Start a streaming completion for the conversation so far.
    async fn get_completion(&self, messages: &[Message]) -> Result<Completion, AdapterError> {
        let _ = messages;
        Err(AdapterError::Unimplemented(self.kind().id()))
    }
}

/// Extracts the text fragment, if any, from one provider stream event.
pub type FragmentExtractor = fn(&Value) -> Result<Option<String>, AdapterError>;

/// A streaming completion and the assistant message it fills in.
///
/// Polling the stream appends each fragment to the message before yielding
/// it, so [`Completion::message`] is only complete once the stream has
/// ended. Events that carry no text are skipped.
pub struct Completion {
    events: EventStream,
    extract: FragmentExtractor,
    message: Message,
    done: bool,
}

impl Completion {
    pub fn new(events: EventStream, extract: FragmentExtractor, message: Message) -> Self {
        Self {
            events,
            extract,
            message,
            done: false,
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn into_message(self) -> Message {
        self.message
    }
}

impl Stream for Completion {
    type Item = Result<String, AdapterError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        loop {
            let event = match ready!(this.events.poll_next_unpin(cx)) {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    this.done = true;
                    return Poll::Ready(None);
                }
            };

            match (this.extract)(&event) {
                Ok(Some(fragment)) if !fragment.is_empty() => {
                    this.message.push_fragment(&fragment);
                    return Poll::Ready(Some(Ok(fragment)));
                }
                Ok(_) => continue,
                Err(err) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
            }
        }
    }
}

/// `### FILE:` block used by every adapter to present file contents.
pub(crate) fn file_block(path: &str, content: &str) -> String {
    format!("### FILE: {path}\n\n```\n{content}\n```")
}

pub(crate) fn image_caption(path: &str) -> String {
    format!("### IMAGE: {path}")
}

pub(crate) fn contains_image(messages: &[Message]) -> bool {
    messages
        .iter()
        .any(|message| matches!(message.payload(), Payload::Image { .. }))
}
