//! The running conversation and its JSON transcript.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::adapter::{AdapterError, ApiAdapter};
use crate::core::message::{Message, MessageError, Role};

pub const DEFAULT_SYSTEM_PROMPT: &str = "Carefully heed the user's instructions.
Respond using Markdown.
Respond briefly and concisely unless you are instructed to do otherwise.
Do not include any extraneous or tangential details unless you are instructed to do otherwise.";

#[derive(Debug)]
pub enum ConversationError {
    Io { path: PathBuf, source: io::Error },
    Json(serde_json::Error),
    Message(MessageError),
    Completion(AdapterError),
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationError::Io { path, source } => {
                write!(f, "Unable to access {}: {source}", path.display())
            }
            ConversationError::Json(err) => write!(f, "Invalid conversation JSON: {err}"),
            ConversationError::Message(err) => write!(f, "{err}"),
            ConversationError::Completion(err) => write!(f, "Unable to get completion: {err}"),
        }
    }
}

impl Error for ConversationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConversationError::Io { source, .. } => Some(source),
            ConversationError::Json(err) => Some(err),
            ConversationError::Message(err) => Some(err),
            ConversationError::Completion(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConversationError {
    fn from(err: serde_json::Error) -> Self {
        ConversationError::Json(err)
    }
}

impl From<MessageError> for ConversationError {
    fn from(err: MessageError) -> Self {
        ConversationError::Message(err)
    }
}

impl From<AdapterError> for ConversationError {
    fn from(err: AdapterError) -> Self {
        ConversationError::Completion(err)
    }
}

/// Ordered messages plus the optional transcript file they are mirrored to.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    log_path: Option<PathBuf>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn has_system_message(&self) -> bool {
        self.messages
            .iter()
            .any(|message| message.role() == Role::System)
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn insert_default_system_prompt(&mut self, prompt: &str) {
        self.messages.insert(0, Message::text(Role::System, prompt));
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    pub fn set_log_path(&mut self, path: Option<PathBuf>) {
        self.log_path = path;
    }

    /// Write the transcript if a log file is set.
    ///
    /// The file is replaced atomically, so an interrupted write never leaves
    /// a truncated transcript behind.
    pub fn save(&self) -> Result<(), ConversationError> {
        let Some(path) = &self.log_path else {
            return Ok(());
        };
        save_transcript(path, &self.messages)?;
        debug!(path = %path.display(), messages = self.messages.len(), "saved transcript");
        Ok(())
    }

    /// Request a completion for the conversation so far.
    ///
    /// Every fragment is handed to `on_fragment` as it arrives. The reply is
    /// appended only after the stream has been drained; if the stream fails
    /// part way, nothing is appended.
    pub async fn complete(
        &mut self,
        adapter: &dyn ApiAdapter,
        mut on_fragment: impl FnMut(&str),
    ) -> Result<&Message, ConversationError> {
        let mut completion = adapter.get_completion(&self.messages).await?;
        while let Some(fragment) = completion.next().await {
            on_fragment(&fragment?);
        }
        self.messages.push(completion.into_message());
        Ok(&self.messages[self.messages.len() - 1])
    }
}

/// Parse a transcript: a JSON array of message objects.
pub fn parse_transcript(json: &str) -> Result<Vec<Message>, ConversationError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_transcript(path: &Path) -> Result<Vec<Message>, ConversationError> {
    let contents = fs::read_to_string(path).map_err(|source| ConversationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_transcript(&contents)
}

/// Pretty-printed JSON with two-space indentation.
pub fn render_transcript(messages: &[Message]) -> Result<String, ConversationError> {
    Ok(serde_json::to_string_pretty(messages)?)
}

pub fn save_transcript(path: &Path, messages: &[Message]) -> Result<(), ConversationError> {
    let io_error = |source| ConversationError::Io {
        path: path.to_path_buf(),
        source,
    };
    let contents = render_transcript(messages)?;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(parent).map_err(io_error)?;
    temp_file.write_all(contents.as_bytes()).map_err(io_error)?;
    temp_file.flush().map_err(io_error)?;
    temp_file.as_file().sync_all().map_err(io_error)?;
    temp_file
        .persist(path)
        .map_err(|err| io_error(err.error))?;
    Ok(())
}
