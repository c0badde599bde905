//! Conversation turns and their transcript representation.
//!
//! A [`Message`] is one of three variants: plain text, a file whose contents
//! are sent to the model, or an image sent as base64. File and image
//! messages keep a short placeholder in `content` so the transcript shown to
//! the user never contains the raw payload.
//!
//! Messages serialize to a flat JSON object carrying a `message_type`
//! discriminator (`"Message"`, `"FileMessage"`, `"ImageMessage"`). Fields
//! without a value are omitted.

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::utils::path::{mime_type, normalize_path};

pub const MESSAGE_TYPE_KEY: &str = "message_type";
pub const TEXT_MESSAGE_TYPE: &str = "Message";
pub const FILE_MESSAGE_TYPE: &str = "FileMessage";
pub const IMAGE_MESSAGE_TYPE: &str = "ImageMessage";

/// MIME type used when an image extension is not recognized.
pub const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Capitalized role, used as the default display name.
    pub fn label(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = MessageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(MessageError::Invalid(format!("unknown role: {value}"))),
        }
    }
}

#[derive(Debug)]
pub enum MessageError {
    /// A referenced file or image does not exist.
    NotFound { path: String },
    /// A referenced file exists but could not be read.
    Io { path: String, source: io::Error },
    Json(serde_json::Error),
    /// A transcript entry has a field of the wrong shape.
    Invalid(String),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::NotFound { path } => write!(f, "File {path} does not exist"),
            MessageError::Io { path, source } => write!(f, "Unable to read {path}: {source}"),
            MessageError::Json(err) => write!(f, "Invalid message JSON: {err}"),
            MessageError::Invalid(reason) => write!(f, "Invalid message: {reason}"),
        }
    }
}

impl Error for MessageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MessageError::Io { source, .. } => Some(source),
            MessageError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MessageError {
    fn from(err: serde_json::Error) -> Self {
        MessageError::Json(err)
    }
}

/// Variant-specific data carried by a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text,
    File {
        path: String,
        content: String,
    },
    Image {
        path: String,
        /// Base64-encoded image bytes.
        content: String,
        mime_type: String,
    },
}

impl Payload {
    pub fn message_type(&self) -> &'static str {
        match self {
            Payload::Text => TEXT_MESSAGE_TYPE,
            Payload::File { .. } => FILE_MESSAGE_TYPE,
            Payload::Image { .. } => IMAGE_MESSAGE_TYPE,
        }
    }

    fn placeholder(&self) -> Option<String> {
        match self {
            Payload::Text => None,
            Payload::File { path, .. } => Some(format!("### File: {path} (contents hidden)")),
            Payload::Image {
                path, mime_type, ..
            } => Some(format!(
                "### Image: {path} ({mime_type}) (contents hidden)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    File,
    Image,
}

/// A file or image that has been referenced but not read yet.
///
/// Loading is the only step that touches the filesystem; the resulting
/// [`Message`] always holds its payload in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    role: Role,
    kind: AttachmentKind,
    path: PathBuf,
}

impl Attachment {
    pub fn file(role: Role, path: impl Into<PathBuf>) -> Self {
        Self {
            role,
            kind: AttachmentKind::File,
            path: path.into(),
        }
    }

    pub fn image(role: Role, path: impl Into<PathBuf>) -> Self {
        Self {
            role,
            kind: AttachmentKind::Image,
            path: path.into(),
        }
    }

    pub fn kind(&self) -> AttachmentKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the referenced file and build the message that carries it.
    pub fn load(&self) -> Result<Message, MessageError> {
        let path = normalize_path(&self.path);
        let payload = match self.kind {
            AttachmentKind::File => {
                let content = read_file(&path, |path| fs::read_to_string(path))?;
                Payload::File { path, content }
            }
            AttachmentKind::Image => {
                let bytes = read_file(&path, |path| fs::read(path))?;
                let mime_type = mime_type(&path).unwrap_or(DEFAULT_IMAGE_TYPE).to_string();
                Payload::Image {
                    path,
                    content: BASE64.encode(bytes),
                    mime_type,
                }
            }
        };
        debug!(path = %self.path.display(), kind = ?self.kind, "loaded attachment");
        Ok(Message::with_payload(self.role, payload))
    }
}

fn read_file<T>(path: &str, read: impl Fn(&str) -> io::Result<T>) -> Result<T, MessageError> {
    read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            MessageError::NotFound {
                path: path.to_string(),
            }
        } else {
            MessageError::Io {
                path: path.to_string(),
                source,
            }
        }
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    role: Role,
    content: String,
    adapter: Option<String>,
    adapter_options: Option<Map<String, Value>>,
    display_name: String,
    extra: Option<Map<String, Value>>,
    payload: Payload,
}

impl Message {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            adapter: None,
            adapter_options: None,
            display_name: role.label().to_string(),
            extra: None,
            payload: Payload::Text,
        }
    }

    /// Read a file from disk into a file message.
    pub fn file(role: Role, path: impl Into<PathBuf>) -> Result<Self, MessageError> {
        Attachment::file(role, path).load()
    }

    /// Read an image from disk into an image message.
    pub fn image(role: Role, path: impl Into<PathBuf>) -> Result<Self, MessageError> {
        Attachment::image(role, path).load()
    }

    /// Build a file message from contents that are already in memory.
    pub fn file_from_parts(
        role: Role,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::with_payload(
            role,
            Payload::File {
                path: path.into(),
                content: content.into(),
            },
        )
    }

    /// Build an image message from base64 contents that are already in
    /// memory. The MIME type is inferred from the path when not given.
    pub fn image_from_parts(
        role: Role,
        path: impl Into<String>,
        base64_content: impl Into<String>,
        mime: Option<String>,
    ) -> Self {
        let path = path.into();
        let mime_type =
            mime.unwrap_or_else(|| mime_type(&path).unwrap_or(DEFAULT_IMAGE_TYPE).to_string());
        Self::with_payload(
            role,
            Payload::Image {
                path,
                content: base64_content.into(),
                mime_type,
            },
        )
    }

    fn with_payload(role: Role, payload: Payload) -> Self {
        let mut message = Self::text(role, String::new());
        if let Some(placeholder) = payload.placeholder() {
            message.content = placeholder;
        }
        message.payload = payload;
        message
    }

    /// Tag the message with the adapter that produced it.
    pub fn with_adapter(mut self, adapter: impl Into<String>, options: Map<String, Value>) -> Self {
        self.adapter = Some(adapter.into());
        self.adapter_options = Some(options);
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn adapter(&self) -> Option<&str> {
        self.adapter.as_deref()
    }

    pub fn adapter_options(&self) -> Option<&Map<String, Value>> {
        self.adapter_options.as_ref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn extra(&self) -> Option<&Map<String, Value>> {
        self.extra.as_ref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn message_type(&self) -> &'static str {
        self.payload.message_type()
    }

    /// Append a streamed fragment. Only text messages grow after
    /// construction; file and image placeholders are fixed.
    pub(crate) fn push_fragment(&mut self, fragment: &str) {
        if matches!(self.payload, Payload::Text) {
            self.content.push_str(fragment);
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(MESSAGE_TYPE_KEY.into(), self.message_type().into());
        map.insert("role".into(), self.role.as_str().into());
        map.insert("content".into(), self.content.clone().into());
        if let Some(adapter) = &self.adapter {
            map.insert("adapter".into(), adapter.clone().into());
        }
        if let Some(options) = &self.adapter_options {
            map.insert("adapter_options".into(), Value::Object(options.clone()));
        }
        map.insert("display_name".into(), self.display_name.clone().into());
        if let Some(extra) = &self.extra {
            map.insert("extra".into(), Value::Object(extra.clone()));
        }

        match &self.payload {
            Payload::Text => {}
            Payload::File { path, content } => {
                map.insert("file_content".into(), content.clone().into());
                map.insert("file_path".into(), path.clone().into());
            }
            Payload::Image {
                path,
                content,
                mime_type,
            } => {
                map.insert("image_path".into(), path.clone().into());
                map.insert("image_content".into(), content.clone().into());
                map.insert("image_type".into(), mime_type.clone().into());
            }
        }

        map
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.to_map()).to_string()
    }

    /// Rebuild a message from its map form.
    ///
    /// An unknown or missing `message_type` yields a text message, as does a
    /// file or image entry without a path. Keys the selected variant does not
    /// use are ignored. Paths are normalized; entries without their payload
    /// are loaded from disk.
    pub fn from_map(mut map: Map<String, Value>) -> Result<Self, MessageError> {
        let message_type = take_string(&mut map, MESSAGE_TYPE_KEY)?;
        let role = match take_string(&mut map, "role")? {
            Some(role) => Role::try_from(role.as_str())?,
            None => Role::User,
        };
        let content = take_string(&mut map, "content")?.unwrap_or_default();
        let adapter = take_string(&mut map, "adapter")?;
        let adapter_options = take_object(&mut map, "adapter_options")?;
        let display_name = take_string(&mut map, "display_name")?;
        let extra = take_object(&mut map, "extra")?;

        let mut message = match message_type.as_deref() {
            Some(FILE_MESSAGE_TYPE) => match take_string(&mut map, "file_path")? {
                Some(path) => {
                    let path = normalize_path(&path);
                    match take_string(&mut map, "file_content")? {
                        Some(file_content) => Self::file_from_parts(role, path, file_content),
                        None => Self::file(role, path)?,
                    }
                }
                None => {
                    debug!("file message without file_path, reading as text");
                    Self::text(role, content)
                }
            },
            Some(IMAGE_MESSAGE_TYPE) => match take_string(&mut map, "image_path")? {
                Some(path) => {
                    let path = normalize_path(&path);
                    let mime = take_string(&mut map, "image_type")?;
                    match take_string(&mut map, "image_content")? {
                        Some(image_content) => {
                            Self::image_from_parts(role, path, image_content, mime)
                        }
                        None => {
                            let mut loaded = Self::image(role, path)?;
                            if let (Some(mime), Payload::Image { mime_type, .. }) =
                                (mime, &mut loaded.payload)
                            {
                                *mime_type = mime;
                                loaded.content = loaded.payload.placeholder().unwrap_or_default();
                            }
                            loaded
                        }
                    }
                }
                None => {
                    debug!("image message without image_path, reading as text");
                    Self::text(role, content)
                }
            },
            other => {
                if let Some(unknown) = other.filter(|kind| *kind != TEXT_MESSAGE_TYPE) {
                    debug!(message_type = unknown, "unknown message type, reading as text");
                }
                Self::text(role, content)
            }
        };

        for key in map.keys() {
            debug!(key = %key, "ignoring unrecognized message field");
        }

        message.adapter = adapter;
        message.adapter_options = adapter_options;
        if let Some(display_name) = display_name {
            message.display_name = display_name;
        }
        message.extra = extra;
        Ok(message)
    }

    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Self::from_map(map),
            other => Err(MessageError::Invalid(format!(
                "expected a JSON object, found {other}"
            ))),
        }
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Result<Option<String>, MessageError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(MessageError::Invalid(format!(
            "`{key}` must be a string, found {other}"
        ))),
    }
}

fn take_object(
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<Map<String, Value>>, MessageError> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(value)) => Ok(Some(value)),
        Some(other) => Err(MessageError::Invalid(format!(
            "`{key}` must be an object, found {other}"
        ))),
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Message::from_map(map).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{assistant_options, TEST_IMAGE};
    use serde_json::json;
    use std::io::Write;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn text_message_defaults_display_name_to_capitalized_role() {
        let message = Message::text(Role::User, "hi");
        assert_eq!(message.display_name(), "User");
        assert_eq!(message.message_type(), TEXT_MESSAGE_TYPE);
        assert_eq!(Message::text(Role::System, "").display_name(), "System");
    }

    #[test]
    fn file_message_hides_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, "file content").unwrap();

        let message = Message::file(Role::User, &path).unwrap();
        let stored_path = normalize_path(&path);
        match message.payload() {
            Payload::File { path, content } => {
                assert_eq!(path, &stored_path);
                assert_eq!(content, "file content");
            }
            other => panic!("expected file payload, got {other:?}"),
        }
        assert_eq!(
            message.content(),
            format!("### File: {stored_path} (contents hidden)")
        );
        assert!(!message.content().contains("file content"));
    }

    #[test]
    fn image_message_encodes_bytes_and_infers_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"image content").unwrap();

        let message = Message::image(Role::User, &path).unwrap();
        let stored_path = normalize_path(&path);
        match message.payload() {
            Payload::Image {
                path,
                content,
                mime_type,
            } => {
                assert_eq!(path, &stored_path);
                assert_eq!(content, &BASE64.encode(b"image content"));
                assert_eq!(mime_type, "image/png");
            }
            other => panic!("expected image payload, got {other:?}"),
        }
        assert_eq!(
            message.content(),
            format!("### Image: {stored_path} (image/png) (contents hidden)")
        );
    }

    #[test]
    fn unknown_image_extension_defaults_to_jpeg() {
        let message = Message::image_from_parts(Role::User, "scan.nosuchext", TEST_IMAGE, None);
        assert_eq!(
            message.content(),
            "### Image: scan.nosuchext (image/jpeg) (contents hidden)"
        );
    }

    #[test]
    fn missing_file_reports_not_found_with_path() {
        let err = Message::file(Role::User, "definitely/not/here.txt").unwrap_err();
        match err {
            MessageError::NotFound { path } => assert_eq!(path, "definitely/not/here.txt"),
            other => panic!("expected NotFound, got {other:?}"),
        }

        let err = Attachment::image(Role::User, "nope.png").load().unwrap_err();
        assert!(matches!(err, MessageError::NotFound { .. }));
        assert!(err.to_string().contains("nope.png"));
    }

    #[test]
    fn attachment_is_inert_until_loaded() {
        let attachment = Attachment::file(Role::User, "not-created-yet.txt");
        assert_eq!(attachment.kind(), AttachmentKind::File);
        assert_eq!(attachment.path(), Path::new("not-created-yet.txt"));
    }

    #[test]
    fn streamed_fragments_only_grow_text_messages() {
        let mut text = Message::text(Role::Assistant, "");
        text.push_fragment("this");
        text.push_fragment(" is");
        assert_eq!(text.content(), "this is");

        let mut file = Message::file_from_parts(Role::User, "a.txt", "body");
        file.push_fragment("extra");
        assert_eq!(file.content(), "### File: a.txt (contents hidden)");
    }

    #[test]
    fn map_round_trip_for_every_variant() {
        let messages = vec![
            Message::text(Role::System, "You are an assistant."),
            Message::text(Role::User, "How are you?"),
            Message::text(Role::Assistant, "I am fine, thank you!")
                .with_adapter("ollama", assistant_options())
                .with_display_name("Ollama / gemma3"),
            Message::text(Role::User, "tagged").with_extra(object(json!({"pinned": true}))),
            Message::file_from_parts(Role::User, "test.txt", "i'm a file =3"),
            Message::image_from_parts(
                Role::User,
                "test.png",
                TEST_IMAGE,
                Some("image/png".to_string()),
            ),
        ];

        for message in messages {
            let map = message.to_map();
            let rebuilt = Message::from_map(map.clone()).unwrap();
            assert_eq!(rebuilt, message);
            assert_eq!(rebuilt.to_json(), message.to_json());
            assert_eq!(rebuilt.to_map(), map);
        }
    }

    #[test]
    fn absent_fields_are_omitted() {
        let map = Message::text(Role::User, "hello").to_map();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["message_type", "role", "content", "display_name"]);
        assert!(!Message::text(Role::User, "x").to_json().contains("null"));
    }

    #[test]
    fn serialized_key_order_is_stable() {
        let message = Message::file_from_parts(Role::User, "test.txt", "body")
            .with_adapter("openai", Map::new());
        let keys: Vec<String> = message.to_map().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "message_type",
                "role",
                "content",
                "adapter",
                "adapter_options",
                "display_name",
                "file_content",
                "file_path",
            ]
        );
    }

    #[test]
    fn json_round_trip_is_byte_identical() {
        let json = r#"{"message_type":"Message","role":"assistant","content":"Hello, world!","adapter":"openai","adapter_options":{"model":"gpt-3.5-turbo","temperature":0.7},"display_name":"Assistant"}"#;
        let message = Message::from_json(json).unwrap();
        assert_eq!(message.to_json(), json);
    }

    #[test]
    fn nested_option_order_survives_round_trip() {
        let json = r#"{"message_type":"Message","role":"assistant","content":"","adapter_options":{"temperature":"1","model":"x"},"display_name":"Assistant"}"#;
        assert_eq!(Message::from_json(json).unwrap().to_json(), json);
    }

    #[test]
    fn unknown_discriminator_falls_back_to_text() {
        let message = Message::from_map(object(json!({
            "message_type": "AudioMessage",
            "role": "user",
            "content": "listen",
            "audio_path": "clip.wav",
        })))
        .unwrap();
        assert_eq!(message, Message::text(Role::User, "listen"));
    }

    #[test]
    fn missing_discriminator_reads_as_text() {
        let message = Message::from_map(object(json!({
            "role": "assistant",
            "content": "Hello, world!",
            "display_name": "Assistant",
        })))
        .unwrap();
        assert_eq!(message.message_type(), TEXT_MESSAGE_TYPE);
        assert_eq!(message.content(), "Hello, world!");
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let message = Message::from_map(object(json!({
            "message_type": "FileMessage",
            "role": "user",
            "content": "ignored",
            "file_path": "notes.md",
            "file_content": "# Notes",
            "future_field": [1, 2, 3],
        })))
        .unwrap();
        assert_eq!(message, Message::file_from_parts(Role::User, "notes.md", "# Notes"));
    }

    #[test]
    fn stored_paths_are_normalized_on_load() {
        let message = Message::from_map(object(json!({
            "message_type": "FileMessage",
            "role": "user",
            "file_path": "./notes.md",
            "file_content": "# Notes",
        })))
        .unwrap();
        assert_eq!(message, Message::file_from_parts(Role::User, "notes.md", "# Notes"));

        let message = Message::from_map(object(json!({
            "message_type": "ImageMessage",
            "role": "user",
            "image_path": "shots/../pixel.png",
            "image_content": TEST_IMAGE,
        })))
        .unwrap();
        assert_eq!(
            message.content(),
            "### Image: pixel.png (image/png) (contents hidden)"
        );
    }

    #[test]
    fn attachment_entries_without_a_path_read_as_text() {
        let message = Message::from_map(object(json!({
            "message_type": "FileMessage",
            "role": "user",
            "content": "### File: gone.txt (contents hidden)",
        })))
        .unwrap();
        assert_eq!(
            message,
            Message::text(Role::User, "### File: gone.txt (contents hidden)")
        );

        let message = Message::from_map(object(json!({
            "message_type": "ImageMessage",
            "role": "assistant",
            "content": "kept",
            "image_content": TEST_IMAGE,
        })))
        .unwrap();
        assert_eq!(message, Message::text(Role::Assistant, "kept"));
    }

    #[test]
    fn file_entry_without_contents_is_loaded_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.txt");
        fs::write(&path, "late bound").unwrap();

        let message = Message::from_map(object(json!({
            "message_type": "FileMessage",
            "role": "user",
            "file_path": path.to_string_lossy(),
        })))
        .unwrap();
        match message.payload() {
            Payload::File { content, .. } => assert_eq!(content, "late bound"),
            other => panic!("expected file payload, got {other:?}"),
        }
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let err = Message::from_map(object(json!({"role": "narrator"}))).unwrap_err();
        assert!(matches!(err, MessageError::Invalid(_)));

        let err = Message::from_map(object(json!({"content": 42}))).unwrap_err();
        assert!(matches!(err, MessageError::Invalid(_)));

        assert!(matches!(
            Message::from_json("{not json").unwrap_err(),
            MessageError::Json(_)
        ));
    }

    #[test]
    fn serde_goes_through_map_form() {
        let message = Message::file_from_parts(Role::User, "a.txt", "body");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["message_type"], "FileMessage");
        let decoded: Message = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, message);
    }
}
