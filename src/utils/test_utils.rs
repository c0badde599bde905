use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::{json, Map, Value};

use crate::core::adapter::{AdapterError, AdapterRegistry};
use crate::core::config::Config;
use crate::core::message::{Message, Role};
use crate::core::session::Session;
use crate::core::transport::{ChatTransport, EventStream, ProviderRequest};

/// A 1x1 PNG.
pub const TEST_IMAGE: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABAQAAAAA3bvkkAAAACklEQVR4AWNgAAAAAgABc3UBGAAAAABJRU5ErkJggg==";

/// Records every request and answers each one with the same canned events.
pub struct MockTransport {
    events: Vec<Value>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockTransport {
    pub fn new(events: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            events,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ProviderRequest {
        self.requests()
            .pop()
            .expect("transport was never called")
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open_stream(&self, request: ProviderRequest) -> Result<EventStream, AdapterError> {
        self.requests.lock().unwrap().push(request);
        let events = self.events.clone();
        Ok(stream::iter(events.into_iter().map(Ok)).boxed())
    }
}

/// Split a reply into words and the whitespace runs between them, the way a
/// model streams tokens.
pub fn reply_tokens(reply: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for ch in reply.chars() {
        match tokens.last_mut() {
            Some(last) if last.chars().all(char::is_whitespace) == ch.is_whitespace() => {
                last.push(ch)
            }
            _ => tokens.push(ch.to_string()),
        }
    }
    tokens
}

pub fn openai_events(reply: &str) -> Vec<Value> {
    let mut events = vec![json!({"choices": [{"index": 0, "delta": {"role": "assistant"}}]})];
    events.extend(
        reply_tokens(reply)
            .into_iter()
            .map(|token| json!({"choices": [{"index": 0, "delta": {"content": token}}]})),
    );
    events.push(json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}));
    events
}

pub fn anthropic_events(reply: &str) -> Vec<Value> {
    let mut events = vec![
        json!({"type": "message_start", "message": {"id": "msg_test", "role": "assistant"}}),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        json!({"type": "ping"}),
    ];
    events.extend(reply_tokens(reply).into_iter().map(|token| {
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": token}})
    }));
    events.push(json!({"type": "content_block_stop", "index": 0}));
    events.push(json!({"type": "message_stop"}));
    events
}

pub fn ollama_events(reply: &str) -> Vec<Value> {
    let mut events: Vec<Value> = reply_tokens(reply)
        .into_iter()
        .map(|token| {
            json!({"model": "test", "message": {"role": "assistant", "content": token}, "done": false})
        })
        .collect();
    events.push(
        json!({"model": "test", "message": {"role": "assistant", "content": ""}, "done": true}),
    );
    events
}

pub fn assistant_options() -> Map<String, Value> {
    let mut options = Map::new();
    options.insert("model".to_string(), json!("gemma3"));
    options.insert("temperature".to_string(), json!(0.4));
    options
}

fn assistant(content: &str) -> Message {
    Message::text(Role::Assistant, content)
        .with_adapter("ollama", assistant_options())
        .with_display_name("ollama / gemma3")
}

/// Conversation fixtures: an optional system prompt followed by any mix of
/// a plain text exchange, a file exchange and an image exchange.
pub fn test_messages(system: bool, text: bool, file: bool, image: bool) -> Vec<Message> {
    let mut messages = Vec::new();
    if system {
        messages.push(Message::text(Role::System, "You are an assistant."));
    }
    if text {
        messages.push(assistant("Hello, world!"));
        messages.push(Message::text(Role::User, "How are you?"));
        messages.push(assistant("I am fine, thank you!"));
    }
    if file {
        messages.push(Message::file_from_parts(
            Role::User,
            "test.txt",
            "i'm a file =3",
        ));
        messages.push(Message::text(Role::User, "What is this file?"));
        messages.push(assistant("What a lovely file!"));
    }
    if image {
        messages.push(Message::image_from_parts(
            Role::User,
            "test.png",
            TEST_IMAGE,
            Some("image/png".to_string()),
        ));
        messages.push(Message::text(Role::User, "What is this image?"));
        messages.push(assistant("What a lovely image!"));
    }
    messages
}

/// A session on the OpenAI adapter whose transport replies "Hello there".
pub fn create_test_session() -> Session {
    let registry = AdapterRegistry::with_transport(MockTransport::new(openai_events("Hello there")));
    Session::new(
        registry,
        Config::default(),
        "openai",
        vec!["model=gpt-4o".to_string()],
    )
    .unwrap()
}

#[test]
fn reply_tokens_keep_whitespace_runs() {
    assert_eq!(
        reply_tokens("this is  a test"),
        vec!["this", " ", "is", "  ", "a", " ", "test"]
    );
    assert!(reply_tokens("").is_empty());
}
