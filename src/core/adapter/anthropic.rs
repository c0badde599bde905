use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::options::{AdapterConfig, AdapterOption, AdapterParams};
use super::{file_block, image_caption, AdapterError, AdapterKind, ApiAdapter, Completion};
use crate::api::anthropic::{
    AnthropicMessage, ContentBlock, Delta, ImageSource, MessagesRequest, StreamEvent,
};
use crate::core::message::{Message, Payload, Role};
use crate::core::transport::{
    endpoint_url, extract_error_summary, ChatTransport, ProviderRequest, StreamFormat,
};

pub const ID: &str = "anthropic";
pub const HUMAN_NAME: &str = "Anthropic";
pub const EXTRA_HELP: &str =
    "By default, uses the Anthropic API key from the environment variable ANTHROPIC_API_KEY.";
pub const MASKED_OPTIONS: &[&str] = &["api_key"];

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const API_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

pub fn options() -> Vec<AdapterOption> {
    vec![
        AdapterOption::new("model", "Model", "Model ID used to generate the response.")
            .with_default(DEFAULT_MODEL),
        AdapterOption::new("api_key", "API Key", "Your Anthropic API key")
            .with_env_default("ANTHROPIC_API_KEY"),
        AdapterOption::new(
            "max_tokens",
            "Max Tokens",
            "The maximum number of tokens that can be generated in the chat completion",
        )
        .with_default(DEFAULT_MAX_TOKENS),
        AdapterOption::new(
            "temperature",
            "Temperature",
            "What sampling temperature to use, between 0 and 2.",
        ),
        AdapterOption::new(
            "top_p",
            "Top P",
            "An alternative to sampling with temperature, called nucleus sampling.",
        ),
    ]
}

pub struct AnthropicAdapter {
    config: AdapterConfig,
    base_url: String,
    transport: Arc<dyn ChatTransport>,
}

impl AnthropicAdapter {
    pub fn new(params: &AdapterParams, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            config: AdapterConfig::from_params(&options(), params),
            base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            transport,
        }
    }

    /// Build the Messages API request.
    ///
    /// System messages go to the top-level `system` field, the last one
    /// winning, and consecutive messages of the same role are merged since
    /// the API requires alternating roles.
    pub fn build_request(&self, messages: &[Message]) -> MessagesRequest {
        let mut system = None;
        let mut translated: Vec<AnthropicMessage> = Vec::new();

        for message in messages {
            if message.role() == Role::System {
                system = Some(message.content().to_string());
                continue;
            }

            let role = message.role().as_str();
            let blocks = content_blocks(message);
            match translated.last_mut() {
                Some(previous) if previous.role == role => previous.content.extend(blocks),
                _ => translated.push(AnthropicMessage {
                    role: role.to_string(),
                    content: blocks,
                }),
            }
        }

        MessagesRequest {
            model: self
                .config
                .get_str("model")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self
                .config
                .get_parsed("max_tokens")
                .unwrap_or(DEFAULT_MAX_TOKENS),
            messages: translated,
            system: system.filter(|prompt| !prompt.is_empty()),
            stream: true,
            temperature: self.config.get_f64("temperature"),
            top_p: self.config.get_f64("top_p"),
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("anthropic-version".to_string(), API_VERSION.to_string())];
        if let Some(api_key) = self.config.get_str("api_key") {
            headers.push(("x-api-key".to_string(), api_key));
        }
        headers
    }
}

fn content_blocks(message: &Message) -> Vec<ContentBlock> {
    match message.payload() {
        Payload::Text => vec![ContentBlock::Text {
            text: message.content().to_string(),
        }],
        Payload::File { path, content } => vec![ContentBlock::Text {
            text: file_block(path, content),
        }],
        Payload::Image {
            path,
            content,
            mime_type,
        } => vec![
            ContentBlock::Text {
                text: image_caption(path),
            },
            ContentBlock::Image {
                source: ImageSource::base64(mime_type.as_str(), content.as_str()),
            },
        ],
    }
}

fn extract_fragment(event: &Value) -> Result<Option<String>, AdapterError> {
    match StreamEvent::deserialize(event) {
        Ok(StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        }) => Ok(Some(text)),
        Ok(StreamEvent::Error { error }) => {
            let wrapped = serde_json::json!({ "error": error });
            let summary = extract_error_summary(&wrapped).unwrap_or_else(|| error.to_string());
            Err(AdapterError::Provider(summary))
        }
        Ok(_) | Err(_) => Ok(None),
    }
}

#[async_trait]
impl ApiAdapter for AnthropicAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Anthropic
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    async fn get_completion(&self, messages: &[Message]) -> Result<Completion, AdapterError> {
        let request = self.build_request(messages);
        let events = self
            .transport
            .open_stream(ProviderRequest {
                url: endpoint_url(&self.base_url, "messages"),
                headers: self.headers(),
                body: serde_json::to_value(&request)?,
                format: StreamFormat::ServerSentEvents,
            })
            .await?;

        Ok(Completion::new(events, extract_fragment, self.response_message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::adapter::parse_params;
    use crate::utils::test_utils::{anthropic_events, test_messages, MockTransport, TEST_IMAGE};
    use futures_util::StreamExt;
    use serde_json::json;

    const TEST_PARAMS: &[&str] = &[
        "api_key=sk-ant-REDACTED",
        "model=claude-3-7-sonnet-latest",
        "temperature=1.7",
        "top_p=0.9",
    ];

    fn adapter_with(params: &[&str], reply: &str) -> (AnthropicAdapter, Arc<MockTransport>) {
        let transport = MockTransport::new(anthropic_events(reply));
        let adapter = AnthropicAdapter::new(&parse_params(params), transport.clone());
        (adapter, transport)
    }

    async fn sanity_checked(messages: &[Message]) -> Value {
        let (adapter, transport) = adapter_with(TEST_PARAMS, "this is a test");
        let mut completion = adapter.get_completion(messages).await.unwrap();
        assert_ne!(completion.message().content(), "this is a test");

        let mut streamed = String::new();
        while let Some(fragment) = completion.next().await {
            streamed.push_str(&fragment.unwrap());
        }
        assert_eq!(streamed, "this is a test");
        assert_eq!(completion.message().content(), "this is a test");

        let request = transport.last_request();
        assert!(request.url.ends_with("/messages"));
        assert!(request
            .headers
            .contains(&("anthropic-version".to_string(), API_VERSION.to_string())));
        assert!(request.headers.contains(&(
            "x-api-key".to_string(),
            "sk-ant-REDACTED".to_string()
        )));
        request.body
    }

    #[tokio::test]
    async fn text_conversation_diverts_system_prompt() {
        let mut messages = test_messages(true, true, false, false);
        messages.insert(3, Message::text(Role::User, "You are how?"));

        let body = sanity_checked(&messages).await;
        assert_eq!(
            body,
            json!({
                "model": "claude-3-7-sonnet-latest",
                "max_tokens": 1000,
                "system": "You are an assistant.",
                "stream": true,
                "temperature": 1.7,
                "top_p": 0.9,
                "messages": [
                    {"role": "assistant", "content": [{"type": "text", "text": "Hello, world!"}]},
                    {
                        "role": "user",
                        "content": [
                            {"type": "text", "text": "How are you?"},
                            {"type": "text", "text": "You are how?"},
                        ],
                    },
                    {"role": "assistant", "content": [{"type": "text", "text": "I am fine, thank you!"}]},
                ],
            })
        );
    }

    #[tokio::test]
    async fn image_is_merged_with_following_user_turn() {
        let body = sanity_checked(&test_messages(true, false, false, true)).await;
        assert_eq!(
            body["messages"],
            json!([
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "### IMAGE: test.png"},
                        {
                            "type": "image",
                            "source": {"type": "base64", "media_type": "image/png", "data": TEST_IMAGE},
                        },
                        {"type": "text", "text": "What is this image?"},
                    ],
                },
                {"role": "assistant", "content": [{"type": "text", "text": "What a lovely image!"}]},
            ])
        );
        assert_eq!(body["max_tokens"], json!(1000));
    }

    #[tokio::test]
    async fn file_is_sent_as_fenced_text_block() {
        let body = sanity_checked(&test_messages(true, false, true, false)).await;
        assert_eq!(
            body["messages"][0]["content"],
            json!([
                {"type": "text", "text": "### FILE: test.txt\n\n```\ni'm a file =3\n```"},
                {"type": "text", "text": "What is this file?"},
            ])
        );
    }

    #[test]
    fn last_system_message_wins_and_is_not_kept() {
        let (adapter, _) = adapter_with(&[], "");
        let messages = vec![
            Message::text(Role::System, "first"),
            Message::text(Role::User, "hi"),
            Message::text(Role::System, "second"),
        ];
        let request = adapter.build_request(&messages);
        assert_eq!(request.system.as_deref(), Some("second"));
        assert_eq!(request.messages.len(), 1);

        let request = adapter.build_request(&[Message::text(Role::User, "hi")]);
        assert_eq!(request.system, None);
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let (adapter, _) = adapter_with(&[], "");
        let request = adapter.build_request(&[Message::text(Role::System, "")]);
        assert!(request.system.is_none());
        assert!(request.messages.is_empty());
    }

    #[test]
    fn malformed_max_tokens_falls_back_to_default() {
        let (adapter, _) = adapter_with(&["max_tokens=lots", "temperature=x"], "");
        let body = serde_json::to_value(adapter.build_request(&[])).unwrap();
        assert_eq!(body["max_tokens"], json!(1000));
        assert!(body.get("temperature").is_none());

        let (adapter, _) = adapter_with(&["max_tokens=256"], "");
        assert_eq!(adapter.build_request(&[]).max_tokens, 256);
    }

    #[test]
    fn non_finite_floats_never_reach_the_request() {
        let (adapter, _) = adapter_with(&["temperature=NaN", "top_p=inf"], "");
        let body = serde_json::to_value(adapter.build_request(&[])).unwrap();
        assert!(body.get("temperature").is_none());
        assert!(body.get("top_p").is_none());
        assert!(!body.to_string().contains("null"));
    }

    #[test]
    fn extract_fragment_reads_text_deltas_only() {
        let text = json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hi"}});
        assert_eq!(extract_fragment(&text).unwrap().as_deref(), Some("Hi"));

        let json_delta = json!({"type": "content_block_delta", "index": 0, "delta": {"type": "input_json_delta", "partial_json": "{"}});
        assert_eq!(extract_fragment(&json_delta).unwrap(), None);

        let start = json!({"type": "message_start", "message": {"id": "msg_1"}});
        assert_eq!(extract_fragment(&start).unwrap(), None);

        let error = json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}});
        assert!(matches!(
            extract_fragment(&error),
            Err(AdapterError::Provider(message)) if message == "Overloaded"
        ));
    }
}
