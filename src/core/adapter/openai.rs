use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::options::{AdapterConfig, AdapterOption, AdapterParams};
use super::{
    contains_image, file_block, image_caption, AdapterError, AdapterKind, ApiAdapter, Completion,
    SAFE_MAX_TOKENS,
};
use crate::api::openai::{
    ChatContent, ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl,
};
use crate::core::message::{Message, Payload};
use crate::core::transport::{
    endpoint_url, extract_error_summary, ChatTransport, ProviderRequest, StreamFormat,
};

pub const ID: &str = "openai";
pub const HUMAN_NAME: &str = "OpenAI";
pub const EXTRA_HELP: &str =
    "By default, uses the OpenAI API key from the environment variable OPENAI_API_KEY.";
pub const MASKED_OPTIONS: &[&str] = &["api_key"];

pub const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub fn options() -> Vec<AdapterOption> {
    vec![
        AdapterOption::new("model", "Model", "Model ID used to generate the response.")
            .with_default(DEFAULT_MODEL),
        AdapterOption::new("api_key", "API Key", "Your OpenAI API key")
            .with_env_default("OPENAI_API_KEY"),
        AdapterOption::new(
            "max_tokens",
            "Max Tokens",
            "The maximum number of tokens that can be generated in the chat completion.",
        ),
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
        AdapterOption::new(
            "frequency_penalty",
            "Frequency Penalty",
            "Number between -2.0 and 2.0. Positive values penalize new tokens based on their existing frequency in the text so far.",
        ),
        AdapterOption::new(
            "presence_penalty",
            "Presence Penalty",
            "Number between -2.0 and 2.0. Positive values penalize new tokens based on whether they appear in the text so far.",
        ),
    ]
}

/// Chat Completions API adapter. Also works with OpenAI-compatible servers
/// through `OPENAI_BASE_URL`.
pub struct OpenAiAdapter {
    config: AdapterConfig,
    base_url: String,
    transport: Arc<dyn ChatTransport>,
}

impl OpenAiAdapter {
    pub fn new(params: &AdapterParams, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            config: AdapterConfig::from_params(&options(), params),
            base_url: env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            transport,
        }
    }

    pub fn build_request(&self, messages: &[Message]) -> ChatRequest {
        let mut max_tokens = self.config.get_parsed::<u32>("max_tokens");
        if max_tokens.is_none() && contains_image(messages) {
            debug!(max_tokens = SAFE_MAX_TOKENS, "image without max_tokens, applying safe cap");
            max_tokens = Some(SAFE_MAX_TOKENS);
        }

        ChatRequest {
            model: self
                .config
                .get_str("model")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            messages: messages.iter().map(translate).collect(),
            stream: true,
            max_tokens,
            temperature: self.config.get_f64("temperature"),
            top_p: self.config.get_f64("top_p"),
            frequency_penalty: self.config.get_f64("frequency_penalty"),
            presence_penalty: self.config.get_f64("presence_penalty"),
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        match self.config.get_str("api_key") {
            Some(api_key) => vec![("Authorization".to_string(), format!("Bearer {api_key}"))],
            None => Vec::new(),
        }
    }
}

fn translate(message: &Message) -> ChatMessage {
    let content = match message.payload() {
        Payload::Text => ChatContent::Text(message.content().to_string()),
        Payload::File { path, content } => ChatContent::Text(file_block(path, content)),
        Payload::Image {
            path,
            content,
            mime_type,
        } => ChatContent::Parts(vec![
            ContentPart::Text {
                text: image_caption(path),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{mime_type};base64,{content}"),
                },
            },
        ]),
    };

    ChatMessage {
        role: message.role().as_str().to_string(),
        content,
    }
}

fn extract_fragment(event: &Value) -> Result<Option<String>, AdapterError> {
    if event.get("error").is_some() {
        let summary = extract_error_summary(event).unwrap_or_else(|| event.to_string());
        return Err(AdapterError::Provider(summary));
    }

    let Ok(response) = ChatResponse::deserialize(event) else {
        return Ok(None);
    };
    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content))
}

#[async_trait]
impl ApiAdapter for OpenAiAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::OpenAi
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    async fn get_completion(&self, messages: &[Message]) -> Result<Completion, AdapterError> {
        let request = self.build_request(messages);
        let events = self
            .transport
            .open_stream(ProviderRequest {
                url: endpoint_url(&self.base_url, "chat/completions"),
                headers: self.headers(),
                body: serde_json::to_value(&request)?,
                format: StreamFormat::ServerSentEvents,
            })
            .await?;

        Ok(Completion::new(events, extract_fragment, self.response_message()))
    }
}
