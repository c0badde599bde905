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
use crate::api::ollama::{ChatMessage, ChatRequest, ChatResponse, ModelOptions};
use crate::core::message::{Message, Payload};
use crate::core::transport::{endpoint_url, ChatTransport, ProviderRequest, StreamFormat};

pub const ID: &str = "ollama";
pub const HUMAN_NAME: &str = "Ollama";
pub const EXTRA_HELP: &str = "By default, uses an Ollama instance running on localhost. For remote instances, set the OLLAMA_HOST environment variable.";
pub const MASKED_OPTIONS: &[&str] = &[];

pub const DEFAULT_MODEL: &str = "llama3.1:8b";
const DEFAULT_HOST: &str = "http://localhost:11434";

pub fn options() -> Vec<AdapterOption> {
    vec![
        AdapterOption::new("model", "Model", "Model ID used to generate the response.")
            .with_default(DEFAULT_MODEL),
        AdapterOption::new(
            "mirostat",
            "Mirostat",
            "Enable Mirostat sampling for controlling perplexity.",
        ),
        AdapterOption::new(
            "mirostat_eta",
            "Mirostat Eta",
            "Influences how quickly the algorithm responds to feedback from the generated text.",
        ),
        AdapterOption::new(
            "mirostat_tau",
            "Mirostat Tau",
            "Controls the balance between coherence and diversity of the output.",
        ),
        AdapterOption::new(
            "num_ctx",
            "Context Size",
            "Sets the size of the context window used to generate the next token.",
        ),
        AdapterOption::new(
            "repeat_last_n",
            "Repeat Last N",
            "Sets how far back for the model to look back to prevent repetition.",
        ),
        AdapterOption::new(
            "repeat_penalty",
            "Repeat Penalty",
            "Sets how strongly to penalize repetitions.",
        ),
        AdapterOption::new(
            "temperature",
            "Temperature",
            "The temperature of the model; higher values increase creativity.",
        ),
        AdapterOption::new(
            "seed",
            "Seed",
            "Sets the random number seed to use for generation.",
        ),
        AdapterOption::new(
            "num_predict",
            "Max Tokens",
            "Maximum number of tokens to predict when generating text.",
        ),
        AdapterOption::new(
            "top_k",
            "Top-K",
            "Reduces the probability of generating nonsense by limiting token selection.",
        ),
        AdapterOption::new(
            "top_p",
            "Top-P",
            "Controls diversity via nucleus sampling; higher values yield more diverse text.",
        ),
    ]
}

/// Adapter for a local or remote Ollama server (`OLLAMA_HOST`).
pub struct OllamaAdapter {
    config: AdapterConfig,
    host: String,
    transport: Arc<dyn ChatTransport>,
}

impl OllamaAdapter {
    pub fn new(params: &AdapterParams, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            config: AdapterConfig::from_params(&options(), params),
            host: env::var("OLLAMA_HOST")
                .ok()
                .map(|host| normalize_host(&host))
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            transport,
        }
    }

    pub fn build_request(&self, messages: &[Message]) -> ChatRequest {
        let config = &self.config;
        let mut options = ModelOptions {
            mirostat: config.get_parsed("mirostat"),
            mirostat_eta: config.get_f64("mirostat_eta"),
            mirostat_tau: config.get_f64("mirostat_tau"),
            num_ctx: config.get_parsed("num_ctx"),
            repeat_last_n: config.get_parsed("repeat_last_n"),
            repeat_penalty: config.get_f64("repeat_penalty"),
            temperature: config.get_f64("temperature"),
            seed: config.get_parsed("seed"),
            num_predict: config.get_parsed("num_predict"),
            top_k: config.get_parsed("top_k"),
            top_p: config.get_f64("top_p"),
        };
        if options.num_predict.is_none() && contains_image(messages) {
            debug!(num_predict = SAFE_MAX_TOKENS, "image without num_predict, applying safe cap");
            options.num_predict = Some(i64::from(SAFE_MAX_TOKENS));
        }

        ChatRequest {
            model: config
                .get_str("model")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            messages: messages.iter().map(translate).collect(),
            options,
            stream: true,
        }
    }
}

/// `OLLAMA_HOST` may be a bare `host:port`.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

fn translate(message: &Message) -> ChatMessage {
    let role = message.role().as_str().to_string();
    match message.payload() {
        Payload::Text => ChatMessage {
            role,
            content: message.content().to_string(),
            images: None,
        },
        Payload::File { path, content } => ChatMessage {
            role,
            content: file_block(path, content),
            images: None,
        },
        Payload::Image { path, content, .. } => ChatMessage {
            role,
            content: image_caption(path),
            images: Some(vec![content.clone()]),
        },
    }
}

fn extract_fragment(event: &Value) -> Result<Option<String>, AdapterError> {
    let Ok(response) = ChatResponse::deserialize(event) else {
        return Ok(None);
    };
    if let Some(error) = response.error {
        return Err(AdapterError::Provider(error));
    }
    Ok(response.message.map(|message| message.content))
}

#[async_trait]
impl ApiAdapter for OllamaAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Ollama
    }

    fn config(&self) -> &AdapterConfig {
        &self.config
    }

    async fn get_completion(&self, messages: &[Message]) -> Result<Completion, AdapterError> {
        let request = self.build_request(messages);
        let events = self
            .transport
            .open_stream(ProviderRequest {
                url: endpoint_url(&self.host, "api/chat"),
                headers: Vec::new(),
                body: serde_json::to_value(&request)?,
                format: StreamFormat::JsonLines,
            })
            .await?;

        Ok(Completion::new(events, extract_fragment, self.response_message()))
    }
}
