//! State of one chat run: the selected adapter, its options and the
//! conversation.

use std::sync::Arc;

use tracing::debug;

use crate::core::adapter::{parse_params, AdapterKind, AdapterRegistry, ApiAdapter, RegistryError};
use crate::core::config::Config;
use crate::core::conversation::{Conversation, ConversationError};
use crate::core::message::Message;

pub struct Session {
    registry: AdapterRegistry,
    config: Config,
    adapter_id: String,
    options: Vec<String>,
    adapter: Arc<dyn ApiAdapter>,
    pub conversation: Conversation,
}

impl Session {
    /// `options` are `key=value` tokens; they are applied after the
    /// configured options for the adapter, so they win on conflicts.
    pub fn new(
        mut registry: AdapterRegistry,
        config: Config,
        adapter_id: &str,
        options: Vec<String>,
    ) -> Result<Self, RegistryError> {
        let adapter = resolve(&mut registry, &config, adapter_id, &options)?;
        Ok(Self {
            registry,
            config,
            adapter_id: adapter_id.to_string(),
            options,
            adapter,
            conversation: Conversation::new(),
        })
    }

    pub fn adapter(&self) -> &Arc<dyn ApiAdapter> {
        &self.adapter
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Switch to another adapter, keeping the current options.
    pub fn switch_adapter(&mut self, adapter_id: &str) -> Result<(), RegistryError> {
        self.adapter = resolve(&mut self.registry, &self.config, adapter_id, &self.options)?;
        self.adapter_id = adapter_id.to_string();
        debug!(adapter = adapter_id, "switched adapter");
        Ok(())
    }

    /// Add a `key=value` option and rebuild the adapter with it.
    pub fn add_option(&mut self, token: &str) -> Result<(), RegistryError> {
        let mut options = self.options.clone();
        options.push(token.trim().to_string());
        self.adapter = resolve(&mut self.registry, &self.config, &self.adapter_id, &options)?;
        self.options = options;
        Ok(())
    }

    /// Remove every option setting `key`. Returns whether any was removed.
    pub fn remove_option(&mut self, key: &str) -> Result<bool, RegistryError> {
        let key = key.trim();
        let options: Vec<String> = self
            .options
            .iter()
            .filter(|token| option_key(token) != Some(key))
            .cloned()
            .collect();
        if options.len() == self.options.len() {
            return Ok(false);
        }
        self.adapter = resolve(&mut self.registry, &self.config, &self.adapter_id, &options)?;
        self.options = options;
        Ok(true)
    }

    /// Append a message and save the transcript.
    pub fn push_message(&mut self, message: Message) -> Result<(), ConversationError> {
        self.conversation.push(message);
        self.conversation.save()
    }

    /// Run a completion with the current adapter, then save the transcript.
    pub async fn complete(
        &mut self,
        on_fragment: impl FnMut(&str),
    ) -> Result<&Message, ConversationError> {
        let adapter = Arc::clone(&self.adapter);
        self.conversation
            .complete(adapter.as_ref(), on_fragment)
            .await?;
        self.conversation.save()?;
        let messages = self.conversation.messages();
        Ok(&messages[messages.len() - 1])
    }
}

fn option_key(token: &str) -> Option<&str> {
    token.split_once('=').map(|(key, _)| key.trim())
}

fn resolve(
    registry: &mut AdapterRegistry,
    config: &Config,
    adapter_id: &str,
    options: &[String],
) -> Result<Arc<dyn ApiAdapter>, RegistryError> {
    let configured = AdapterKind::find(adapter_id)
        .map(|kind| config.options_for(kind.id()))
        .unwrap_or(&[]);
    let tokens: Vec<&str> = configured
        .iter()
        .chain(options.iter())
        .map(String::as_str)
        .collect();
    registry.resolve(adapter_id, &parse_params(&tokens))
}
