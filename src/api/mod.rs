//! Request and stream-event payloads for each provider's chat API.
//!
//! Optional sampling parameters are `Option`s skipped during
//! serialization, so a parameter the user did not set never reaches the
//! provider and its own default applies.

pub mod anthropic;
pub mod ollama;
pub mod openai;
