//! llmcli is a terminal chat client for several LLM backends.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the message model, the adapter contract and its provider
//!   implementations, the adapter registry, and the running conversation.
//! - [`api`] defines the request and stream-event payloads of each provider.
//! - [`commands`] implements slash-command parsing and execution for the
//!   interactive prompt.
//! - [`cli`] parses arguments, builds the initial conversation, and runs
//!   the interactive loop.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod utils;
