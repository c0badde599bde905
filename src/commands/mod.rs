//! Slash commands available at the interactive prompt.

mod registry;

pub use registry::{all_commands, CommandInvocation};

use std::path::PathBuf;

use crate::core::adapter::AdapterKind;
use crate::core::message::{Attachment, Role};
use crate::core::session::Session;
use crate::utils::path::normalize_path;

#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    /// Text to show the user; the conversation is unchanged or the change
    /// is already recorded.
    Notice(String),
    RequestCompletion,
    Quit,
    ProcessAsMessage(String),
}

pub fn process_input(session: &mut Session, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match registry::find_command(command_name) {
        Some(command) => {
            (command.handler)(session, CommandInvocation { args })
        }
        None => CommandResult::Notice(format!(
            "Unknown command: /{command_name}. Type /help for a list of commands."
        )),
    }
}

pub fn help_text() -> String {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or(0);
    let mut text = String::from("Commands:\n");
    for command in all_commands() {
        text.push_str(&format!("  {:<width$}  {}\n", command.usage, command.help));
    }
    text.push_str("\nAn empty line sends the message. Ctrl+D exits.");
    text
}

pub(super) fn handle_help(_session: &mut Session, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Notice(help_text())
}

fn add_attachment(session: &mut Session, attachment: Attachment, usage: &str) -> CommandResult {
    if attachment.path().as_os_str().is_empty() {
        return CommandResult::Notice(format!("Usage: {usage}"));
    }
    let message = match attachment.load() {
        Ok(message) => message,
        Err(err) => return CommandResult::Notice(format!("Unable to add message: {err}")),
    };
    let summary = message.content().to_string();
    match session.push_message(message) {
        Ok(()) => CommandResult::Notice(format!("Added {summary}")),
        Err(err) => CommandResult::Notice(format!("Added {summary}, but {err}")),
    }
}

pub(super) fn handle_file(session: &mut Session, invocation: CommandInvocation<'_>) -> CommandResult {
    add_attachment(
        session,
        Attachment::file(Role::User, invocation.args),
        "/file <path>",
    )
}

pub(super) fn handle_image(session: &mut Session, invocation: CommandInvocation<'_>) -> CommandResult {
    add_attachment(
        session,
        Attachment::image(Role::User, invocation.args),
        "/image <path>",
    )
}

pub(super) fn handle_adapter(session: &mut Session, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let current = session.adapter().kind();
        let mut text = String::from("Available adapters:\n");
        for kind in AdapterKind::ALL {
            let marker = if kind == current { "*" } else { " " };
            text.push_str(&format!("  {marker} {} ({})\n", kind.human_name(), kind.id()));
        }
        text.push_str("\nUse /adapter <identifier> to switch.");
        return CommandResult::Notice(text);
    }

    match session.switch_adapter(invocation.args) {
        Ok(()) => CommandResult::Notice(format!(
            "Using {}",
            session.adapter().display_name()
        )),
        Err(err) => CommandResult::Notice(err.to_string()),
    }
}

pub(super) fn handle_option(session: &mut Session, invocation: CommandInvocation<'_>) -> CommandResult {
    if !invocation.args.contains('=') {
        return CommandResult::Notice("Usage: /option <key=value>".to_string());
    }
    match session.add_option(invocation.args) {
        Ok(()) => CommandResult::Notice(format!(
            "Set {} (now using {})",
            invocation.args,
            session.adapter().display_name()
        )),
        Err(err) => CommandResult::Notice(err.to_string()),
    }
}

pub(super) fn handle_unset(session: &mut Session, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return CommandResult::Notice("Usage: /unset <key>".to_string());
    }
    match session.remove_option(invocation.args) {
        Ok(true) => CommandResult::Notice(format!("Removed {}", invocation.args)),
        Ok(false) => CommandResult::Notice(format!("No option named {} is set", invocation.args)),
        Err(err) => CommandResult::Notice(err.to_string()),
    }
}

pub(super) fn handle_options(session: &mut Session, _invocation: CommandInvocation<'_>) -> CommandResult {
    let adapter = session.adapter();
    let mut text = format!("{}:\n", adapter.display_name());
    let masked = adapter.masked_config();
    if masked.is_empty() {
        text.push_str("  (no options set)\n");
    }
    for (key, value) in &masked {
        let value = match value.as_str() {
            Some(raw) => raw.to_string(),
            None => value.to_string(),
        };
        text.push_str(&format!("  {key} = {value}\n"));
    }
    if !session.options().is_empty() {
        text.push_str(&format!("\nFrom this session: {}", session.options().join(", ")));
    }
    CommandResult::Notice(text.trim_end().to_string())
}

pub(super) fn handle_log(session: &mut Session, invocation: CommandInvocation<'_>) -> CommandResult {
    let path = if invocation.args.is_empty() {
        None
    } else {
        Some(PathBuf::from(normalize_path(invocation.args)))
    };
    let notice = match &path {
        Some(path) => format!("Logging to {}", path.display()),
        None => "Logging disabled".to_string(),
    };
    session.conversation.set_log_path(path);

    match session.conversation.save() {
        Ok(()) => CommandResult::Notice(notice),
        Err(err) => CommandResult::Notice(format!("Logfile error: {err}")),
    }
}

pub(super) fn handle_send(_session: &mut Session, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::RequestCompletion
}

pub(super) fn handle_quit(_session: &mut Session, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}
