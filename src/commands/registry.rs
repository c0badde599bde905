use super::CommandResult;
use crate::core::session::Session;

pub type CommandHandler = fn(&mut Session, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "file",
        usage: "/file <path>",
        help: "Add a file to the conversation.",
        handler: super::handle_file,
    },
    Command {
        name: "image",
        usage: "/image <path>",
        help: "Add an image to the conversation.",
        handler: super::handle_image,
    },
    Command {
        name: "adapter",
        usage: "/adapter [identifier]",
        help: "List adapters, or switch to another one.",
        handler: super::handle_adapter,
    },
    Command {
        name: "option",
        usage: "/option <key=value>",
        help: "Set an adapter option.",
        handler: super::handle_option,
    },
    Command {
        name: "unset",
        usage: "/unset <key>",
        help: "Remove an adapter option.",
        handler: super::handle_unset,
    },
    Command {
        name: "options",
        usage: "/options",
        help: "Show the options in effect for the current adapter.",
        handler: super::handle_options,
    },
    Command {
        name: "log",
        usage: "/log [path]",
        help: "Write the JSON transcript to a file, or stop writing it.",
        handler: super::handle_log,
    },
    Command {
        name: "send",
        usage: "/send",
        help: "Get a response without adding a new message.",
        handler: super::handle_send,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Exit.",
        handler: super::handle_quit,
    },
];
