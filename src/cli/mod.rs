//! Command-line interface parsing and handling
//!
//! Message arguments (`-s`, `-a`, `-u`, `-f`, `-i`, `-c`) may be mixed and
//! repeated; they are added to the conversation in the order they appear on
//! the command line.

pub mod help;
pub mod repl;

use std::env;
use std::error::Error;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::adapter::AdapterRegistry;
use crate::core::config::Config;
use crate::core::conversation::{parse_transcript, DEFAULT_SYSTEM_PROMPT};
use crate::core::message::{Message, Role};
use crate::core::session::Session;
use crate::utils::path::normalize_path;

pub const DEFAULT_ADAPTER: &str = "openai";

/// Filter directives for diagnostics, e.g. `LLMCLI_LOG=llmcli=debug`.
pub const LOG_FILTER_VAR: &str = "LLMCLI_LOG";

#[derive(Parser, Debug)]
#[command(name = "llmcli", version)]
#[command(about = "Chat with OpenAI, Anthropic and Ollama models from the terminal")]
#[command(
    long_about = "llmcli lets you converse with several LLM backends, mixing text, files and \
images in one conversation, with optional persistence to a JSON transcript. It runs \
interactively by default; use -n to get a single completion and exit."
)]
pub struct Args {
    /// Add a system prompt message. If none is given, a default system prompt is used
    #[arg(short = 's', long, value_name = "MESSAGE")]
    pub system: Vec<String>,

    /// Add an assistant response message
    #[arg(short = 'a', long, value_name = "MESSAGE")]
    pub assistant: Vec<String>,

    /// Add a user prompt message
    #[arg(short = 'u', long, value_name = "MESSAGE")]
    pub user: Vec<String>,

    /// Add a user prompt message from a file
    #[arg(short = 'f', long, value_name = "FILENAME")]
    pub file: Vec<String>,

    /// Add a user prompt message from an image
    #[arg(short = 'i', long, value_name = "FILENAME")]
    pub image: Vec<String>,

    /// Load a previous conversation from a file (see --log-file-json)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub conversation: Vec<String>,

    /// Don't add a default system prompt if none is present
    #[arg(short = 'd', long)]
    pub no_system_prompt: bool,

    /// Identifier of the API adapter to use (see Adapters below) [default: openai]
    #[arg(short = 'p', long, value_name = "IDENTIFIER")]
    pub api: Option<String>,

    /// API option, in the format key=value. May be used multiple times
    #[arg(short = 'o', long = "api-options", value_name = "OPTION")]
    pub api_options: Vec<String>,

    /// Get a completion and exit instead of starting interactive mode
    #[arg(short = 'n', long)]
    pub non_interactive: bool,

    /// Write a JSON transcript of the conversation to a file
    #[arg(short = 'j', long, value_name = "FILE")]
    pub log_file_json: Option<String>,

    /// Get an assistant response immediately, before entering interactive mode
    #[arg(short = 'g', long)]
    pub immediate: bool,

    /// Separator printed between messages
    #[arg(short = 'x', long, value_name = "SEPARATOR", allow_hyphen_values = true)]
    pub separator: Option<String>,

    /// Don't print the system prompt or the messages given on the command line
    #[arg(short = 'q', long)]
    pub no_intro: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageArgKind {
    System,
    Assistant,
    User,
    File,
    Image,
    Conversation,
}

impl MessageArgKind {
    const ALL: [(MessageArgKind, &'static str); 6] = [
        (MessageArgKind::System, "system"),
        (MessageArgKind::Assistant, "assistant"),
        (MessageArgKind::User, "user"),
        (MessageArgKind::File, "file"),
        (MessageArgKind::Image, "image"),
        (MessageArgKind::Conversation, "conversation"),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArg {
    pub kind: MessageArgKind,
    pub value: String,
}

/// Message arguments in command-line order, recovered from clap's argument
/// indices.
pub fn ordered_message_args(matches: &ArgMatches) -> Vec<MessageArg> {
    let mut indexed: Vec<(usize, MessageArg)> = Vec::new();
    for (kind, id) in MessageArgKind::ALL {
        let (Some(values), Some(indices)) = (matches.get_many::<String>(id), matches.indices_of(id))
        else {
            continue;
        };
        for (index, value) in indices.zip(values) {
            indexed.push((
                index,
                MessageArg {
                    kind,
                    value: value.clone(),
                },
            ));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, arg)| arg).collect()
}

#[derive(Debug)]
pub struct MissingFile(pub String);

impl std::fmt::Display for MissingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "File {} does not exist", self.0)
    }
}

impl Error for MissingFile {}

/// What a message argument refers to after `@` resolution.
#[derive(Debug, PartialEq, Eq)]
enum ArgContent {
    Inline(String),
    FromFile { path: String, content: String },
    MissingFile(String),
}

fn resolve_arg_content(value: &str, stdin: &mut dyn Read) -> io::Result<ArgContent> {
    let Some(reference) = value.strip_prefix('@') else {
        return Ok(ArgContent::Inline(value.to_string()));
    };

    if reference == "-" {
        let mut content = String::new();
        stdin.read_to_string(&mut content)?;
        return Ok(ArgContent::FromFile {
            path: "-".to_string(),
            content,
        });
    }

    let path = normalize_path(reference);
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(ArgContent::FromFile { path, content }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(ArgContent::MissingFile(path)),
        Err(err) => Err(err),
    }
}

/// Build the initial messages from the ordered message arguments.
///
/// `-c` takes a transcript path. A missing transcript is skipped when it is
/// also the log file, so `-c log.json -j log.json` works on the first run.
pub fn messages_from_args(
    args: &[MessageArg],
    log_path: Option<&Path>,
    stdin: &mut dyn Read,
) -> Result<Vec<Message>, Box<dyn Error>> {
    let mut messages = Vec::new();

    for arg in args {
        if arg.kind == MessageArgKind::Conversation {
            let reference = arg.value.strip_prefix('@').unwrap_or(&arg.value);
            let transcript = if reference == "-" {
                let mut content = String::new();
                stdin.read_to_string(&mut content)?;
                content
            } else {
                let path = normalize_path(reference);
                if !Path::new(&path).exists() {
                    let is_log_target =
                        log_path.is_some_and(|log| Path::new(&normalize_path(log)) == Path::new(&path));
                    if is_log_target {
                        continue;
                    }
                    return Err(Box::new(MissingFile(path)));
                }
                std::fs::read_to_string(&path)?
            };
            messages.extend(parse_transcript(&transcript)?);
            continue;
        }

        let content = match resolve_arg_content(&arg.value, stdin)? {
            ArgContent::Inline(content) | ArgContent::FromFile { content, .. } => content,
            ArgContent::MissingFile(path) => return Err(Box::new(MissingFile(path))),
        };

        let message = match arg.kind {
            MessageArgKind::System => Message::text(Role::System, content),
            MessageArgKind::Assistant => Message::text(Role::Assistant, content),
            MessageArgKind::User => Message::text(Role::User, content),
            MessageArgKind::File => Message::file(Role::User, content.trim())?,
            MessageArgKind::Image => Message::image(Role::User, content.trim())?,
            MessageArgKind::Conversation => continue,
        };
        messages.push(message);
    }

    Ok(messages)
}

/// The separator printed between messages when none is configured.
pub fn default_separator() -> String {
    let columns = env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|columns| *columns > 4)
        .unwrap_or(80);
    format!("\n #{}#\n", "=".repeat(columns - 4))
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let matches = Args::command()
        .after_long_help(help::adapter_help())
        .get_matches();
    let args = Args::from_arg_matches(&matches)?;
    let message_args = ordered_message_args(&matches);

    let config = Config::load()?;
    let adapter_id = args
        .api
        .clone()
        .or_else(|| config.default_adapter.clone())
        .unwrap_or_else(|| DEFAULT_ADAPTER.to_string());
    let separator = args
        .separator
        .clone()
        .or_else(|| config.separator.clone())
        .unwrap_or_else(default_separator);
    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let mut session = Session::new(
        AdapterRegistry::new(),
        config,
        &adapter_id,
        args.api_options.clone(),
    )?;
    let log_path = args
        .log_file_json
        .as_deref()
        .map(|path| PathBuf::from(normalize_path(path)));
    session.conversation.set_log_path(log_path.clone());

    let interactive = !args.non_interactive;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if interactive {
        writeln!(out, "{}{separator}", help::INTERACTIVE_KEYS)?;
    }

    let messages = messages_from_args(&message_args, log_path.as_deref(), &mut io::stdin())?;
    session.conversation.extend(messages);
    if !args.no_system_prompt && !session.conversation.has_system_message() {
        session.conversation.insert_default_system_prompt(&system_prompt);
    }

    if interactive && !args.no_intro {
        for message in session.conversation.messages() {
            repl::print_message(&mut out, message, &separator)?;
        }
    }

    if !interactive {
        session
            .complete(|fragment| {
                let _ = write!(out, "{fragment}");
                let _ = out.flush();
            })
            .await?;
        return Ok(());
    }

    if args.immediate {
        repl::print_completion(&mut session, &mut out, &separator).await?;
    }
    session.conversation.save()?;

    repl::run(&mut session, &separator, io::stdin().lock(), &mut out).await?;
    Ok(())
}
