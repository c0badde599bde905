//! The interactive prompt.

use std::io::{self, BufRead, Write};

use crate::commands::{process_input, CommandResult};
use crate::core::conversation::ConversationError;
use crate::core::message::{Message, Role};
use crate::core::session::Session;

/// Read one message: lines up to the first empty line, or up to EOF.
/// Returns `None` at EOF when nothing was typed.
pub fn read_message<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut lines: Vec<String> = Vec::new();
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(if lines.is_empty() {
                None
            } else {
                Some(lines.join("\n"))
            });
        }

        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return Ok(Some(lines.join("\n")));
        }
        lines.push(line.to_string());
    }
}

/// Print a message the way the transcript is shown on screen.
pub fn print_message<W: Write>(output: &mut W, message: &Message, separator: &str) -> io::Result<()> {
    writeln!(output, "{}:\n", message.display_name())?;
    writeln!(output, "{}", message.content())?;
    writeln!(output, "\n{separator}")
}

/// Stream a completion to `output`, then print the separator.
pub async fn print_completion<W: Write>(
    session: &mut Session,
    output: &mut W,
    separator: &str,
) -> Result<(), ConversationError> {
    let header = format!("{}:\n", session.adapter().display_name());
    let _ = writeln!(output, "{header}");
    session
        .complete(|fragment| {
            let _ = write!(output, "{fragment}");
            let _ = output.flush();
        })
        .await?;
    let _ = writeln!(output, "\n\n{separator}");
    Ok(())
}

pub async fn run<R: BufRead, W: Write>(
    session: &mut Session,
    separator: &str,
    mut input: R,
    output: &mut W,
) -> io::Result<()> {
    loop {
        writeln!(output, "User:\n")?;
        output.flush()?;

        let Some(text) = read_message(&mut input)? else {
            break;
        };
        if text.trim().is_empty() {
            continue;
        }

        match process_input(session, &text) {
            CommandResult::ProcessAsMessage(text) => {
                if let Err(err) = session.push_message(Message::text(Role::User, text)) {
                    writeln!(output, "Unable to add message: {err}\n")?;
                    continue;
                }
                writeln!(output, "{separator}")?;
                request_completion(session, output, separator).await?;
            }
            CommandResult::RequestCompletion => {
                request_completion(session, output, separator).await?;
            }
            CommandResult::Notice(text) => writeln!(output, "{text}\n")?,
            CommandResult::Continue => {}
            CommandResult::Quit => break,
        }
    }
    Ok(())
}

async fn request_completion<W: Write>(
    session: &mut Session,
    output: &mut W,
    separator: &str,
) -> io::Result<()> {
    if let Err(err) = print_completion(session, output, separator).await {
        writeln!(output, "\n{err}\n")?;
    }
    Ok(())
}
