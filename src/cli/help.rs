use crate::core::adapter::AdapterKind;

pub const INTERACTIVE_KEYS: &str =
    "Press Enter on an empty line to send; type /help for commands; Ctrl+D to exit.";

/// The ADAPTERS section of `--help`: every adapter with its options and
/// their defaults.
pub fn adapter_help() -> String {
    let mut text = String::from("Adapters:\n");
    for kind in AdapterKind::ALL {
        text.push_str(&format!("  {} ({})\n", kind.human_name(), kind.id()));
        text.push_str("    Options:\n");
        for option in kind.options() {
            match option.help_default() {
                Some(default) => text.push_str(&format!(
                    "    - {:<22} {} (default: {})\n",
                    option.name, option.description, default
                )),
                None => text.push_str(&format!(
                    "    - {:<22} {}\n",
                    option.name, option.description
                )),
            }
        }
        text.push('\n');
        text.push_str(&format!("    {}\n\n", kind.extra_help()));
    }
    text.push_str(
        "Message arguments are added to the conversation in the order given. \
A value of @path reads the message from a file, @- from standard input.\n\n",
    );
    text.push_str(&format!("Interactive mode: {INTERACTIVE_KEYS}\n\n"));
    text.push_str("TIP: Try `llmcli -c mylog.json -j mylog.json` to persist conversations between sessions.");
    text
}
