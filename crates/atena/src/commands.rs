//! Parsing lines typed at the prompt.

use std::path::PathBuf;

/// What a line typed at the prompt asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Send this text as a message.
    Send(String),
    /// Start a new conversation.
    New,
    /// List saved conversations.
    List,
    /// Open the conversation at this position of the list.
    Load(usize),
    /// Delete the conversation at this position of the list.
    Delete(usize),
    /// Delete every conversation.
    Clear,
    /// Attach these files to the next message.
    Attach(Vec<PathBuf>),
    /// Drop every pending attachment.
    Detach,
    /// Show the available commands.
    Help,
    /// Leave.
    Quit,
}

/// A line that looks like a command but isn't a valid one.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// No command has this name.
    #[error("unknown command `/{0}`, try /help")]
    Unknown(String),
    /// The command needs an argument.
    #[error("`/{0}` needs {1}")]
    MissingArgument(&'static str, &'static str),
    /// The argument is not a list position.
    #[error("`{0}` is not a conversation number")]
    InvalidIndex(String),
}

/// Help text listing every command.
pub const HELP: &str = "\
/new             start a new conversation
/list            list saved conversations
/load <n>        open conversation n
/delete <n>      delete conversation n
/clear           delete every conversation
/attach <path>.. attach images to the next message
/detach          drop pending attachments
/help            show this help
/quit            leave";

/// Parses one line.
///
/// Returns `Ok(None)` for a blank line. Lines not starting with `/` are
/// messages; a leading `//` sends the rest of the line literally.
/// Conversation numbers start at 1 as shown by `/list`, and are returned
/// as zero-based positions.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_owned())));
    };
    if rest.starts_with('/') {
        return Ok(Some(Command::Send(rest.to_owned())));
    }

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let command = match name {
        "new" => Command::New,
        "list" | "ls" => Command::List,
        "load" | "open" => Command::Load(index(words.next(), "load")?),
        "delete" | "rm" => Command::Delete(index(words.next(), "delete")?),
        "clear" => Command::Clear,
        "attach" => {
            let paths: Vec<_> = words.map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err(ParseError::MissingArgument("attach", "a file path"));
            }
            Command::Attach(paths)
        }
        "detach" => Command::Detach,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(ParseError::Unknown(name.to_owned())),
    };
    Ok(Some(command))
}

fn index(word: Option<&str>, command: &'static str) -> Result<usize, ParseError> {
    let word =
        word.ok_or(ParseError::MissingArgument(command, "a conversation number"))?;
    match word.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ParseError::InvalidIndex(word.to_owned())),
    }
}
