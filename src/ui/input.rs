use thiserror::Error;

/// A product reference typed by the user: a 1-based list position or an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Index(usize),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Refresh(Option<String>),
    Add(String),
    Select(Target),
    Delete(Target),
    Retry(Target),
    Info(Target),
    Sessions,
    History(String),
    Sources,
    Theme,
    Help,
    Quit,
    Ask(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Usage: {0}")]
    MissingArgument(&'static str),
}

pub const HELP: &str = "\
Commands:
  list                  show products
  refresh [status|text] reload products, optionally filtered
  add <url>             submit a product URL for processing
  select <n|id>         chat about a ready product
  delete <n|id>         delete a product
  retry <n|id>          retry a failed product
  info <n|id>           show product details
  sessions              list previous conversations for the selected product
  history <session>     show a previous conversation
  sources               show the sources behind the last answer
  theme                 toggle dark/light theme
  help                  show this help
  quit                  exit
Anything else is sent as a question about the selected product.";

/// Returns `Ok(None)` for blank input.
pub fn parse_command(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());

    let command = match word.to_ascii_lowercase().as_str() {
        "list" | "ls" => Command::List,
        "refresh" => Command::Refresh(arg),
        "add" => Command::Add(arg.ok_or(ParseError::MissingArgument("add <url>"))?),
        "select" | "open" => Command::Select(target(rest, "select <n|id>")?),
        "delete" | "rm" => Command::Delete(target(rest, "delete <n|id>")?),
        "retry" => Command::Retry(target(rest, "retry <n|id>")?),
        "info" => Command::Info(target(rest, "info <n|id>")?),
        "sessions" => Command::Sessions,
        "history" => Command::History(arg.ok_or(ParseError::MissingArgument("history <session>"))?),
        "sources" => Command::Sources,
        "theme" => Command::Theme,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Ask(line.to_string()),
    };
    Ok(Some(command))
}

fn target(arg: &str, usage: &'static str) -> Result<Target, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingArgument(usage));
    }
    Ok(match arg.parse::<usize>() {
        Ok(index) if index > 0 => Target::Index(index),
        _ => Target::Id(arg.to_string()),
    })
}
