//! Line commands accepted on stdin while `streamwatch run` is active.

use crate::error::StreamwatchError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Fetch now.
    Refresh,
    /// Show the current listing.
    Show,
    /// Show streams that went offline.
    History,
    /// Switch category.
    Game(String),
    /// Change the update interval (duration tokens such as `15m`).
    Interval(String),
    /// Replace the title filter. Several words are joined as alternatives.
    Filter(String),
    /// Number of streams to display.
    ListSize(usize),
    AutoUpdate(bool),
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  refresh               fetch now
  show                  print the current listing
  history               print streams that went offline
  game <name>           switch category
  interval <duration>   e.g. 'interval 15m' or 'interval 1h 30m'
  filter <regex>...     title filter; several words match any of them
  listsize <n>          number of streams to display
  auto on|off           toggle automatic updates
  help                  this text
  quit                  save and exit";

fn usage(text: &str) -> StreamwatchError {
    StreamwatchError::ValidationError(format!("usage: {text}"))
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, StreamwatchError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "refresh" | "update" => ConsoleCommand::Refresh,
        "show" | "list" => ConsoleCommand::Show,
        "history" => ConsoleCommand::History,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "game" => {
            if rest.is_empty() {
                return Err(usage("game <name>"));
            }
            ConsoleCommand::Game(rest.to_string())
        }
        "interval" => {
            if rest.is_empty() {
                return Err(usage("interval <duration>"));
            }
            ConsoleCommand::Interval(rest.to_string())
        }
        "filter" => {
            let words: Vec<&str> = rest.split_whitespace().collect();
            if words.is_empty() {
                return Err(usage("filter <regex>..."));
            }
            ConsoleCommand::Filter(words.join("|"))
        }
        "listsize" => {
            let size = rest.parse().map_err(|_| usage("listsize <n>"))?;
            ConsoleCommand::ListSize(size)
        }
        "auto" => match rest.to_lowercase().as_str() {
            "on" | "true" => ConsoleCommand::AutoUpdate(true),
            "off" | "false" => ConsoleCommand::AutoUpdate(false),
            _ => return Err(usage("auto on|off")),
        },
        other => {
            return Err(StreamwatchError::ValidationError(format!(
                "unknown command '{other}', type 'help'"
            )))
        }
    };
    Ok(Some(command))
}
