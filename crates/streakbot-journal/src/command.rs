//! Chat command parsing.
//!
//! Commands are recognised with the configured prefix (`$logday`) or with a
//! slash (`/logday`, `/logday@streak_bot`), so the same parser serves both
//! prefix-style and slash-style platforms.

use thiserror::Error;

/// Default number of entries shown by `getlogs` without an argument.
pub const DEFAULT_LOG_COUNT: usize = 10;

/// A recognised chat command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start collecting today's log.
    LogDay,
    /// Show history; the limit is already validated (`0` means all).
    GetLogs(Result<usize, ArgError>),
    /// Show usage.
    Help,
}

/// Rejected `getlogs` argument.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("argument is not a number")]
    NotANumber,
    #[error("argument is negative")]
    Negative,
    #[error("too many arguments")]
    TooMany,
}

/// Parses commands for one prefix.
#[derive(Clone, Debug)]
pub struct CommandParser {
    prefix: String,
    default_limit: usize,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            default_limit: DEFAULT_LOG_COUNT,
        }
    }

    /// Limit used by `getlogs` without an argument.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// How a command is written with this parser's prefix, e.g. `$logday`.
    pub fn spelled(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Parse `text` as a command. Returns `None` for ordinary chat text.
    pub fn parse(&self, text: &str) -> Option<Command> {
        let text = text.trim();
        let body = if !self.prefix.is_empty() && text.starts_with(self.prefix.as_str()) {
            &text[self.prefix.len()..]
        } else if let Some(rest) = text.strip_prefix('/') {
            rest
        } else {
            return None;
        };

        let mut words = body.split_whitespace();
        let head = words.next()?;
        // Slash commands in group chats carry the bot name: /getlogs@streak_bot
        let name = head.split('@').next().unwrap_or(head);
        let args: Vec<&str> = words.collect();

        if name.eq_ignore_ascii_case("logday") {
            Some(Command::LogDay)
        } else if name.eq_ignore_ascii_case("getlogs") {
            Some(Command::GetLogs(self.parse_limit(&args)))
        } else if name.eq_ignore_ascii_case("help") || name.eq_ignore_ascii_case("start") {
            Some(Command::Help)
        } else {
            None
        }
    }

    fn parse_limit(&self, args: &[&str]) -> Result<usize, ArgError> {
        match args {
            [] => Ok(self.default_limit),
            [arg] => parse_count(arg),
            _ => Err(ArgError::TooMany),
        }
    }
}

/// Parse a `getlogs` count. Counts too large for `usize` mean "everything".
fn parse_count(arg: &str) -> Result<usize, ArgError> {
    match arg.parse::<i64>() {
        Ok(n) if n < 0 => Err(ArgError::Negative),
        Ok(n) => Ok(usize::try_from(n).unwrap_or(usize::MAX)),
        // Out of i64 range but still an integer.
        Err(_) => match arg.strip_prefix('-') {
            Some(digits) if all_digits(digits) => Err(ArgError::Negative),
            _ if all_digits(arg.strip_prefix('+').unwrap_or(arg)) => Ok(usize::MAX),
            _ => Err(ArgError::NotANumber),
        },
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Convenience wrapper for a one-off parse with the default limit.
pub fn parse_command(text: &str, prefix: &str) -> Option<Command> {
    CommandParser::new(prefix).parse(text)
}
