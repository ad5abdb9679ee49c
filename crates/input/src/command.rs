//! Commands typed on the player's input line.

use thiserror::Error;

use crate::prompt::{IntPrompt, InvalidInput, PromptAnswer};
use crate::types::{StatusChange, TERMINAL_COUNT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Give terminal `n` the keyboard.
    Focus(u8),
    /// Change the status of a terminal.
    Status(StatusChange, u8),
    /// Send text to the banker.
    Send(String),
    /// Send text over the out-of-focus link.
    Oof(String),
    /// Switch colour theme.
    Theme(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: {0:?}")]
    Unknown(String),

    #[error("{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("bad terminal number: {0}")]
    BadTerminal(#[from] InvalidInput),
}

fn terminal_prompt() -> IntPrompt {
    IntPrompt::new(1, TERMINAL_COUNT as i64)
}

fn terminal_index(text: &str) -> Result<u8, CommandError> {
    match terminal_prompt().validate(text)? {
        // Range 1..=4 always fits.
        PromptAnswer::Value(n) => Ok(n as u8),
        PromptAnswer::Skip => Err(CommandError::MissingArgument("terminal")),
    }
}

/// Parse a typed line. Blank lines give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<PlayerCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let need = |name: &'static str| {
        if rest.is_empty() {
            Err(CommandError::MissingArgument(name))
        } else {
            Ok(rest)
        }
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "quit" | "exit" => PlayerCommand::Quit,
        "send" => PlayerCommand::Send(need("send")?.to_string()),
        "oof" => PlayerCommand::Oof(need("oof")?.to_string()),
        "theme" => PlayerCommand::Theme(need("theme")?.to_string()),
        "busy" => PlayerCommand::Status(StatusChange::Busy, terminal_index(need("busy")?)?),
        "enable" => PlayerCommand::Status(StatusChange::Active, terminal_index(need("enable")?)?),
        "disable" => {
            PlayerCommand::Status(StatusChange::Disabled, terminal_index(need("disable")?)?)
        }
        _ if rest.is_empty() && word.bytes().all(|b| b.is_ascii_digit()) => {
            PlayerCommand::Focus(terminal_index(word)?)
        }
        _ => return Err(CommandError::Unknown(line.to_string())),
    };
    Ok(Some(cmd))
}
