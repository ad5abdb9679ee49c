//! Terminal input module (client-facing).
//!
//! Maps `crossterm` key events to edits of the player's input line, and
//! validates what the player typed: integer answers through [`IntPrompt`] and
//! line commands through [`parse_command`].

pub mod command;
pub mod line;
pub mod map;
pub mod prompt;

pub use terminal_monopoly_types as types;

pub use command::{parse_command, CommandError, PlayerCommand};
pub use line::{LineBuffer, MAX_LINE_LEN};
pub use map::{map_key, should_quit, InputAction};
pub use prompt::{IntPrompt, InvalidInput, PromptAnswer, INVALID_MESSAGE};
