//! Shared types module - screen geometry, terminal status and status updates
//!
//! This module defines the small vocabulary shared by the networking and the
//! terminal layers. All types are plain data with no external dependencies, so
//! they can be used on either side of the banker/player connection.
//!
//! # Screen Geometry
//!
//! The player screen is split into four quadrants ("terminals"):
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `SCREEN_WIDTH` | 150 | Usable columns across both quadrant columns |
//! | `SCREEN_HEIGHT` | 40 | Usable rows across both quadrant rows |
//! | `QUADRANT_COLS` | 75 | Columns inside one quadrant |
//! | `QUADRANT_ROWS` | 20 | Rows inside one quadrant |
//! | `INPUT_LINE` | 45 | Row of the player's input line |
//!
//! Coordinates are 1-based terminal coordinates (`x` = column, `y` = row), the
//! same numbers that appear inside an `ESC[y;xH` cursor sequence.
//!
//! # Status Updates
//!
//! When a player's terminal changes state, the banker is told with a one-line
//! message of the form `{player_id}{word} {terminal}`:
//!
//! ```
//! use terminal_monopoly_types::{StatusChange, StatusUpdate};
//!
//! let update = StatusUpdate::new(3, StatusChange::Busy, 2);
//! assert_eq!(update.to_string(), "3busy 2");
//!
//! let parsed: StatusUpdate = "3busy 2".parse().unwrap();
//! assert_eq!(parsed, update);
//! ```

use std::fmt;
use std::str::FromStr;

/// Usable width of the player screen in columns.
pub const SCREEN_WIDTH: u16 = 150;

/// Usable height of the player screen in rows.
pub const SCREEN_HEIGHT: u16 = 40;

/// Columns inside one terminal quadrant.
pub const QUADRANT_COLS: u16 = SCREEN_WIDTH / 2;

/// Rows inside one terminal quadrant.
pub const QUADRANT_ROWS: u16 = SCREEN_HEIGHT / 2;

/// Row of the player's input line.
pub const INPUT_LINE: u16 = 45;

/// Number of terminal quadrants on a player screen.
pub const TERMINAL_COUNT: usize = 4;

/// A 1-based terminal coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Offset by `(dx, dy)`, saturating at the edge of the coordinate space.
    pub const fn offset(self, dx: u16, dy: u16) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

/// Top-left content coordinate of a terminal quadrant.
///
/// Quadrants are numbered 1 (top-left), 2 (top-right), 3 (bottom-left) and
/// 4 (bottom-right). Each quadrant sits inside a one-character border that it
/// shares with its neighbours. Returns `None` for an index outside `1..=4`.
///
/// ```
/// use terminal_monopoly_types::{quadrant_origin, Point};
///
/// assert_eq!(quadrant_origin(1), Some(Point::new(2, 2)));
/// assert_eq!(quadrant_origin(4), Some(Point::new(78, 23)));
/// assert_eq!(quadrant_origin(5), None);
/// ```
pub const fn quadrant_origin(index: u8) -> Option<Point> {
    match index {
        1 => Some(Point::new(2, 2)),
        2 => Some(Point::new(QUADRANT_COLS + 3, 2)),
        3 => Some(Point::new(2, QUADRANT_ROWS + 3)),
        4 => Some(Point::new(QUADRANT_COLS + 3, QUADRANT_ROWS + 3)),
        _ => None,
    }
}

/// Local state of a terminal viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Active,
    Busy,
    Disabled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Busy => "BUSY",
            Status::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition requested on a terminal.
///
/// `Killed` ends in [`Status::Disabled`] like `Disabled`, but it is permanent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusChange {
    Active,
    Busy,
    Disabled,
    Killed,
}

impl StatusChange {
    /// Word used on the wire.
    pub fn word(&self) -> &'static str {
        match self {
            StatusChange::Active => "active",
            StatusChange::Busy => "busy",
            StatusChange::Disabled => "disabled",
            StatusChange::Killed => "kill",
        }
    }

    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "active" => Some(StatusChange::Active),
            "busy" => Some(StatusChange::Busy),
            "disabled" => Some(StatusChange::Disabled),
            "kill" => Some(StatusChange::Killed),
            _ => None,
        }
    }

    /// Status a terminal ends up in after this change.
    pub fn resulting_status(&self) -> Status {
        match self {
            StatusChange::Active => Status::Active,
            StatusChange::Busy => Status::Busy,
            StatusChange::Disabled | StatusChange::Killed => Status::Disabled,
        }
    }
}

/// Status report sent from a player to the banker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusUpdate {
    pub player_id: u32,
    pub change: StatusChange,
    pub terminal: u8,
}

impl StatusUpdate {
    pub fn new(player_id: u32, change: StatusChange, terminal: u8) -> Self {
        Self {
            player_id,
            change,
            terminal,
        }
    }
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", self.player_id, self.change.word(), self.terminal)
    }
}

/// Error returned when a message is not a [`StatusUpdate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    input: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a status update: {:?}", self.input)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for StatusUpdate {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseStatusError {
            input: s.to_string(),
        };

        let digits = s.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(err());
        }
        let player_id: u32 = s[..digits].parse().map_err(|_| err())?;

        let (word, terminal) = s[digits..].split_once(' ').ok_or_else(err)?;
        let change = StatusChange::from_word(word).ok_or_else(err)?;
        if terminal.is_empty() || !terminal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let terminal: u8 = terminal.parse().map_err(|_| err())?;

        Ok(Self {
            player_id,
            change,
            terminal,
        })
    }
}

/// Instruction from the banker to change one of a player's terminals: `{word} {terminal}`.
///
/// ```
/// use terminal_monopoly_types::{StatusChange, TerminalCommand};
///
/// let cmd: TerminalCommand = "kill 3".parse().unwrap();
/// assert_eq!(cmd, TerminalCommand::new(StatusChange::Killed, 3));
/// assert_eq!(cmd.to_string(), "kill 3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalCommand {
    pub change: StatusChange,
    pub terminal: u8,
}

impl TerminalCommand {
    pub fn new(change: StatusChange, terminal: u8) -> Self {
        Self { change, terminal }
    }
}

impl fmt::Display for TerminalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.change.word(), self.terminal)
    }
}

impl FromStr for TerminalCommand {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseStatusError {
            input: s.to_string(),
        };

        let (word, terminal) = s.split_once(' ').ok_or_else(err)?;
        let change = StatusChange::from_word(word).ok_or_else(err)?;
        if terminal.is_empty() || !terminal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let terminal: u8 = terminal.parse().map_err(|_| err())?;
        if quadrant_origin(terminal).is_none() {
            return Err(err());
        }
        Ok(Self { change, terminal })
    }
}

/// Destination for status updates, normally the primary connection to the banker.
pub trait StatusSink {
    type Error;

    fn send_status(&mut self, update: &StatusUpdate) -> Result<(), Self::Error>;
}

/// Collects updates in memory; used offline and in tests.
impl StatusSink for Vec<StatusUpdate> {
    type Error = std::convert::Infallible;

    fn send_status(&mut self, update: &StatusUpdate) -> Result<(), Self::Error> {
        self.push(*update);
        Ok(())
    }
}
