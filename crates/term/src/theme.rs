//! Colour themes.
//!
//! A [`Theme`] maps each logical [`Role`] to a terminal colour. Screens own
//! exactly one theme and can swap it at runtime; nothing stores raw escape
//! codes, so a swap recolours everything on the next redraw.
//!
//! | Theme | Colours |
//! |-------|---------|
//! | `standard` | 24-bit RGB |
//! | `compat` | 8-bit palette, for terminals without true colour |
//! | `plain` | none |

use std::fmt;

use crossterm::style::{Color, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::Command;

/// Logical colour role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Brown,
    LightBlue,
    Rouge,
    Orange,
    Red,
    Yellow,
    Green,
    Blue,
    White,
    Cyan,
    LightGray,
    LightBlack,
    Chance,
    Community,
    Black,
    /// Colours for messages inside terminals, not the board.
    DispGreen,
    DispRed,
    DispBlue,
    /// Player colour, 0-based.
    Player(u8),
}

const ROLE_COUNT: usize = 18;
const PLAYER_COUNT: usize = 4;

impl Role {
    fn slot(self) -> Option<usize> {
        let slot = match self {
            Role::Brown => 0,
            Role::LightBlue => 1,
            Role::Rouge => 2,
            Role::Orange => 3,
            Role::Red => 4,
            Role::Yellow => 5,
            Role::Green => 6,
            Role::Blue => 7,
            Role::White => 8,
            Role::Cyan => 9,
            Role::LightGray => 10,
            Role::LightBlack => 11,
            Role::Chance => 12,
            Role::Community => 13,
            Role::Black => 14,
            Role::DispGreen => 15,
            Role::DispRed => 16,
            Role::DispBlue => 17,
            Role::Player(_) => return None,
        };
        Some(slot)
    }
}

/// Role to colour mapping.
#[derive(Clone, PartialEq, Eq)]
pub struct Theme {
    name: &'static str,
    roles: [Option<Color>; ROLE_COUNT],
    players: [Option<Color>; PLAYER_COUNT],
}

impl fmt::Debug for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Theme").field("name", &self.name).finish()
    }
}

const fn rgb(r: u8, g: u8, b: u8) -> Option<Color> {
    Some(Color::Rgb { r, g, b })
}

const fn ansi(n: u8) -> Option<Color> {
    Some(Color::AnsiValue(n))
}

const PLAYER_PALETTE: [Option<Color>; PLAYER_COUNT] = [ansi(1), ansi(2), ansi(3), ansi(4)];

impl Theme {
    pub fn standard() -> Self {
        Self {
            name: "standard",
            roles: [
                rgb(138, 96, 25),
                rgb(43, 249, 255),
                rgb(240, 93, 231),
                rgb(246, 160, 62),
                rgb(246, 62, 62),
                rgb(240, 255, 91),
                rgb(41, 129, 32),
                rgb(44, 37, 255),
                rgb(255, 255, 255),
                rgb(0, 255, 239),
                rgb(193, 193, 193),
                rgb(88, 88, 88),
                rgb(255, 191, 105),
                rgb(0, 137, 255),
                ansi(0),
                ansi(2),
                ansi(9),
                ansi(12),
            ],
            players: PLAYER_PALETTE,
        }
    }

    pub fn compat() -> Self {
        Self {
            name: "compat",
            roles: [
                ansi(94),
                ansi(33),
                ansi(13),
                ansi(208),
                ansi(1),
                ansi(11),
                ansi(10),
                ansi(4),
                ansi(15),
                ansi(14),
                ansi(247),
                ansi(8),
                ansi(214),
                ansi(45),
                ansi(0),
                ansi(2),
                ansi(9),
                ansi(12),
            ],
            players: PLAYER_PALETTE,
        }
    }

    /// No colour at all.
    pub fn plain() -> Self {
        Self {
            name: "plain",
            roles: [None; ROLE_COUNT],
            players: [None; PLAYER_COUNT],
        }
    }

    /// Look a theme up by name. Unknown names give `None`.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "default" => Some(Self::standard()),
            "compat" => Some(Self::compat()),
            "plain" | "none" => Some(Self::plain()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn color(&self, role: Role) -> Option<Color> {
        match role {
            Role::Player(i) => self.players.get(i as usize).copied().flatten(),
            other => other.slot().and_then(|slot| self.roles[slot]),
        }
    }

    /// Foreground escape sequence for `role`; empty when the theme has no colour for it.
    pub fn fg(&self, role: Role) -> String {
        self.color(role)
            .map(|c| ansi_string(SetForegroundColor(c)))
            .unwrap_or_default()
    }

    /// Background escape sequence for `role`.
    pub fn back(&self, role: Role) -> String {
        self.color(role)
            .map(|c| ansi_string(SetBackgroundColor(c)))
            .unwrap_or_default()
    }

    /// `text` in `role`'s colour, followed by a reset.
    pub fn paint(&self, role: Role, text: &str) -> String {
        match self.color(role) {
            Some(c) => format!(
                "{}{}{}",
                ansi_string(SetForegroundColor(c)),
                text,
                reset()
            ),
            None => text.to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::standard()
    }
}

/// Colour reset sequence.
pub fn reset() -> String {
    ansi_string(ResetColor)
}

fn ansi_string(cmd: impl Command) -> String {
    let mut s = String::new();
    // Writing into a String cannot fail.
    let _ = cmd.write_ansi(&mut s);
    s
}
