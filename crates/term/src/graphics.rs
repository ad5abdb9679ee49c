//! Built-in graphics drawn by the screen itself.

/// Shown on a terminal that has been killed.
pub const SKULL: &str = concat!(
    "                         _____________\n",
    "                       /               \\\n",
    "                      /                 \\\n",
    "                     |                   |\n",
    "                     |   ___       ___   |\n",
    "                     |  /   \\     /   \\  |\n",
    "                     |  \\___/     \\___/  |\n",
    "                     |         ^         |\n",
    "                      \\_               _/\n",
    "                        |  |||||||||  |\n",
    "                        |  |||||||||  |\n",
    "                         \\___________/\n",
    "\n",
    "                      THIS TERMINAL IS DEAD",
);

/// Message shown when a disabled terminal comes back.
pub const ENABLED_MESSAGE: &str = "This terminal is now enabled!";

/// Column offset of the idle placeholder inside a terminal.
pub const PLACEHOLDER_COL: u16 = 10;

/// Row offset of the idle placeholder inside a terminal.
pub const PLACEHOLDER_ROW: u16 = 4;

/// The "Awaiting commands..." card for terminal `index`.
pub fn placeholder(index: u8) -> [String; 3] {
    [
        format!("╔══════Terminal {index}══════╗"),
        "║ Awaiting commands... ║".to_string(),
        "╚══════════════════════╝".to_string(),
    ]
}

/// Alternating `X ` / ` X` rows covering a `cols` x `rows` area.
pub fn x_hatch(cols: u16, rows: u16) -> String {
    let repeat = cols as usize / 2 + 1;
    let even = "X ".repeat(repeat);
    let odd = " X".repeat(repeat);
    (0..rows / 2 * 2)
        .map(|i| if i % 2 == 0 { even.as_str() } else { odd.as_str() })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Junction glyphs for a quadrant border: top-left, top-right, bottom-left, bottom-right.
///
/// Quadrants share their inner borders, so inner corners are tees and crosses.
pub fn quadrant_corners(index: u8) -> Option<[char; 4]> {
    match index {
        1 => Some(['╔', '╦', '╠', '╬']),
        2 => Some(['╦', '╗', '╬', '╣']),
        3 => Some(['╠', '╬', '╚', '╩']),
        4 => Some(['╬', '╣', '╩', '╝']),
        _ => None,
    }
}
