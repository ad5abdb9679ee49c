//! In-memory terminal for checking rendered output.
//!
//! Feeds the byte stream a [`Screen`](crate::Screen) writes into a grid of
//! cells, interpreting the handful of sequences this crate emits: cursor
//! positioning and movement, foreground colour, and erase. Everything else is
//! skipped. Text does not wrap at the right edge; it is clipped.
//!
//! Coordinates are 1-based, like the escape sequences themselves.

use crossterm::style::Color;

/// A single character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
}

impl Default for Cell {
    fn default() -> Self {
        Self { ch: ' ', fg: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualTerminal {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    // 0-based
    x: u16,
    y: u16,
    fg: Option<Color>,
}

impl VirtualTerminal {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
            x: 0,
            y: 0,
            fg: None,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Cursor position, 1-based `(x, y)`.
    pub fn cursor(&self) -> (u16, u16) {
        (self.x + 1, self.y + 1)
    }

    fn idx(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        let i = self.idx(x.checked_sub(1)?, y.checked_sub(1)?)?;
        Some(self.cells[i])
    }

    /// `len` characters starting at `(x, y)`.
    pub fn text_at(&self, x: u16, y: u16, len: u16) -> String {
        (0..len)
            .filter_map(|dx| self.get(x + dx, y))
            .map(|c| c.ch)
            .collect()
    }

    /// Row `y` with trailing blanks removed.
    pub fn row(&self, y: u16) -> String {
        self.text_at(1, y, self.width).trim_end().to_string()
    }

    /// True if `needle` appears on any row.
    pub fn contains(&self, needle: &str) -> bool {
        (1..=self.height).any(|y| self.text_at(1, y, self.width).contains(needle))
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let mut chars = text.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '\x1b' => match chars.next() {
                    Some('[') => {
                        let mut params = String::new();
                        let mut fin = None;
                        for c in chars.by_ref() {
                            if ('\x40'..='\x7e').contains(&c) {
                                fin = Some(c);
                                break;
                            }
                            params.push(c);
                        }
                        if let Some(fin) = fin {
                            self.csi(&params, fin);
                        }
                    }
                    // Two-byte escapes; nothing to do.
                    _ => {}
                },
                '\r' => self.x = 0,
                '\n' => self.y = self.y.saturating_add(1),
                c if c.is_control() => {}
                c => {
                    if let Some(i) = self.idx(self.x, self.y) {
                        self.cells[i] = Cell { ch: c, fg: self.fg };
                    }
                    self.x = self.x.saturating_add(1);
                }
            }
        }
    }

    fn csi(&mut self, params: &str, fin: char) {
        if params.starts_with('?') {
            return;
        }
        let nums: Vec<u16> = params
            .split(';')
            .map(|p| p.parse().unwrap_or(0))
            .collect();
        let first = |default: u16| match nums.first() {
            Some(&n) if n > 0 => n,
            _ => default,
        };

        match fin {
            'H' | 'f' => {
                let row = first(1);
                let col = match nums.get(1) {
                    Some(&n) if n > 0 => n,
                    _ => 1,
                };
                self.y = row - 1;
                self.x = col - 1;
            }
            'A' => self.y = self.y.saturating_sub(first(1)),
            'B' => self.y = self.y.saturating_add(first(1)),
            'C' => self.x = self.x.saturating_add(first(1)),
            'D' => self.x = self.x.saturating_sub(first(1)),
            'G' => self.x = first(1) - 1,
            'J' if first(0) == 2 => self.cells.fill(Cell::default()),
            'K' => {
                for x in self.x..self.width {
                    if let Some(i) = self.idx(x, self.y) {
                        self.cells[i] = Cell::default();
                    }
                }
            }
            'm' => self.sgr(&nums),
            _ => {}
        }
    }

    fn sgr(&mut self, nums: &[u16]) {
        let mut i = 0;
        while i < nums.len() {
            let code = nums[i];
            match code {
                0 | 39 => self.fg = None,
                38 | 48 => {
                    let (color, used) = extended_color(&nums[i + 1..]);
                    i += used;
                    if code == 38 {
                        if let Some(color) = color {
                            self.fg = Some(color);
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }
}

/// Parse the arguments after 38/48. Returns the colour and how many numbers it used.
fn extended_color(args: &[u16]) -> (Option<Color>, usize) {
    match args {
        [5, n, ..] => (Some(Color::AnsiValue(*n as u8)), 2),
        [2, r, g, b, ..] => (
            Some(Color::Rgb {
                r: *r as u8,
                g: *g as u8,
                b: *b as u8,
            }),
            4,
        ),
        _ => (None, args.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_and_prints() {
        let mut vt = VirtualTerminal::new(10, 3);
        vt.feed(b"\x1b[2;3Hab");
        assert_eq!(vt.get(3, 2).unwrap().ch, 'a');
        assert_eq!(vt.get(4, 2).unwrap().ch, 'b');
        assert_eq!(vt.cursor(), (5, 2));
        assert_eq!(vt.row(2), "  ab");
    }

    #[test]
    fn clips_at_right_edge() {
        let mut vt = VirtualTerminal::new(4, 1);
        vt.feed("\x1b[1;3H╔══╗".as_bytes());
        assert_eq!(vt.row(1), "  ╔═");
    }

    #[test]
    fn tracks_foreground_colour() {
        let mut vt = VirtualTerminal::new(6, 1);
        vt.feed(b"\x1b[38;5;1mR\x1b[0mN\x1b[38;2;1;2;3mT");
        assert_eq!(vt.get(1, 1).unwrap().fg, Some(Color::AnsiValue(1)));
        assert_eq!(vt.get(2, 1).unwrap().fg, None);
        assert_eq!(
            vt.get(3, 1).unwrap().fg,
            Some(Color::Rgb { r: 1, g: 2, b: 3 })
        );
    }

    #[test]
    fn ignores_private_modes_and_clears() {
        let mut vt = VirtualTerminal::new(3, 1);
        vt.feed(b"abc\x1b[?25l\x1b[?1049h\x1b[2J");
        assert_eq!(vt.row(1), "");
    }
}
