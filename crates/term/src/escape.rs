//! Cursor escape sequences and coordinate translation.
//!
//! Content written for a viewport positions its cursor in *local* coordinates
//! with `ESC[row;colH`. Before it reaches the physical terminal, [`translate`]
//! shifts every such sequence by the viewport's origin:
//!
//! ```
//! use terminal_monopoly_term::escape::translate;
//!
//! assert_eq!(translate("\x1b[0;0Hhi", 78, 2), "\x1b[2;78Hhi");
//! assert_eq!(translate("no cursor moves", 78, 2), "no cursor moves");
//! ```

use std::borrow::Cow;
use std::fmt::Write as _;

const CSI: &str = "\x1b[";

/// Cursor positioning sequence for column `x`, row `y`.
pub fn cursor_str(x: u16, y: u16) -> String {
    format!("{CSI}{y};{x}H")
}

/// Shift every `ESC[row;colH` in `content` by `(dx, dy)`.
///
/// Everything else, including other escape sequences, is copied unchanged.
/// Sequences whose numbers do not fit a `u32` are left alone.
pub fn translate(content: &str, dx: u16, dy: u16) -> Cow<'_, str> {
    if (dx == 0 && dy == 0) || !content.contains(CSI) {
        return Cow::Borrowed(content);
    }

    let bytes = content.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut search = 0;

    while let Some(found) = content[search..].find(CSI) {
        let start = search + found;
        search = start + 1;

        let Some((row, col, end)) = parse_cursor(bytes, start + CSI.len()) else {
            continue;
        };

        if out.is_empty() {
            out.reserve(content.len() + 16);
        }
        out.push_str(&content[copied..start]);
        let _ = write!(
            out,
            "{CSI}{};{}H",
            u64::from(row) + u64::from(dy),
            u64::from(col) + u64::from(dx)
        );
        copied = end;
        search = end;
    }

    if copied == 0 {
        return Cow::Borrowed(content);
    }
    out.push_str(&content[copied..]);
    Cow::Owned(out)
}

/// Parse `row;colH` at `at`. Returns both numbers and the index after `H`.
fn parse_cursor(bytes: &[u8], at: usize) -> Option<(u32, u32, usize)> {
    let (row, at) = parse_number(bytes, at)?;
    if bytes.get(at) != Some(&b';') {
        return None;
    }
    let (col, at) = parse_number(bytes, at + 1)?;
    if bytes.get(at) != Some(&b'H') {
        return None;
    }
    Some((row, col, at + 1))
}

fn parse_number(bytes: &[u8], at: usize) -> Option<(u32, usize)> {
    let digits = bytes
        .get(at..)?
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    // All ASCII digits, so this slice is valid UTF-8.
    let text = std::str::from_utf8(&bytes[at..at + digits]).ok()?;
    Some((text.parse().ok()?, at + digits))
}
