//! Viewports: independently addressable regions of the physical screen.
//!
//! A viewport owns a fixed rectangle and whatever is shown in it. Rendering is
//! pure: every `render_*_into` method appends crossterm commands to a byte
//! buffer and never touches the terminal, so the [`Screen`](crate::Screen)
//! decides when to flush and tests can inspect the bytes directly.
//!
//! # Geometry
//!
//! | Border | `origin` is | Content starts at |
//! |--------|-------------|-------------------|
//! | `None` | first content cell | `origin + (0, inset)` |
//! | `Quadrant(i)` | first content cell (border is drawn around it) | `origin + (0, inset)` |
//! | `Box` | top-left border corner | `origin + (1, inset)` |
//!
//! Content is `height - inset` rows of `width` columns.

use std::fmt;
use std::io;

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    style::{Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};

use terminal_monopoly_types::{
    quadrant_origin, Point, Status, StatusChange, QUADRANT_COLS, QUADRANT_ROWS,
};

use crate::escape::translate;
use crate::graphics;
use crate::output_log::OutputLog;
use crate::theme::{Role, Theme};

/// Draws procedural content through a [`Surface`].
pub type RenderFn = Box<dyn FnMut(&mut Surface<'_>) -> io::Result<()>>;

/// What a viewport shows.
pub enum Content {
    Literal(String),
    /// Called at render time instead of printing text.
    Procedural(RenderFn),
}

impl Content {
    pub fn procedural(f: impl FnMut(&mut Surface<'_>) -> io::Result<()> + 'static) -> Self {
        Content::Procedural(Box::new(f))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Content::Literal(text) if text.is_empty())
    }

    /// Equal literals. Procedural content is never the same as anything.
    pub fn same_as(&self, other: &Content) -> bool {
        match (self, other) {
            (Content::Literal(a), Content::Literal(b)) => a == b,
            _ => false,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Content::Literal(String::new())
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Content::Procedural(_) => f.write_str("Procedural(..)"),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Literal(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Literal(text)
    }
}

impl From<RenderFn> for Content {
    fn from(f: RenderFn) -> Self {
        Content::Procedural(f)
    }
}

/// Frame drawn around a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    None,
    /// One of the four player terminals; shares edges with its neighbours.
    Quadrant(u8),
    /// Closed box with the viewport's name centred in the top edge.
    Box,
}

/// Drawing handle passed to procedural content.
///
/// Coordinates given to [`Surface::move_to`] and cursor sequences inside text
/// given to [`Surface::print`] are local to the viewport, `(0, 0)` being its
/// first content cell.
pub struct Surface<'a> {
    out: &'a mut Vec<u8>,
    theme: &'a Theme,
    origin: Point,
    width: u16,
    height: u16,
}

impl Surface<'_> {
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn theme(&self) -> &Theme {
        self.theme
    }

    pub fn move_to(&mut self, col: u16, row: u16) -> io::Result<()> {
        move_to(self.out, self.origin.offset(col, row))
    }

    pub fn print(&mut self, text: &str) -> io::Result<()> {
        let text = translate(text, self.origin.x, self.origin.y);
        self.out.queue(Print(text))?;
        Ok(())
    }

    pub fn paint(&mut self, role: Role) -> io::Result<()> {
        set_fg(self.out, self.theme, role)
    }

    pub fn reset(&mut self) -> io::Result<()> {
        self.out.queue(ResetColor)?;
        Ok(())
    }
}

/// Queue a move to the 1-based point `p`.
pub(crate) fn move_to(out: &mut Vec<u8>, p: Point) -> io::Result<()> {
    out.queue(MoveTo(p.x.saturating_sub(1), p.y.saturating_sub(1)))?;
    Ok(())
}

pub(crate) fn set_fg(out: &mut Vec<u8>, theme: &Theme, role: Role) -> io::Result<()> {
    if let Some(color) = theme.color(role) {
        out.queue(SetForegroundColor(color))?;
    }
    Ok(())
}

/// `line` cut or space-padded to `cols` visible characters.
///
/// Escape sequences are copied through and take no width.
pub fn fit_line(line: &str, cols: usize) -> String {
    let mut out = String::with_capacity(line.len().max(cols));
    let mut visible = 0;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            out.push(c);
            match chars.next() {
                Some('[') => {
                    out.push('[');
                    for c in chars.by_ref() {
                        out.push(c);
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(c) => out.push(c),
                None => {}
            }
            continue;
        }
        if visible == cols {
            break;
        }
        out.push(c);
        visible += 1;
    }

    out.extend(std::iter::repeat(' ').take(cols - visible));
    out
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    origin: Point,
    cols: u16,
    rows: u16,
    pad: bool,
    placeholder: Option<u8>,
}

impl Layout {
    fn blank(&self, out: &mut Vec<u8>) -> io::Result<()> {
        let spaces = " ".repeat(self.cols as usize);
        for row in 0..self.rows {
            move_to(out, self.origin.offset(0, row))?;
            out.queue(Print(&spaces))?;
        }
        Ok(())
    }

    fn literal(&self, text: &str, out: &mut Vec<u8>) -> io::Result<()> {
        if text.is_empty() {
            if self.pad || self.placeholder.is_some() {
                self.blank(out)?;
            }
            if let Some(index) = self.placeholder {
                for (i, line) in graphics::placeholder(index).iter().enumerate() {
                    let at = self.origin.offset(
                        graphics::PLACEHOLDER_COL,
                        graphics::PLACEHOLDER_ROW + i as u16,
                    );
                    move_to(out, at)?;
                    out.queue(Print(line))?;
                }
            }
            return Ok(());
        }

        let text = translate(text, self.origin.x, self.origin.y);
        let mut lines: Vec<&str> = text.split('\n').collect();
        if self.pad {
            lines.truncate(self.rows as usize);
        }

        for (i, line) in lines.iter().enumerate() {
            move_to(out, self.origin.offset(0, i as u16))?;
            if self.pad {
                out.queue(Print(fit_line(line, self.cols as usize)))?;
            } else {
                out.queue(Print(*line))?;
            }
        }

        if self.pad {
            let spaces = " ".repeat(self.cols as usize);
            for row in lines.len() as u16..self.rows {
                move_to(out, self.origin.offset(0, row))?;
                out.queue(Print(&spaces))?;
            }
        }
        Ok(())
    }
}

/// A rectangular region of the screen.
#[derive(Debug)]
pub struct Viewport {
    name: String,
    origin: Point,
    width: u16,
    height: u16,
    header_inset: u16,
    border: Border,
    border_role: Option<Role>,
    content: Content,
    pad: bool,
    status: Status,
    killed: bool,
    tint: Option<Role>,
    needs_redraw: bool,
    log: Option<OutputLog>,
}

impl Viewport {
    /// Plain viewport with no border.
    pub fn new(name: impl Into<String>, origin: Point, width: u16, height: u16) -> Self {
        Self {
            name: name.into(),
            origin,
            width,
            height,
            header_inset: 0,
            border: Border::None,
            border_role: None,
            content: Content::default(),
            pad: true,
            status: Status::Active,
            killed: false,
            tint: None,
            needs_redraw: true,
            log: None,
        }
    }

    /// Player terminal quadrant `index` (1-4), named `Terminal {index}`.
    pub fn terminal(index: u8) -> Option<Self> {
        let origin = quadrant_origin(index)?;
        let mut vp = Self::new(
            format!("Terminal {index}"),
            origin,
            QUADRANT_COLS,
            QUADRANT_ROWS,
        );
        vp.border = Border::Quadrant(index);
        Some(vp)
    }

    /// Boxed message log. `origin` is the top-left border corner.
    ///
    /// Lines start two rows below the top edge; see [`Viewport::with_header_inset`].
    pub fn output_area(
        name: impl Into<String>,
        origin: Point,
        max_length: u16,
        max_lines: u16,
    ) -> Self {
        let mut vp = Self::new(name, origin, max_length, max_lines);
        vp.border = Border::Box;
        vp.header_inset = 2;
        vp.log = Some(OutputLog::new(max_length as usize, max_lines as usize));
        vp
    }

    pub fn with_header_inset(mut self, inset: u16) -> Self {
        self.header_inset = inset;
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn header_inset(&self) -> u16 {
        self.header_inset
    }

    pub fn border(&self) -> Border {
        self.border
    }

    pub fn terminal_index(&self) -> Option<u8> {
        match self.border {
            Border::Quadrant(index) => Some(index),
            _ => None,
        }
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn pad(&self) -> bool {
        self.pad
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    pub fn tint(&self) -> Option<Role> {
        self.tint
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    pub fn log(&self) -> Option<&OutputLog> {
        self.log.as_ref()
    }

    /// First content cell.
    pub fn content_origin(&self) -> Point {
        match self.border {
            Border::Box => self.origin.offset(1, self.header_inset),
            Border::None | Border::Quadrant(_) => self.origin.offset(0, self.header_inset),
        }
    }

    /// Rows available to content.
    pub fn content_rows(&self) -> u16 {
        self.height.saturating_sub(self.header_inset)
    }

    /// Store `content` if it differs from what is shown; `needs_redraw` says whether it did.
    pub fn check_new_data(&mut self, content: Content, pad: bool) -> bool {
        let changed = !self.content.same_as(&content) || self.pad != pad;
        if changed {
            self.content = content;
            self.pad = pad;
        }
        self.needs_redraw = changed;
        changed
    }

    /// Replace the content unconditionally.
    pub fn set_content(&mut self, content: Content, pad: bool) {
        self.content = content;
        self.pad = pad;
        self.needs_redraw = true;
    }

    /// Forget the content so the next update draws even if it is identical.
    pub fn clear(&mut self) {
        self.content = Content::default();
        if let Some(log) = self.log.as_mut() {
            log.clear();
        }
        self.needs_redraw = false;
    }

    pub fn invalidate(&mut self) {
        self.needs_redraw = true;
    }

    /// Add a message to the log. False if this viewport has no log.
    pub fn add_output(&mut self, text: &str, role: Role) -> bool {
        match self.log.as_mut() {
            Some(log) => {
                log.push(text, role);
                true
            }
            None => false,
        }
    }

    /// Apply a status change. A killed viewport refuses every change.
    pub fn apply_status(&mut self, change: StatusChange) -> bool {
        if self.killed {
            return false;
        }
        self.status = change.resulting_status();
        self.killed = change == StatusChange::Killed;
        true
    }

    pub fn set_tint(&mut self, tint: Option<Role>) {
        self.tint = tint;
    }

    pub fn border_role(&self) -> Option<Role> {
        self.border_role
    }

    pub fn set_border_role(&mut self, role: Option<Role>) {
        self.border_role = role;
    }

    fn layout(&self) -> Layout {
        Layout {
            origin: self.content_origin(),
            cols: self.width,
            rows: self.content_rows(),
            pad: self.pad,
            placeholder: self.terminal_index(),
        }
    }

    /// Render the content area: the log for output areas, the content otherwise.
    pub fn render_into(&mut self, theme: &Theme, out: &mut Vec<u8>) -> Result<()> {
        out.queue(ResetColor)?;
        if self.log.is_some() {
            self.render_log_into(theme, out)?;
        } else {
            let layout = self.layout();
            if let Some(role) = self.tint {
                set_fg(out, theme, role)?;
            }
            match &mut self.content {
                Content::Literal(text) => layout.literal(text, out)?,
                Content::Procedural(render) => {
                    let mut surface = Surface {
                        out: &mut *out,
                        theme,
                        origin: layout.origin,
                        width: layout.cols,
                        height: layout.rows,
                    };
                    render(&mut surface)?;
                }
            }
            out.queue(ResetColor)?;
        }
        self.needs_redraw = false;
        Ok(())
    }

    /// Render the visible window of the log, newest line on top.
    pub fn render_log_into(&self, theme: &Theme, out: &mut Vec<u8>) -> Result<()> {
        let Some(log) = self.log.as_ref() else {
            return Ok(());
        };
        let origin = self.content_origin();
        for (i, (line, role)) in log.lines().take(self.content_rows() as usize).enumerate() {
            move_to(out, origin.offset(0, i as u16))?;
            set_fg(out, theme, role)?;
            out.queue(Print(fit_line(line, self.width as usize)))?;
            out.queue(ResetColor)?;
        }
        Ok(())
    }

    /// Blank the whole content area.
    pub fn render_blank_into(&self, out: &mut Vec<u8>) -> Result<()> {
        out.queue(ResetColor)?;
        self.layout().blank(out)?;
        Ok(())
    }

    /// Render the border, if any.
    pub fn render_border_into(&self, theme: &Theme, out: &mut Vec<u8>) -> Result<()> {
        match self.border {
            Border::None => return Ok(()),
            Border::Quadrant(index) => self.quadrant_border(index, theme, out)?,
            Border::Box => self.box_border(theme, out)?,
        }
        out.queue(ResetColor)?;
        Ok(())
    }

    fn quadrant_border(&self, index: u8, theme: &Theme, out: &mut Vec<u8>) -> Result<()> {
        let Some([tl, tr, bl, br]) = graphics::quadrant_corners(index) else {
            return Ok(());
        };
        let Point { x, y } = self.origin;
        let edge = "═".repeat(self.width as usize);

        out.queue(ResetColor)?;
        if let Some(role) = self.border_role {
            set_fg(out, theme, role)?;
        }
        move_to(out, Point::new(x.saturating_sub(1), y.saturating_sub(1)))?;
        out.queue(Print(format!("{tl}{edge}{tr}")))?;
        move_to(out, Point::new(x.saturating_sub(1), y + self.height))?;
        out.queue(Print(format!("{bl}{edge}{br}")))?;
        for row in y..y + self.height {
            move_to(out, Point::new(x.saturating_sub(1), row))?;
            out.queue(Print('║'))?;
            move_to(out, Point::new(x + self.width, row))?;
            out.queue(Print('║'))?;
        }
        Ok(())
    }

    fn box_border(&self, theme: &Theme, out: &mut Vec<u8>) -> Result<()> {
        let Point { x, y } = self.origin;
        let w = self.width as usize;
        let edge = "═".repeat(w);
        let interior = " ".repeat(w);

        out.queue(ResetColor)?;
        if let Some(role) = self.border_role {
            set_fg(out, theme, role)?;
        }
        move_to(out, Point::new(x, y))?;
        out.queue(Print(format!("╔{edge}╗")))?;
        for row in 1..self.height {
            move_to(out, Point::new(x, y + row))?;
            out.queue(Print(format!("║{interior}║")))?;
        }
        move_to(out, Point::new(x, y + self.height))?;
        out.queue(Print(format!("╚{edge}╝")))?;

        if !self.name.is_empty() {
            let title = format!(" {} ", self.name.to_uppercase());
            let half_name = self.name.chars().count() / 2;
            let title_x = (x as usize + w / 2).saturating_sub(half_name);
            move_to(out, Point::new(title_x as u16, y))?;
            out.queue(Print(title))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vt::VirtualTerminal;

    fn render(vp: &mut Viewport) -> VirtualTerminal {
        let mut out = Vec::new();
        vp.render_border_into(&Theme::plain(), &mut out).unwrap();
        vp.render_into(&Theme::plain(), &mut out).unwrap();
        let mut vt = VirtualTerminal::new(200, 60);
        vt.feed(&out);
        vt
    }

    #[test]
    fn pads_and_truncates_to_box() {
        let mut vp = Viewport::new("small", Point::new(5, 5), 10, 2);
        vp.set_content("hello world this is long".into(), true);

        let mut vt = VirtualTerminal::new(20, 10);
        vt.feed(b"\x1b[6;5HXXXXXXXXXXXX");
        let mut out = Vec::new();
        vp.render_into(&Theme::plain(), &mut out).unwrap();
        vt.feed(&out);

        assert_eq!(vt.text_at(5, 5, 10), "hello worl");
        assert_eq!(vt.text_at(5, 6, 10), "          ");
        // The column right of the box is untouched.
        assert_eq!(vt.text_at(15, 6, 1), "X");
    }

    #[test]
    fn truncates_extra_lines_when_padded() {
        let mut vp = Viewport::new("small", Point::new(1, 1), 5, 2);
        vp.set_content("a\nb\nc".into(), true);
        let vt = render(&mut vp);
        assert_eq!(vt.row(1), "a");
        assert_eq!(vt.row(2), "b");
        assert_eq!(vt.row(3), "");
    }

    #[test]
    fn unpadded_lines_are_written_as_given() {
        let mut vp = Viewport::new("raw", Point::new(1, 1), 3, 1);
        vp.set_content("abcdef\nxyz".into(), false);
        let vt = render(&mut vp);
        assert_eq!(vt.row(1), "abcdef");
        assert_eq!(vt.row(2), "xyz");
    }

    #[test]
    fn content_cursor_moves_are_local() {
        let mut vp = Viewport::terminal(2).unwrap();
        vp.set_content("\x1b[3;5H@".into(), false);
        let vt = render(&mut vp);
        let origin = quadrant_origin(2).unwrap();
        assert_eq!(vt.get(origin.x + 5, origin.y + 3).unwrap().ch, '@');
    }

    #[test]
    fn empty_terminal_shows_placeholder() {
        let mut vp = Viewport::terminal(3).unwrap();
        let vt = render(&mut vp);
        let o = quadrant_origin(3).unwrap();
        assert_eq!(vt.text_at(o.x + 10, o.y + 4, 24), "╔══════Terminal 3══════╗");
        assert_eq!(vt.text_at(o.x + 10, o.y + 5, 24), "║ Awaiting commands... ║");
    }

    #[test]
    fn quadrant_border_uses_shared_junctions() {
        let mut vp = Viewport::terminal(1).unwrap();
        let vt = render(&mut vp);
        assert_eq!(vt.get(1, 1).unwrap().ch, '╔');
        assert_eq!(vt.get(QUADRANT_COLS + 2, 1).unwrap().ch, '╦');
        assert_eq!(vt.get(1, QUADRANT_ROWS + 2).unwrap().ch, '╠');
        assert_eq!(vt.get(QUADRANT_COLS + 2, QUADRANT_ROWS + 2).unwrap().ch, '╬');
        assert_eq!(vt.get(1, 5).unwrap().ch, '║');
    }

    #[test]
    fn box_border_is_idempotent() {
        let vp = Viewport::output_area("Main Output", Point::new(10, 3), 20, 6);
        let mut first = Vec::new();
        let mut second = Vec::new();
        vp.render_border_into(&Theme::standard(), &mut first).unwrap();
        vp.render_border_into(&Theme::standard(), &mut second).unwrap();
        assert_eq!(first, second);

        let mut vt = VirtualTerminal::new(40, 12);
        vt.feed(&first);
        assert_eq!(vt.get(10, 3).unwrap().ch, '╔');
        assert_eq!(vt.get(31, 3).unwrap().ch, '╗');
        assert_eq!(vt.get(10, 9).unwrap().ch, '╚');
        assert_eq!(vt.get(31, 9).unwrap().ch, '╝');
        assert!(vt.row(3).contains(" MAIN OUTPUT "));
    }

    #[test]
    fn log_shows_visible_window_below_header() {
        let mut vp = Viewport::output_area("Log", Point::new(1, 1), 12, 5);
        for i in 0..5 {
            vp.add_output(&format!("m{i}"), Role::Green);
        }
        let vt = render(&mut vp);
        // Inset 2: rows 3..=5 hold the three newest lines.
        assert_eq!(vt.text_at(2, 3, 5), ">> m4");
        assert_eq!(vt.text_at(2, 4, 5), ">> m3");
        assert_eq!(vt.text_at(2, 5, 5), ">> m2");
        assert_eq!(vt.get(2, 6).unwrap().ch, '═');
    }

    #[test]
    fn inset_one_log_starts_under_top_edge() {
        let mut vp =
            Viewport::output_area("Main", Point::new(1, 1), 12, 4).with_header_inset(1);
        vp.add_output("first", Role::White);
        vp.add_output("second", Role::White);
        let vt = render(&mut vp);
        assert_eq!(vt.text_at(2, 2, 9), ">> second");
        assert_eq!(vt.text_at(2, 3, 8), ">> first");
    }

    #[test]
    fn check_new_data_only_flags_changes() {
        let mut vp = Viewport::new("v", Point::new(1, 1), 5, 1);
        assert!(vp.check_new_data("abc".into(), true));
        assert!(vp.needs_redraw());
        assert!(!vp.check_new_data("abc".into(), true));
        assert!(!vp.needs_redraw());
        assert!(vp.check_new_data("abc".into(), false));
        assert!(vp.check_new_data(Content::procedural(|_| Ok(())), true));
        assert!(vp.check_new_data(Content::procedural(|_| Ok(())), true));
    }

    #[test]
    fn procedural_draws_in_local_coordinates() {
        let mut vp = Viewport::terminal(4).unwrap();
        vp.set_content(
            Content::procedural(|s| {
                s.move_to(1, 1)?;
                s.print("ok")?;
                s.print("\x1b[0;0H!")
            }),
            true,
        );
        let vt = render(&mut vp);
        let o = quadrant_origin(4).unwrap();
        assert_eq!(vt.text_at(o.x + 1, o.y + 1, 2), "ok");
        assert_eq!(vt.get(o.x, o.y).unwrap().ch, '!');
    }

    #[test]
    fn kill_latches() {
        let mut vp = Viewport::terminal(1).unwrap();
        assert!(vp.apply_status(StatusChange::Busy));
        assert!(vp.apply_status(StatusChange::Killed));
        assert_eq!(vp.status(), Status::Disabled);
        assert!(!vp.apply_status(StatusChange::Active));
        assert!(!vp.apply_status(StatusChange::Killed));
        assert_eq!(vp.status(), Status::Disabled);
    }

    #[test]
    fn disable_is_reversible() {
        let mut vp = Viewport::terminal(1).unwrap();
        assert!(vp.apply_status(StatusChange::Disabled));
        assert!(vp.apply_status(StatusChange::Active));
        assert_eq!(vp.status(), Status::Active);
    }

    #[test]
    fn fit_line_skips_escape_width() {
        assert_eq!(fit_line("\x1b[38;5;1mab\x1b[0m", 3), "\x1b[38;5;1mab\x1b[0m ");
        assert_eq!(fit_line("abcdef", 3), "abc");
        assert_eq!(fit_line("", 2), "  ");
    }
}
