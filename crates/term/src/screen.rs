//! Screen coordinator: the registry of viewports and the only writer to the terminal.
//!
//! Every operation encodes its drawing into an in-memory buffer, then writes
//! and flushes it in one go. After each operation the cursor is parked at the
//! start of the input line so typed text always lands in the same place.

use std::io::{self, Stdout, Write};

use anyhow::{anyhow, bail, Result};
use crossterm::{
    cursor,
    style::{Attribute, Print, ResetColor, SetAttribute},
    terminal, QueueableCommand,
};
use tracing::debug;

use terminal_monopoly_types::{
    Point, StatusChange, StatusSink, StatusUpdate, INPUT_LINE, SCREEN_WIDTH, TERMINAL_COUNT,
};

use crate::graphics;
use crate::theme::{Role, Theme};
use crate::viewport::{self, Content, Viewport};

/// Where the cursor rests between operations.
pub const INPUT_HOME: Point = Point::new(1, INPUT_LINE);

const INPUT_CLEAR_WIDTH: usize = SCREEN_WIDTH as usize + 3;

pub struct Screen<W: Write = Stdout> {
    out: W,
    buf: Vec<u8>,
    theme: Theme,
    viewports: Vec<Viewport>,
    player_id: u32,
}

impl Screen<Stdout> {
    pub fn stdout(theme: Theme) -> Self {
        Self::new(io::stdout(), theme)
    }
}

impl<W: Write> Screen<W> {
    /// An empty screen writing to `out`.
    pub fn new(out: W, theme: Theme) -> Self {
        Self {
            out,
            buf: Vec::with_capacity(16 * 1024),
            theme,
            viewports: Vec::new(),
            player_id: 0,
        }
    }

    /// A screen with the four player terminals registered.
    pub fn with_terminals(out: W, theme: Theme) -> Self {
        let mut screen = Self::new(out, theme);
        screen
            .viewports
            .extend((1..=TERMINAL_COUNT as u8).filter_map(Viewport::terminal));
        screen
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn player_id(&self) -> u32 {
        self.player_id
    }

    /// Id reported in status updates.
    pub fn set_player_id(&mut self, player_id: u32) {
        self.player_id = player_id;
    }

    /// Register a viewport. Names must be unique.
    pub fn add(&mut self, viewport: Viewport) -> Result<()> {
        if self.viewport(viewport.name()).is_some() {
            bail!("viewport {:?} already exists", viewport.name());
        }
        self.viewports.push(viewport);
        Ok(())
    }

    pub fn viewport(&self, name: &str) -> Option<&Viewport> {
        self.viewports.iter().find(|vp| vp.name() == name)
    }

    /// Player terminal `index` (1-4).
    pub fn terminal(&self, index: u8) -> Option<&Viewport> {
        self.viewports
            .iter()
            .find(|vp| vp.terminal_index() == Some(index))
    }

    pub fn viewports(&self) -> impl Iterator<Item = &Viewport> + '_ {
        self.viewports.iter()
    }

    /// Show new content in `name`. Returns false when nothing changed and nothing was drawn.
    ///
    /// A killed terminal keeps its graphic and ignores updates. Output areas
    /// only take [`Screen::add_output`].
    pub fn update(&mut self, name: &str, content: impl Into<Content>, pad: bool) -> Result<bool> {
        let vp = named(&mut self.viewports, name)?;
        if vp.log().is_some() {
            bail!("viewport {name:?} is an output area, use add_output");
        }
        if vp.is_killed() {
            debug!(viewport = name, "update ignored, terminal is dead");
            return Ok(false);
        }
        if !vp.check_new_data(content.into(), pad) {
            return Ok(false);
        }
        vp.set_tint(None);
        vp.render_into(&self.theme, &mut self.buf)?;
        self.flush()?;
        Ok(true)
    }

    /// Redraw the content of `name` whether or not it changed.
    pub fn refresh(&mut self, name: &str) -> Result<()> {
        let vp = named(&mut self.viewports, name)?;
        vp.render_into(&self.theme, &mut self.buf)?;
        self.flush()
    }

    /// Draw the border and label of `name`, and its log if it has one.
    pub fn draw(&mut self, name: &str) -> Result<()> {
        let vp = named(&mut self.viewports, name)?;
        vp.render_border_into(&self.theme, &mut self.buf)?;
        vp.render_log_into(&self.theme, &mut self.buf)?;
        self.flush()
    }

    /// Clear the terminal and draw every viewport from scratch.
    pub fn redraw_all(&mut self) -> Result<()> {
        self.buf.queue(ResetColor)?;
        self.buf.queue(terminal::Clear(terminal::ClearType::All))?;
        for vp in &mut self.viewports {
            vp.render_border_into(&self.theme, &mut self.buf)?;
            vp.render_into(&self.theme, &mut self.buf)?;
        }
        self.flush()
    }

    /// Append a message to the output area `name` and redraw its visible lines.
    pub fn add_output(&mut self, name: &str, text: &str, role: Role) -> Result<()> {
        let vp = named(&mut self.viewports, name)?;
        if !vp.add_output(text, role) {
            bail!("viewport {name:?} is not an output area");
        }
        vp.render_log_into(&self.theme, &mut self.buf)?;
        self.flush()
    }

    /// Blank `name` and forget its content, so the next update draws even if identical.
    ///
    /// A killed terminal keeps its graphic.
    pub fn clear(&mut self, name: &str) -> Result<()> {
        let vp = named(&mut self.viewports, name)?;
        if vp.is_killed() {
            debug!(viewport = name, "clear ignored, terminal is dead");
            return Ok(());
        }
        vp.clear();
        vp.render_blank_into(&mut self.buf)?;
        self.flush()
    }

    /// Re-enable terminal `index` and tell the banker.
    ///
    /// With `from_disable` the terminal shows a short notice in place of the hatch.
    pub fn enable<S>(&mut self, index: u8, from_disable: bool, sink: &mut S) -> Result<bool>
    where
        S: StatusSink,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        self.transition(index, StatusChange::Active, from_disable, sink)
    }

    /// Cross out terminal `index` and tell the banker.
    pub fn disable<S>(&mut self, index: u8, sink: &mut S) -> Result<bool>
    where
        S: StatusSink,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        self.transition(index, StatusChange::Disabled, false, sink)
    }

    /// Mark terminal `index` busy and tell the banker.
    pub fn busy<S>(&mut self, index: u8, sink: &mut S) -> Result<bool>
    where
        S: StatusSink,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        self.transition(index, StatusChange::Busy, false, sink)
    }

    /// Kill terminal `index` for good and tell the banker.
    pub fn kill<S>(&mut self, index: u8, sink: &mut S) -> Result<bool>
    where
        S: StatusSink,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        self.transition(index, StatusChange::Killed, false, sink)
    }

    /// The banker hears about a change before it is shown, so a failed send
    /// leaves the terminal as it was and the change can be retried.
    fn transition<S>(
        &mut self,
        index: u8,
        change: StatusChange,
        from_disable: bool,
        sink: &mut S,
    ) -> Result<bool>
    where
        S: StatusSink,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        if terminal_named(&mut self.viewports, index)?.is_killed() {
            debug!(terminal = index, ?change, "terminal is dead, change refused");
            return Ok(false);
        }
        let update = StatusUpdate::new(self.player_id, change, index);
        sink.send_status(&update)?;
        debug!(%update, "status sent");
        self.apply_status(index, change, from_disable)
    }

    /// Change terminal `index` locally without telling anyone.
    ///
    /// Used when there is no banker to tell. Returns false for a dead terminal.
    pub fn set_status(&mut self, index: u8, change: StatusChange) -> Result<bool> {
        self.apply_status(index, change, false)
    }

    fn apply_status(&mut self, index: u8, change: StatusChange, from_disable: bool) -> Result<bool> {
        let vp = terminal_named(&mut self.viewports, index)?;
        if !vp.apply_status(change) {
            debug!(terminal = index, ?change, "terminal is dead, change refused");
            return Ok(false);
        }

        let shown = match change {
            StatusChange::Disabled => Some((
                graphics::x_hatch(vp.width(), vp.content_rows()),
                Some(Role::Red),
            )),
            StatusChange::Killed => Some((graphics::SKULL.to_string(), Some(Role::Red))),
            StatusChange::Active if from_disable => {
                Some((graphics::ENABLED_MESSAGE.to_string(), None))
            }
            StatusChange::Active | StatusChange::Busy => None,
        };

        if let Some((text, tint)) = shown {
            vp.set_content(Content::Literal(text), true);
            vp.set_tint(tint);
            vp.render_into(&self.theme, &mut self.buf)?;
            self.flush()?;
        }
        Ok(true)
    }

    /// Colour the border of terminal `index`; `None` restores the default.
    pub fn set_border_color(&mut self, index: u8, role: Option<Role>) -> Result<()> {
        let vp = terminal_named(&mut self.viewports, index)?;
        vp.set_border_role(role);
        vp.render_border_into(&self.theme, &mut self.buf)?;
        self.flush()
    }

    /// Show whether terminal `index` has taken the keyboard.
    pub fn indicate_keyboard_hook(&mut self, index: u8, hooked: bool) -> Result<()> {
        let role = if hooked { Role::LightBlue } else { Role::Green };
        self.set_border_color(index, Some(role))
    }

    /// Write `text` on the line above the input line and clear the input line.
    pub fn overwrite(&mut self, text: &str) -> Result<()> {
        self.buf.queue(ResetColor)?;
        viewport::move_to(&mut self.buf, Point::new(1, INPUT_LINE - 1))?;
        self.buf
            .queue(Print(viewport::fit_line(text, INPUT_CLEAR_WIDTH)))?;
        viewport::move_to(&mut self.buf, INPUT_HOME)?;
        self.buf.queue(Print(" ".repeat(INPUT_CLEAR_WIDTH)))?;
        self.flush()
    }

    /// Move the physical cursor to `(x, y)`, 1-based.
    pub fn set_cursor(&mut self, x: u16, y: u16) -> Result<()> {
        viewport::move_to(&mut self.buf, Point::new(x, y))?;
        self.write_buf()
    }

    /// Write raw text at the cursor.
    pub fn print(&mut self, text: &str) -> Result<()> {
        self.buf.queue(Print(text))?;
        self.write_buf()
    }

    /// Swap the colour theme and redraw everything in it.
    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        debug!(theme = theme.name(), "theme changed");
        self.theme = theme;
        self.redraw_all()
    }

    /// Raw mode and the alternate screen.
    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        self.buf.clear();
        self.buf.queue(terminal::EnterAlternateScreen)?;
        self.buf.queue(terminal::DisableLineWrap)?;
        self.write_buf()
    }

    pub fn exit(&mut self) -> Result<()> {
        self.buf.clear();
        self.buf.queue(ResetColor)?;
        self.buf.queue(SetAttribute(Attribute::Reset))?;
        self.buf.queue(terminal::EnableLineWrap)?;
        self.buf.queue(cursor::Show)?;
        self.buf.queue(terminal::LeaveAlternateScreen)?;
        self.write_buf()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush(&mut self) -> Result<()> {
        self.buf.queue(ResetColor)?;
        viewport::move_to(&mut self.buf, INPUT_HOME)?;
        self.write_buf()
    }

    fn write_buf(&mut self) -> Result<()> {
        self.out.write_all(&self.buf)?;
        self.out.flush()?;
        self.buf.clear();
        Ok(())
    }
}

fn named<'a>(viewports: &'a mut [Viewport], name: &str) -> Result<&'a mut Viewport> {
    viewports
        .iter_mut()
        .find(|vp| vp.name() == name)
        .ok_or_else(|| anyhow!("no viewport named {name:?}"))
}

fn terminal_named(viewports: &mut [Viewport], index: u8) -> Result<&mut Viewport> {
    viewports
        .iter_mut()
        .find(|vp| vp.terminal_index() == Some(index))
        .ok_or_else(|| anyhow!("no terminal {index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vt::VirtualTerminal;
    use crossterm::style::Color;
    use terminal_monopoly_types::{quadrant_origin, Status};

    fn screen(theme: Theme) -> Screen<Vec<u8>> {
        Screen::with_terminals(Vec::new(), theme)
    }

    fn shown(screen: &Screen<Vec<u8>>) -> VirtualTerminal {
        let mut vt = VirtualTerminal::new(200, 50);
        vt.feed(screen.get_ref());
        vt
    }

    #[test]
    fn registers_four_terminals() {
        let s = screen(Theme::plain());
        for i in 1..=4 {
            assert_eq!(s.terminal(i).unwrap().name(), format!("Terminal {i}"));
        }
        assert!(s.terminal(5).is_none());
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut s = screen(Theme::plain());
        let dup = Viewport::new("Terminal 1", Point::new(1, 1), 5, 5);
        assert!(s.add(dup).is_err());
    }

    #[test]
    fn update_skips_identical_content() {
        let mut s = screen(Theme::plain());
        assert!(s.update("Terminal 1", "hello", true).unwrap());
        let written = s.get_ref().len();
        assert!(!s.update("Terminal 1", "hello", true).unwrap());
        assert_eq!(s.get_ref().len(), written);

        let vt = shown(&s);
        assert_eq!(vt.text_at(2, 2, 5), "hello");
        assert_eq!(vt.cursor(), (1, INPUT_LINE));
    }

    #[test]
    fn clear_then_identical_update_redraws() {
        let mut s = screen(Theme::plain());
        s.update("Terminal 2", "again", true).unwrap();
        s.clear("Terminal 2").unwrap();
        let o = quadrant_origin(2).unwrap();
        assert_eq!(shown(&s).text_at(o.x, o.y, 5), "     ");

        assert!(s.update("Terminal 2", "again", true).unwrap());
        assert_eq!(shown(&s).text_at(o.x, o.y, 5), "again");
    }

    #[test]
    fn unknown_viewport_is_an_error() {
        let mut s = screen(Theme::plain());
        assert!(s.update("Nope", "x", true).is_err());
        assert!(s.refresh("Nope").is_err());
    }

    #[test]
    fn transitions_report_status() {
        let mut s = screen(Theme::plain());
        s.set_player_id(3);
        let mut sent: Vec<StatusUpdate> = Vec::new();

        s.busy(2, &mut sent).unwrap();
        s.disable(2, &mut sent).unwrap();
        s.enable(2, true, &mut sent).unwrap();

        let text: Vec<_> = sent.iter().map(ToString::to_string).collect();
        assert_eq!(text, vec!["3busy 2", "3disabled 2", "3active 2"]);
        assert_eq!(s.terminal(2).unwrap().status(), Status::Active);
        assert!(shown(&s).contains(graphics::ENABLED_MESSAGE));
    }

    #[test]
    fn kill_latches_and_stops_reporting() {
        let mut s = screen(Theme::plain());
        s.set_player_id(1);
        let mut sent: Vec<StatusUpdate> = Vec::new();

        assert!(s.kill(4, &mut sent).unwrap());
        assert!(!s.enable(4, true, &mut sent).unwrap());
        assert!(!s.busy(4, &mut sent).unwrap());
        assert!(!s.update("Terminal 4", "still here?", true).unwrap());

        assert_eq!(sent, vec![StatusUpdate::new(1, StatusChange::Killed, 4)]);
        assert_eq!(sent[0].to_string(), "1kill 4");
        assert_eq!(s.terminal(4).unwrap().status(), Status::Disabled);
        assert!(shown(&s).contains("THIS TERMINAL IS DEAD"));
    }

    #[test]
    fn disable_hatches_in_red() {
        let mut s = screen(Theme::standard());
        let mut sent: Vec<StatusUpdate> = Vec::new();
        s.disable(1, &mut sent).unwrap();

        let cell = shown(&s).get(2, 2).unwrap();
        assert_eq!(cell.ch, 'X');
        assert_eq!(cell.fg, Some(Color::Rgb { r: 246, g: 62, b: 62 }));
    }

    #[test]
    fn theme_swap_redraws_in_new_colours() {
        let mut s = screen(Theme::standard());
        let mut sent: Vec<StatusUpdate> = Vec::new();
        s.disable(1, &mut sent).unwrap();
        s.set_theme(Theme::compat()).unwrap();

        let vt = shown(&s);
        assert_eq!(vt.get(2, 2).unwrap().fg, Some(Color::AnsiValue(1)));
        // Other terminals come back with their placeholder.
        assert!(vt.contains("Terminal 3"));
    }

    #[test]
    fn set_status_renders_without_sending() {
        let mut s = screen(Theme::plain());
        assert!(s.set_status(3, StatusChange::Disabled).unwrap());
        assert_eq!(s.terminal(3).unwrap().status(), Status::Disabled);
        let o = quadrant_origin(3).unwrap();
        assert_eq!(shown(&s).text_at(o.x, o.y, 3), "X X");
    }

    #[test]
    fn keyboard_hook_colours_border() {
        let mut s = screen(Theme::standard());
        s.indicate_keyboard_hook(1, true).unwrap();
        let light_blue = Theme::standard().color(Role::LightBlue);
        assert_eq!(shown(&s).get(1, 1).unwrap().fg, light_blue);

        s.indicate_keyboard_hook(1, false).unwrap();
        let green = Theme::standard().color(Role::Green);
        assert_eq!(shown(&s).get(1, 1).unwrap().fg, green);
    }

    #[test]
    fn output_area_shows_newest_first() {
        let mut s = screen(Theme::plain());
        s.add(Viewport::output_area("Notifications", Point::new(156, 1), 36, 20))
            .unwrap();
        s.draw("Notifications").unwrap();
        s.add_output("Notifications", "first", Role::Green).unwrap();
        s.add_output("Notifications", "second", Role::Green).unwrap();

        let vt = shown(&s);
        assert_eq!(vt.text_at(157, 3, 9), ">> second");
        assert_eq!(vt.text_at(157, 4, 8), ">> first");
        assert!(vt.row(1).contains(" NOTIFICATIONS "));
    }

    #[test]
    fn add_output_needs_a_log() {
        let mut s = screen(Theme::plain());
        assert!(s.add_output("Terminal 1", "x", Role::Red).is_err());
    }

    #[test]
    fn overwrite_uses_line_above_input() {
        let mut s = screen(Theme::plain());
        s.set_cursor(1, INPUT_LINE).unwrap();
        s.print("typed").unwrap();
        s.overwrite("Invalid input").unwrap();

        let vt = shown(&s);
        assert_eq!(vt.row(INPUT_LINE - 1), "Invalid input");
        assert_eq!(vt.row(INPUT_LINE), "");
        assert_eq!(vt.cursor(), (1, INPUT_LINE));
    }

    #[test]
    fn procedural_content_always_redraws() {
        let mut s = screen(Theme::plain());
        for _ in 0..2 {
            let drawn = s
                .update(
                    "Terminal 1",
                    Content::procedural(|surface| surface.print("\x1b[1;1Hp")),
                    true,
                )
                .unwrap();
            assert!(drawn);
        }
        assert_eq!(shown(&s).get(3, 3).unwrap().ch, 'p');
    }

    #[test]
    fn clear_keeps_dead_terminal_graphic() {
        let mut s = screen(Theme::plain());
        let mut sent: Vec<StatusUpdate> = Vec::new();
        s.kill(1, &mut sent).unwrap();

        s.clear("Terminal 1").unwrap();
        s.redraw_all().unwrap();

        let vt = shown(&s);
        assert!(vt.contains("THIS TERMINAL IS DEAD"));
        assert!(!vt.contains("Terminal 1"));
        assert!(s.terminal(1).unwrap().is_killed());
    }

    #[test]
    fn update_rejects_output_areas() {
        let mut s = screen(Theme::plain());
        s.add(Viewport::output_area("Log", Point::new(156, 1), 36, 20))
            .unwrap();
        assert!(s.update("Log", "hello there", true).is_err());

        s.add_output("Log", "hello there", Role::White).unwrap();
        assert!(shown(&s).contains(">> hello there"));
    }

    /// Refuses every send.
    struct Offline;

    impl StatusSink for Offline {
        type Error = io::Error;

        fn send_status(&mut self, _update: &StatusUpdate) -> Result<(), io::Error> {
            Err(io::Error::from(io::ErrorKind::NotConnected))
        }
    }

    #[test]
    fn failed_send_leaves_terminal_unchanged() {
        let mut s = screen(Theme::plain());
        assert!(s.kill(2, &mut Offline).is_err());
        assert!(!s.terminal(2).unwrap().is_killed());
        assert_eq!(s.terminal(2).unwrap().status(), Status::Active);
        assert!(!shown(&s).contains("THIS TERMINAL IS DEAD"));

        let mut sent: Vec<StatusUpdate> = Vec::new();
        assert!(s.kill(2, &mut sent).unwrap());
        assert_eq!(sent, vec![StatusUpdate::new(0, StatusChange::Killed, 2)]);
        assert!(s.terminal(2).unwrap().is_killed());
    }
}
