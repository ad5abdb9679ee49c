//! Terminal Monopoly player (default binary).
//!
//! Connects to the banker, takes over the terminal and shows the four player
//! terminals plus a notification log. Typed commands:
//!
//! - `1`..`4`: hand the keyboard to a terminal (again to release it)
//! - `busy N`, `enable N`, `disable N`: change a terminal's status
//! - `send TEXT`: send a message to the banker
//! - `oof TEXT`: push a message over the out-of-focus link
//! - `theme NAME`: switch colours (`standard`, `compat`, `plain`)
//! - `quit`, Esc or Ctrl-C: leave
//!
//! Settings come from the `TM_*` environment variables.

use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use tracing::{info, warn};

use terminal_monopoly::input::{
    map_key, parse_command, InputAction, LineBuffer, PlayerCommand, MAX_LINE_LEN,
};
use terminal_monopoly::logging;
use terminal_monopoly::net::{
    ClientConfig, InboundNotice, MessageChannel, NetError, NotificationListener, OofLink,
};
use terminal_monopoly::term::{cursor_str, fit_line, Role, Screen, Theme, Viewport};
use terminal_monopoly::types::{
    Point, StatusChange, TerminalCommand, INPUT_LINE, TERMINAL_COUNT,
};

const NOTIFICATIONS: &str = "Notifications";
const NOTIFICATIONS_ORIGIN: Point = Point::new(156, 1);
const NOTIFICATIONS_WIDTH: u16 = 36;
const NOTIFICATIONS_LINES: u16 = 20;

/// How long each loop iteration waits on the keyboard and the banker.
const POLL: Duration = Duration::from_millis(50);

struct Session {
    config: ClientConfig,
    player_id: u32,
    channel: Option<MessageChannel>,
    listener: Option<NotificationListener>,
    oof: Option<OofLink>,
    line: LineBuffer,
    focus: Option<u8>,
}

fn main() -> Result<()> {
    let config = ClientConfig::from_env();
    if let Some(path) = &config.log_path {
        logging::init_file(path)?;
    }

    let theme = Theme::by_name(&config.theme).unwrap_or_else(|| {
        warn!(theme = %config.theme, "unknown theme, using standard");
        Theme::standard()
    });

    let mut session = Session::connect(config)?;

    let mut screen = Screen::with_terminals(std::io::stdout(), theme);
    screen.set_player_id(session.player_id);
    screen.add(
        Viewport::output_area(
            NOTIFICATIONS,
            NOTIFICATIONS_ORIGIN,
            NOTIFICATIONS_WIDTH,
            NOTIFICATIONS_LINES,
        )
        .with_header_inset(1),
    )?;

    screen.enter()?;
    let result = run(&mut screen, &mut session);

    // Always try to restore terminal state.
    let _ = screen.exit();
    session.close();
    result
}

impl Session {
    fn connect(config: ClientConfig) -> Result<Self> {
        let mut channel = MessageChannel::connect(&config).context("connect to banker")?;
        let welcome = channel.receive().context("wait for player id")?;
        let player_id: u32 = welcome
            .trim()
            .parse()
            .with_context(|| format!("banker sent {welcome:?} instead of a player id"))?;
        info!(player_id, "joined game");

        let listener = match NotificationListener::for_primary(channel.get_ref()) {
            Ok(listener) => Some(listener),
            Err(e) => {
                warn!(error = %e, "notifications unavailable");
                None
            }
        };
        let oof = match OofLink::connect(channel.get_ref(), player_id, config.connect_timeout) {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(error = %e, "out-of-focus link unavailable");
                None
            }
        };

        channel.set_read_timeout(Some(POLL))?;

        Ok(Self {
            config,
            player_id,
            channel: Some(channel),
            listener,
            oof,
            line: LineBuffer::new(),
            focus: None,
        })
    }

    fn close(&mut self) {
        if let Some(link) = self.oof.take() {
            let _ = link.close();
        }
        if let Some(channel) = self.channel.take() {
            let _ = channel.shutdown();
        }
    }
}

fn run(screen: &mut Screen, session: &mut Session) -> Result<()> {
    screen.redraw_all()?;

    loop {
        if event::poll(POLL)? {
            if let Event::Key(key) = event::read()? {
                match map_key(key) {
                    Some(InputAction::Quit) => return Ok(()),
                    Some(action) => {
                        if let Some(line) = session.line.apply(action) {
                            if !handle_line(screen, session, &line)? {
                                return Ok(());
                            }
                        }
                        echo_line(screen, &session.line)?;
                    }
                    None => {}
                }
            }
        }

        if let Some(listener) = session.listener.as_mut() {
            for InboundNotice { from, notice } in listener.drain() {
                tracing::debug!(%from, tag = %notice.tag, "notice");
                screen.add_output(NOTIFICATIONS, notice.body.trim(), Role::DispGreen)?;
            }
        }

        poll_banker(screen, session)?;
    }
}

fn echo_line(screen: &mut Screen, line: &LineBuffer) -> Result<()> {
    let text = fit_line(line.as_str(), MAX_LINE_LEN + 1);
    screen.print(&format!("{}{}", cursor_str(1, INPUT_LINE), text))?;
    screen.set_cursor(line.len() as u16 + 1, INPUT_LINE)
}

/// Handle one typed line. Returns false when the player quits.
fn handle_line(screen: &mut Screen, session: &mut Session, line: &str) -> Result<bool> {
    let cmd = match parse_command(line) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => return Ok(true),
        Err(e) => {
            screen.overwrite(&e.to_string())?;
            return Ok(true);
        }
    };

    match cmd {
        PlayerCommand::Quit => return Ok(false),
        PlayerCommand::Focus(index) => {
            if let Some(prev) = session.focus.take() {
                screen.indicate_keyboard_hook(prev, false)?;
                if prev == index {
                    screen.overwrite("")?;
                    return Ok(true);
                }
            }
            screen.indicate_keyboard_hook(index, true)?;
            session.focus = Some(index);
            screen.overwrite(&format!("Terminal {index} has the keyboard"))?;
        }
        PlayerCommand::Status(change, index) => {
            change_status(screen, session, change, index)?;
            screen.overwrite("")?;
        }
        PlayerCommand::Send(text) => match session.channel.as_mut() {
            Some(channel) => {
                if let Err(e) = channel.send(&text) {
                    disconnected(screen, session, e)?;
                } else {
                    screen.overwrite("")?;
                }
            }
            None => screen.overwrite("Not connected to the banker")?,
        },
        PlayerCommand::Oof(text) => match session.oof.as_mut() {
            Some(link) => {
                if let Err(e) = link.send(&text) {
                    warn!(error = %e, "out-of-focus link closed");
                    session.oof = None;
                    screen.overwrite("Out-of-focus link closed")?;
                } else {
                    screen.overwrite("")?;
                }
            }
            None => screen.overwrite("No out-of-focus link")?,
        },
        PlayerCommand::Theme(name) => match Theme::by_name(&name) {
            Some(theme) => screen.set_theme(theme)?,
            None => screen.overwrite(&format!("Unknown theme {name:?}"))?,
        },
    }
    Ok(true)
}

/// Apply a status change, telling the banker when there is one.
fn change_status(
    screen: &mut Screen,
    session: &mut Session,
    change: StatusChange,
    index: u8,
) -> Result<()> {
    let Some(channel) = session.channel.as_mut() else {
        screen.set_status(index, change)?;
        return Ok(());
    };
    let sent = match change {
        StatusChange::Active => screen.enable(index, true, channel),
        StatusChange::Busy => screen.busy(index, channel),
        StatusChange::Disabled => screen.disable(index, channel),
        StatusChange::Killed => screen.kill(index, channel),
    };
    if let Err(e) = sent {
        match e.downcast::<NetError>() {
            Ok(net) => disconnected(screen, session, net)?,
            Err(other) => return Err(other),
        }
    }
    Ok(())
}

fn poll_banker(screen: &mut Screen, session: &mut Session) -> Result<()> {
    let Some(channel) = session.channel.as_mut() else {
        return Ok(());
    };
    let text = match channel.receive() {
        Ok(text) => text,
        Err(NetError::Timeout) => return Ok(()),
        Err(e) => return disconnected(screen, session, e),
    };

    match text.parse::<TerminalCommand>() {
        Ok(cmd) => {
            info!(%cmd, "banker command");
            change_status(screen, session, cmd.change, cmd.terminal)
        }
        Err(_) => screen.add_output(NOTIFICATIONS, &text, Role::White),
    }
}

/// The banker is gone: show every terminal disabled and keep running offline.
fn disconnected(screen: &mut Screen, session: &mut Session, err: NetError) -> Result<()> {
    if err.is_clean_disconnect() {
        info!("banker closed the connection");
    } else {
        warn!(error = %err, "lost banker connection");
    }
    session.channel = None;
    for index in 1..=TERMINAL_COUNT as u8 {
        screen.set_status(index, StatusChange::Disabled)?;
    }
    let reason = if err.is_protocol_error() {
        "protocol error"
    } else {
        "connection closed"
    };
    screen.overwrite(&format!(
        "Disconnected from banker at {}:{} ({reason})",
        session.config.host, session.config.port
    ))
}
