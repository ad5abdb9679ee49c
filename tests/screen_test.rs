use std::io::{self, Read, Write};

use terminal_monopoly::net::frame::decode_stream;
use terminal_monopoly::net::{MessageChannel, NetError};
use terminal_monopoly::term::{
    Content, Role, Screen, Theme, Viewport, VirtualTerminal, INPUT_HOME,
};
use terminal_monopoly::types::{quadrant_origin, Point, Status, StatusUpdate, INPUT_LINE};

fn shown(screen: &Screen<Vec<u8>>) -> VirtualTerminal {
    let mut vt = VirtualTerminal::new(200, 50);
    vt.feed(screen.get_ref());
    vt
}

/// A connection that records what is sent and never has anything to read.
#[derive(Default)]
struct Wire {
    sent: Vec<u8>,
    broken: bool,
}

impl Read for Wire {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

impl Write for Wire {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.broken {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn frames(bytes: &[u8]) -> Vec<String> {
    let mut reader = bytes;
    let mut out = Vec::new();
    while !reader.is_empty() {
        out.push(decode_stream(&mut reader).unwrap());
    }
    out
}

#[test]
fn small_viewport_pads_and_truncates() {
    let mut screen = Screen::new(Vec::new(), Theme::plain());
    screen
        .add(Viewport::new("small", Point::new(5, 5), 10, 2))
        .unwrap();

    assert!(screen
        .update("small", "hello world this is long", true)
        .unwrap());

    let vt = shown(&screen);
    assert_eq!(vt.text_at(5, 5, 10), "hello worl");
    assert_eq!(vt.text_at(5, 6, 10), "          ");
    assert_eq!(vt.text_at(15, 5, 1), " ");
    assert_eq!(vt.cursor(), (INPUT_HOME.x, INPUT_HOME.y));
}

#[test]
fn terminals_start_with_placeholders() {
    let mut screen = Screen::with_terminals(Vec::new(), Theme::plain());
    screen.redraw_all().unwrap();

    let vt = shown(&screen);
    for index in 1..=4 {
        assert!(vt.contains(&format!("Terminal {index}")));
        assert_eq!(screen.terminal(index).unwrap().status(), Status::Active);
    }
    assert!(vt.contains("Awaiting commands..."));
}

#[test]
fn content_is_positioned_relative_to_its_quadrant() {
    let mut screen = Screen::with_terminals(Vec::new(), Theme::plain());
    screen.update("Terminal 4", "\x1b[0;0Htop\x1b[2;4Hmid", false).unwrap();

    let o = quadrant_origin(4).unwrap();
    let vt = shown(&screen);
    assert_eq!(vt.text_at(o.x, o.y, 3), "top");
    assert_eq!(vt.text_at(o.x + 4, o.y + 2, 3), "mid");
}

#[test]
fn transitions_go_out_as_frames() {
    let mut screen = Screen::with_terminals(Vec::new(), Theme::plain());
    screen.set_player_id(5);
    let mut channel = MessageChannel::new(Wire::default());

    assert!(screen.busy(1, &mut channel).unwrap());
    assert!(screen.disable(3, &mut channel).unwrap());
    assert!(screen.enable(3, true, &mut channel).unwrap());
    assert!(screen.kill(2, &mut channel).unwrap());
    assert!(!screen.enable(2, true, &mut channel).unwrap());

    let sent = frames(&channel.get_ref().sent);
    assert_eq!(sent, vec!["5busy 1", "5disabled 3", "5active 3", "5kill 2"]);

    let parsed: Vec<StatusUpdate> = sent.iter().map(|s| s.parse().unwrap()).collect();
    assert!(parsed.iter().all(|u| u.player_id == 5));

    assert_eq!(screen.terminal(1).unwrap().status(), Status::Busy);
    assert_eq!(screen.terminal(2).unwrap().status(), Status::Disabled);
    assert_eq!(screen.terminal(3).unwrap().status(), Status::Active);
}

#[test]
fn send_failure_surfaces_as_net_error() {
    let mut screen = Screen::with_terminals(Vec::new(), Theme::plain());
    let mut channel = MessageChannel::new(Wire {
        broken: true,
        ..Wire::default()
    });

    let err = screen.busy(1, &mut channel).unwrap_err();
    assert!(matches!(err.downcast_ref::<NetError>(), Some(NetError::Io(_))));
}

#[test]
fn theme_swap_keeps_content() {
    let mut screen = Screen::with_terminals(Vec::new(), Theme::standard());
    screen.update("Terminal 1", "portfolio", true).unwrap();
    screen.set_theme(Theme::plain()).unwrap();

    assert_eq!(screen.theme().name(), "plain");
    let o = quadrant_origin(1).unwrap();
    let vt = shown(&screen);
    assert_eq!(vt.text_at(o.x, o.y, 9), "portfolio");
    assert_eq!(vt.get(o.x, o.y).unwrap().fg, None);
}

#[test]
fn procedural_content_draws_through_a_surface() {
    let mut screen = Screen::with_terminals(Vec::new(), Theme::standard());
    let content = Content::procedural(|surface| {
        let (cols, rows) = (surface.width(), surface.height());
        surface.paint(Role::Yellow)?;
        surface.move_to(0, 0)?;
        surface.print(&format!("{cols}x{rows}"))?;
        surface.reset()
    });
    assert!(screen.update("Terminal 2", content, true).unwrap());

    let o = quadrant_origin(2).unwrap();
    let vt = shown(&screen);
    assert_eq!(vt.text_at(o.x, o.y, 5), "75x20");
    assert_eq!(
        vt.get(o.x, o.y).unwrap().fg,
        Theme::standard().color(Role::Yellow)
    );
}

#[test]
fn overwrite_and_echo_share_the_bottom_lines() {
    let mut screen = Screen::with_terminals(Vec::new(), Theme::plain());
    screen.set_cursor(1, INPUT_LINE).unwrap();
    screen.print("buy 3").unwrap();
    screen.overwrite("Invalid input").unwrap();

    let vt = shown(&screen);
    assert_eq!(vt.row(INPUT_LINE - 1), "Invalid input");
    assert_eq!(vt.row(INPUT_LINE), "");
}
