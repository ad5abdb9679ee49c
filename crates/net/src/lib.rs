//! Networking module - framed banker/player protocol with out-of-focus notifications
//!
//! A game is one **banker** process and several **player** processes. Each
//! player holds one primary TCP connection to the banker, used for
//! request/response traffic, plus a notification port for asynchronous notices.
//!
//! # Wire Format
//!
//! Every message is a frame:
//!
//! ```text
//! "16        hi    "
//!  ^^^^^^^^^^ header: total frame length, ASCII decimal, left-justified
//!            ^^ payload (UTF-8)
//!              ^^^^ padding: spaces up to a multiple of 16 bytes
//! ```
//!
//! Receivers read in 16-byte chunks, never past the end of the current frame.
//! Trailing spaces are stripped on receive, so they never survive a round trip.
//!
//! # Port Convention
//!
//! | Port | Direction | Use |
//! |------|-----------|-----|
//! | `P` | both | primary request/response ([`MessageChannel`]) |
//! | `P + 1` | sender → receiver | notifications ([`send_notification`]) |
//!
//! A notification is one frame `TAG + text` (default tag `NOTF:`) over a fresh
//! connection. The banker also listens on its own `P + 1` for players'
//! persistent [`OofLink`]s.
//!
//! # Example
//!
//! ```
//! use terminal_monopoly_net::frame::{decode, encode};
//!
//! let frame = encode("hi").unwrap();
//! assert_eq!(frame.to_bytes(), b"16        hi    ");
//! assert_eq!(decode(&frame.to_bytes()).unwrap(), "hi");
//! ```
//!
//! # Implementation
//!
//! - Blocking std sockets on the player's primary channel (the UI thread owns it)
//! - **tokio** for everything that listens: the banker and notification listeners
//! - Sync bridges ([`Banker`], [`NotificationListener`]) own their runtime and
//!   hand events to a poll loop through mpsc queues

pub mod banker;
pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod listener;
pub mod notify;

pub use terminal_monopoly_types as types;

pub use banker::{
    check_tcp_listen_available, run_banker, Banker, BankerEvent, Outbound, StatusBoard,
};
pub use channel::{receive_message, send_message, MessageChannel};
pub use config::{BankerConfig, ClientConfig};
pub use error::{NetError, ProtocolError};
pub use frame::{Frame, FrameAssembler, FRAME_ALIGN, HEADER_WIDTH};
pub use listener::{run_listener, serve_notifications, InboundNotice, NotificationListener};
pub use notify::{
    notification_addr, notify_best_effort, send_notification, send_notification_async,
    send_notification_to, Notice, OofLink, DEFAULT_TAG,
};
