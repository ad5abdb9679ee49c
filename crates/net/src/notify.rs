//! Out-of-focus notifications.
//!
//! Every primary connection has a notification port paired with it: the same
//! host, one port up. A notification is a single frame `TAG + text` sent over a
//! brand-new connection which is closed right after. Nothing is sent back.
//!
//! ```text
//! banker ──primary (P)──────── player
//! banker ──connect P+1, "NOTF:..."──▶ player listener
//! ```
//!
//! Delivery is best-effort. [`send_notification`] reports failures so callers
//! can choose; [`notify_best_effort`] logs and moves on.
//!
//! [`OofLink`] is the persistent variant: a player holds one connection open to
//! the banker's notification port and pushes tagged frames over it.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::channel::{send_message, MessageChannel};
use crate::config::DEFAULT_CONNECT_TIMEOUT;
use crate::error::NetError;
use crate::frame::write_frame;

/// Tag carried by ordinary notifications.
pub const DEFAULT_TAG: &str = "NOTF:";

/// Tag prefix of frames sent over an [`OofLink`]; the player id follows.
pub const OOF_TAG_PREFIX: &str = "OOF";

/// Notification address paired with a primary peer address.
pub fn notification_addr(primary_peer: SocketAddr) -> Result<SocketAddr, NetError> {
    let port = primary_peer.port().checked_add(1).ok_or_else(|| {
        NetError::delivery(
            primary_peer,
            io::Error::new(io::ErrorKind::InvalidInput, "no port above 65535"),
        )
    })?;
    let mut addr = primary_peer;
    addr.set_port(port);
    Ok(addr)
}

fn as_delivery(addr: SocketAddr, err: NetError) -> NetError {
    match err {
        NetError::Io(source) => NetError::delivery(addr, source),
        other => other,
    }
}

/// Notify the peer of `primary` on its notification port.
pub fn send_notification(primary: &TcpStream, text: &str, tag: &str) -> Result<(), NetError> {
    send_notification_to(primary.peer_addr()?, text, tag, DEFAULT_CONNECT_TIMEOUT)
}

/// Notify the peer whose primary address is `primary_peer`.
pub fn send_notification_to(
    primary_peer: SocketAddr,
    text: &str,
    tag: &str,
    connect_timeout: Duration,
) -> Result<(), NetError> {
    let addr = notification_addr(primary_peer)?;
    let mut stream = TcpStream::connect_timeout(&addr, connect_timeout)
        .map_err(|e| NetError::delivery(addr, e))?;
    send_message(&mut stream, &format!("{tag}{text}")).map_err(|e| as_delivery(addr, e))?;
    tracing::debug!(%addr, tag, "notification sent");
    Ok(())
}

/// Async [`send_notification_to`]. Each call uses its own connection.
pub async fn send_notification_async(
    primary_peer: SocketAddr,
    text: &str,
    tag: &str,
    connect_timeout: Duration,
) -> Result<(), NetError> {
    use tokio::io::AsyncWriteExt;

    let addr = notification_addr(primary_peer)?;
    let connect = tokio::net::TcpStream::connect(addr);
    let mut stream = match tokio::time::timeout(connect_timeout, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(NetError::delivery(addr, e)),
        Err(_) => {
            return Err(NetError::delivery(
                addr,
                io::Error::from(io::ErrorKind::TimedOut),
            ))
        }
    };
    write_frame(&mut stream, &format!("{tag}{text}"))
        .await
        .map_err(|e| as_delivery(addr, e))?;
    let _ = stream.shutdown().await;
    tracing::debug!(%addr, tag, "notification sent");
    Ok(())
}

/// Send a notification, logging instead of failing. Returns whether it was delivered.
pub fn notify_best_effort(primary: &TcpStream, text: &str, tag: &str) -> bool {
    match send_notification(primary, text, tag) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "notification dropped");
            false
        }
    }
}

/// A received notification, split into its tag and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Leading tag including its colon, e.g. `NOTF:`. Empty when untagged.
    pub tag: String,
    pub body: String,
}

impl Notice {
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((tag, body)) if !tag.is_empty() && !tag.contains(char::is_whitespace) => Self {
                tag: format!("{tag}:"),
                body: body.to_string(),
            },
            _ => Self {
                tag: String::new(),
                body: text.to_string(),
            },
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Player id of a frame pushed over an [`OofLink`].
    pub fn oof_player(&self) -> Option<u32> {
        self.tag
            .strip_prefix(OOF_TAG_PREFIX)?
            .strip_suffix(':')?
            .parse()
            .ok()
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tag, self.body)
    }
}

/// Persistent connection from a player to the banker's notification port.
#[derive(Debug)]
pub struct OofLink {
    channel: MessageChannel,
    player_id: u32,
    tag: String,
}

impl OofLink {
    /// Open a link next to the primary connection `primary`.
    pub fn connect(
        primary: &TcpStream,
        player_id: u32,
        connect_timeout: Duration,
    ) -> Result<Self, NetError> {
        let addr = notification_addr(primary.peer_addr()?)?;
        let stream = TcpStream::connect_timeout(&addr, connect_timeout)
            .map_err(|e| NetError::delivery(addr, e))?;
        tracing::info!(%addr, player_id, "out-of-focus link open");
        Ok(Self {
            channel: MessageChannel::from_tcp(stream, None)?,
            player_id,
            tag: format!("{OOF_TAG_PREFIX}{player_id}:"),
        })
    }

    pub fn player_id(&self) -> u32 {
        self.player_id
    }

    pub fn send(&mut self, text: &str) -> Result<(), NetError> {
        self.channel.send(&format!("{}{}", self.tag, text))
    }

    pub fn close(self) -> Result<(), NetError> {
        self.channel.shutdown()
    }
}
