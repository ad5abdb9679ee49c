//! Error types for the banker/player protocol.
//!
//! Every fallible networking operation returns `Result<T, NetError>`. Callers
//! tell a corrupted stream ([`NetError::Protocol`]) apart from a peer that went
//! away ([`NetError::ConnectionClosed`]) and decide for themselves whether to
//! drop the connection.

use std::io;

use thiserror::Error;

/// The stream did not carry a well-formed frame.
///
/// Not retried: after one of these the stream position is unknown.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The leading header bytes are not a decimal length.
    #[error("malformed frame header: {0:?}")]
    BadHeader(String),

    /// The declared total is shorter than one aligned frame or not aligned.
    #[error("invalid declared frame length: {0}")]
    BadLength(u64),

    /// The message does not fit a ten digit header.
    #[error("frame too large: {0} bytes")]
    FrameTooLarge(u64),

    /// The payload is not UTF-8.
    #[error("frame payload is not valid utf-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// The canonical error type for message and notification channels.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// EOF before the declared length was read. `received == 0` means the
    /// peer closed cleanly between frames.
    #[error("connection closed after {received} of {expected} bytes")]
    ConnectionClosed { expected: usize, received: usize },

    /// A notification could not be delivered. Notifications are best-effort.
    #[error("notification to {addr} not delivered: {source}")]
    Delivery {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The configured read timeout expired before a full frame arrived.
    #[error("timed out waiting for a frame")]
    Timeout,

    /// The background listener task is gone.
    #[error("listener stopped")]
    ListenerStopped,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl NetError {
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, NetError::Protocol(_))
    }

    /// Peer closed the connection without leaving a partial frame behind.
    pub fn is_clean_disconnect(&self) -> bool {
        matches!(self, NetError::ConnectionClosed { received: 0, .. })
    }

    pub(crate) fn delivery(addr: impl ToString, source: io::Error) -> Self {
        NetError::Delivery {
            addr: addr.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = NetError::ConnectionClosed {
            expected: 32,
            received: 16,
        };
        assert!(e.to_string().contains("16 of 32"));

        let e: NetError = ProtocolError::BadHeader("abc".into()).into();
        assert!(e.to_string().contains("abc"));
        assert!(e.is_protocol_error());
    }

    #[test]
    fn clean_disconnect_only_between_frames() {
        let clean = NetError::ConnectionClosed {
            expected: 0,
            received: 0,
        };
        let torn = NetError::ConnectionClosed {
            expected: 32,
            received: 10,
        };
        assert!(clean.is_clean_disconnect());
        assert!(!torn.is_clean_disconnect());
        assert!(!torn.is_protocol_error());
    }

    #[test]
    fn from_io() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke");
        let e: NetError = io_err.into();
        assert!(matches!(e, NetError::Io(_)));
    }
}
