//! Blocking request/response channel between a player and the banker.
//!
//! A [`MessageChannel`] wraps one stream and moves whole messages over it. It
//! keeps any partly received frame between calls, so a receive that times out
//! halfway through a frame picks up where it left off on the next call instead
//! of losing its place in the stream.
//!
//! One receive at a time per channel; there is no internal locking.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use terminal_monopoly_types::{StatusSink, StatusUpdate};

use crate::config::ClientConfig;
use crate::error::NetError;
use crate::frame::{self, FrameAssembler};

/// Write one message: header, then body, then flush.
pub fn send_message<W: Write>(conn: &mut W, text: &str) -> Result<(), NetError> {
    let frame = frame::encode(text)?;
    conn.write_all(frame.header())?;
    conn.write_all(frame.body())?;
    conn.flush()?;
    tracing::debug!(bytes = frame.total_len(), "frame sent");
    Ok(())
}

/// Block until exactly one message has been read.
pub fn receive_message<R: Read>(conn: &mut R) -> Result<String, NetError> {
    frame::decode_stream(conn)
}

/// A framed connection.
#[derive(Debug)]
pub struct MessageChannel<S = TcpStream> {
    stream: S,
    pending: FrameAssembler,
}

impl<S: Read + Write> MessageChannel<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: FrameAssembler::new(),
        }
    }

    pub fn send(&mut self, text: &str) -> Result<(), NetError> {
        send_message(&mut self.stream, text)
    }

    /// Read the next message.
    ///
    /// Returns [`NetError::Timeout`] if the stream's read timeout expires; the
    /// bytes read so far are kept for the next call.
    pub fn receive(&mut self) -> Result<String, NetError> {
        let text = frame::read_with(&mut self.stream, &mut self.pending)?;
        tracing::debug!(len = text.len(), "frame received");
        Ok(text)
    }

    /// True while a frame is partly received.
    pub fn has_partial_frame(&self) -> bool {
        self.pending.received() > 0
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl MessageChannel<TcpStream> {
    /// Connect to the banker named by `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self, NetError> {
        let addr = config.socket_addr()?;
        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)?;
        tracing::info!(%addr, "connected to banker");
        Self::from_tcp(stream, config.read_timeout)
    }

    /// Wrap an accepted or already connected stream.
    pub fn from_tcp(stream: TcpStream, read_timeout: Option<Duration>) -> Result<Self, NetError> {
        stream.set_read_timeout(read_timeout)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.stream.peer_addr()?)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.stream.local_addr()?)
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), NetError> {
        Ok(self.stream.set_read_timeout(timeout)?)
    }

    pub fn shutdown(&self) -> Result<(), NetError> {
        Ok(self.stream.shutdown(Shutdown::Both)?)
    }
}

impl<S: Read + Write> StatusSink for MessageChannel<S> {
    type Error = NetError;

    fn send_status(&mut self, update: &StatusUpdate) -> Result<(), NetError> {
        self.send(&update.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use terminal_monopoly_types::StatusChange;

    /// Replays scripted reads and records writes.
    #[derive(Default)]
    struct Scripted {
        reads: VecDeque<io::Result<Vec<u8>>>,
        written: Vec<u8>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.reads.push_front(Ok(bytes.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_writes_header_then_body() {
        let mut out = Vec::new();
        send_message(&mut out, "hi").unwrap();
        assert_eq!(out, b"16        hi    ");
    }

    #[test]
    fn receive_resumes_after_timeout() {
        let bytes = frame::encode("resumable after a timeout").unwrap().to_bytes();
        let mut script = Scripted::default();
        script.reads.push_back(Ok(bytes[..12].to_vec()));
        script
            .reads
            .push_back(Err(io::Error::from(io::ErrorKind::WouldBlock)));
        script.reads.push_back(Ok(bytes[12..].to_vec()));

        let mut channel = MessageChannel::new(script);
        assert!(matches!(channel.receive(), Err(NetError::Timeout)));
        assert!(channel.has_partial_frame());
        assert_eq!(channel.receive().unwrap(), "resumable after a timeout");
        assert!(!channel.has_partial_frame());
    }

    #[test]
    fn receive_retries_interrupted_reads() {
        let bytes = frame::encode("ok").unwrap().to_bytes();
        let mut script = Scripted::default();
        script
            .reads
            .push_back(Err(io::Error::from(io::ErrorKind::Interrupted)));
        script.reads.push_back(Ok(bytes));

        let mut channel = MessageChannel::new(script);
        assert_eq!(channel.receive().unwrap(), "ok");
    }

    #[test]
    fn status_sink_sends_update_text() {
        let mut channel = MessageChannel::new(Scripted::default());
        channel
            .send_status(&StatusUpdate::new(3, StatusChange::Busy, 2))
            .unwrap();
        let written = channel.into_inner().written;
        assert_eq!(frame::decode(&written).unwrap(), "3busy 2");
    }
}
