//! Frame codec: fixed-width decimal header, UTF-8 payload, space padding.
//!
//! ```text
//! +------------+-----------------+-----------+
//! | "16        " | "hi"          | "    "    |
//! | 10 bytes   | payload (utf-8) | padding   |
//! +------------+-----------------+-----------+
//! ```
//!
//! The header holds the *total* frame length (header + payload + padding) as
//! left-justified ASCII decimal. Padding brings the total to a multiple of
//! [`FRAME_ALIGN`], which is also the read granularity on the receiving side.
//!
//! Reassembly lives in [`FrameAssembler`], which does no I/O. The blocking
//! ([`decode_stream`]) and tokio ([`read_frame`]) readers both drive it.

use std::io::{self, Read};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{NetError, ProtocolError};

/// Width of the length header in bytes.
pub const HEADER_WIDTH: usize = 10;

/// Every frame is a multiple of this many bytes.
pub const FRAME_ALIGN: usize = 16;

/// Largest read issued while reassembling a frame.
pub const READ_CHUNK: usize = FRAME_ALIGN;

/// Number of padding bytes needed after a payload of `payload_len` bytes.
pub const fn padding_for(payload_len: usize) -> usize {
    (FRAME_ALIGN - (payload_len + HEADER_WIDTH) % FRAME_ALIGN) % FRAME_ALIGN
}

/// One encoded message, split the way it is written: header, then body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: [u8; HEADER_WIDTH],
    body: Vec<u8>,
    padding: usize,
}

impl Frame {
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Payload followed by padding.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn total_len(&self) -> usize {
        HEADER_WIDTH + self.body.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.body);
        out
    }
}

/// Encode `text` into a frame.
///
/// Only fails when the total length would not fit the ten digit header.
pub fn encode(text: &str) -> Result<Frame, ProtocolError> {
    let payload = text.as_bytes();
    let padding = padding_for(payload.len());
    let total = HEADER_WIDTH + payload.len() + padding;

    let digits = total.to_string();
    if digits.len() > HEADER_WIDTH {
        return Err(ProtocolError::FrameTooLarge(total as u64));
    }

    let mut header = [b' '; HEADER_WIDTH];
    header[..digits.len()].copy_from_slice(digits.as_bytes());

    let mut body = Vec::with_capacity(payload.len() + padding);
    body.extend_from_slice(payload);
    body.resize(payload.len() + padding, b' ');

    Ok(Frame {
        header,
        body,
        padding,
    })
}

/// Parse a header into the declared total frame length.
pub fn parse_header(header: &[u8]) -> Result<usize, ProtocolError> {
    let bad = || ProtocolError::BadHeader(String::from_utf8_lossy(header).into_owned());

    let text = std::str::from_utf8(header).map_err(|_| bad())?;
    let total: u64 = text.trim().parse().map_err(|_| bad())?;

    if total < FRAME_ALIGN as u64 || total % FRAME_ALIGN as u64 != 0 {
        return Err(ProtocolError::BadLength(total));
    }
    usize::try_from(total).map_err(|_| ProtocolError::BadLength(total))
}

/// Strip the header and trailing padding from a complete frame.
///
/// Only spaces go; other trailing whitespace in the payload is kept.
fn decode_frame(frame: &[u8]) -> Result<String, ProtocolError> {
    let mut text = String::from_utf8(frame[HEADER_WIDTH..].to_vec())?;
    let kept = text.trim_end_matches(' ').len();
    text.truncate(kept);
    Ok(text)
}

/// Incremental frame reassembly.
///
/// Feed it at most [`FrameAssembler::want`] bytes at a time; it never asks for
/// bytes past the end of the current frame, so frames sent back to back on one
/// stream stay separate.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: Vec<u8>,
    expected: Option<usize>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the next read.
    pub fn want(&self) -> usize {
        match self.expected {
            Some(total) => (total - self.buf.len()).min(READ_CHUNK),
            None => READ_CHUNK - self.buf.len(),
        }
    }

    /// Bytes of the current frame received so far.
    pub fn received(&self) -> usize {
        self.buf.len()
    }

    /// Declared total of the current frame, once its header is in.
    pub fn expected(&self) -> Option<usize> {
        self.expected
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.expected = None;
    }

    /// Append received bytes. Returns the message once the frame is complete.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Option<String>, ProtocolError> {
        debug_assert!(bytes.len() <= self.want());
        self.buf.extend_from_slice(bytes);

        if self.expected.is_none() && self.buf.len() >= HEADER_WIDTH {
            match parse_header(&self.buf[..HEADER_WIDTH]) {
                Ok(total) => self.expected = Some(total),
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            }
        }

        match self.expected {
            Some(total) if self.buf.len() >= total => {
                let frame = std::mem::take(&mut self.buf);
                self.expected = None;
                decode_frame(&frame[..total]).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn closed(&mut self) -> NetError {
        let err = NetError::ConnectionClosed {
            expected: self.expected.unwrap_or(0),
            received: self.buf.len(),
        };
        self.reset();
        err
    }
}

/// Blocking read of exactly one message.
pub fn decode_stream<R: Read>(reader: &mut R) -> Result<String, NetError> {
    let mut assembler = FrameAssembler::new();
    read_with(reader, &mut assembler)
}

/// Decode one message from an in-memory frame.
pub fn decode(bytes: &[u8]) -> Result<String, NetError> {
    let mut reader = bytes;
    decode_stream(&mut reader)
}

/// Blocking read driving an existing assembler, so a timed out read can resume.
pub(crate) fn read_with<R: Read>(
    reader: &mut R,
    assembler: &mut FrameAssembler,
) -> Result<String, NetError> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let want = assembler.want();
        let n = match reader.read(&mut chunk[..want]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Err(NetError::Timeout);
            }
            Err(e) => return Err(e.into()),
        };

        if n == 0 {
            return Err(assembler.closed());
        }
        if let Some(text) = assembler.push(&chunk[..n])? {
            return Ok(text);
        }
    }
}

/// Async read of exactly one message.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, NetError> {
    let mut assembler = FrameAssembler::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let want = assembler.want();
        let n = reader.read(&mut chunk[..want]).await?;
        if n == 0 {
            return Err(assembler.closed());
        }
        if let Some(text) = assembler.push(&chunk[..n])? {
            return Ok(text);
        }
    }
}

/// Async write of one message: header, then body, then flush.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> Result<(), NetError> {
    let frame = encode(text)?;
    writer.write_all(frame.header()).await?;
    writer.write_all(frame.body()).await?;
    writer.flush().await?;
    Ok(())
}
