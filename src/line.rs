//! Line framing.
//!
//! [`LineBuffer`] reassembles arbitrary socket reads into complete lines.
//! [`LineCodec`] is the outbound half: a tokio-util encoder that writes one
//! CRLF-terminated line per item.

use std::borrow::Cow;

use bytes::BytesMut;
use tracing::warn;

use crate::error::LineTooLong;

/// Default capacity of the read buffer in bytes.
pub const READ_BUFFER_CAPACITY: usize = 1024;

/// Fixed-capacity reassembly buffer for `\n`-terminated lines.
///
/// Bytes are appended after any pending (unterminated) prefix. Every `\n`
/// completes a line, which is returned with one trailing `\r` stripped.
/// Once the buffer is full without a terminator the pending bytes are
/// discarded and [`LineTooLong`] is returned.
///
/// ```
/// use irclink::line::LineBuffer;
///
/// let mut buf = LineBuffer::new();
/// assert_eq!(buf.feed(b"FOO\r\nBA").unwrap(), ["FOO"]);
/// assert_eq!(buf.pending(), 2);
/// assert_eq!(buf.feed(b"R\r\n").unwrap(), ["BAR"]);
/// ```
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    capacity: usize,
    /// Index of the next byte to check for a terminator.
    next_index: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    /// Create a buffer with [`READ_BUFFER_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(READ_BUFFER_CAPACITY)
    }

    /// Create a buffer with a custom capacity.
    ///
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            next_index: 0,
        }
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes held for a line that has not been terminated yet.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Free space left before the buffer overflows.
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Drop any pending bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.next_index = 0;
    }

    /// Append `chunk` and return every line it completes, in order.
    ///
    /// A chunk larger than [`remaining`](Self::remaining) is consumed in
    /// pieces. On overflow the pending bytes and the rest of the chunk are
    /// discarded; lines completed before it are returned in
    /// [`LineTooLong::completed`].
    pub fn feed(&mut self, mut chunk: &[u8]) -> Result<Vec<String>, LineTooLong> {
        let mut lines = Vec::new();

        while !chunk.is_empty() {
            let take = chunk.len().min(self.remaining());
            self.buf.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];

            self.drain_lines(&mut lines);

            if self.buf.len() >= self.capacity {
                self.clear();
                return Err(LineTooLong {
                    capacity: self.capacity,
                    completed: lines,
                });
            }
        }

        Ok(lines)
    }

    fn drain_lines(&mut self, lines: &mut Vec<String>) {
        while let Some(offset) = self.buf[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
        {
            let end = self.next_index + offset;
            let mut line = self.buf.split_to(end + 1);
            line.truncate(end);
            if line.last() == Some(&b'\r') {
                line.truncate(end - 1);
            }
            self.next_index = 0;
            lines.push(decode(&line));
        }

        self.next_index = self.buf.len();
    }
}

fn decode(bytes: &[u8]) -> String {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => s.to_owned(),
        Cow::Owned(s) => {
            warn!(len = bytes.len(), "replaced invalid UTF-8 in received line");
            s
        }
    }
}

/// Truncate `line` at its first line ending, dropping the ending itself.
///
/// A line may never smuggle a second command onto the wire.
pub fn sanitize(line: &str) -> &str {
    match line.find(&['\r', '\n'][..]) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[cfg(feature = "tokio")]
pub use self::codec::LineCodec;

#[cfg(feature = "tokio")]
mod codec {
    use std::io;

    use bytes::{BufMut, BytesMut};
    use tokio_util::codec::Encoder;

    use super::sanitize;

    /// Encoder writing one CRLF-terminated line per item.
    ///
    /// Anything after the first line ending in an item is discarded.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LineCodec;

    impl LineCodec {
        /// Create a new codec.
        pub fn new() -> Self {
            LineCodec
        }
    }

    impl Encoder<String> for LineCodec {
        type Error = io::Error;

        fn encode(&mut self, line: String, dst: &mut BytesMut) -> io::Result<()> {
            let line = sanitize(&line);
            dst.reserve(line.len() + 2);
            dst.put_slice(line.as_bytes());
            dst.put_slice(b"\r\n");
            Ok(())
        }
    }

}
