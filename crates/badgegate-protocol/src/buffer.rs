//! Growable per-session command buffer.
//!
//! The buffer tracks a *logical* capacity that starts at
//! [`COMMAND_BUFFER_INITIAL`] and grows in [`COMMAND_BUFFER_GROWTH`] steps, up
//! to [`COMMAND_BUFFER_MAX`]. Reads never write past the logical capacity, so
//! growth happens exactly when a receive fills the buffer.
//!
//! ```
//! use badgegate_protocol::CommandBuffer;
//!
//! let mut buffer = CommandBuffer::new();
//! buffer.extend_from_slice(b"ADD\r\nDEL");
//!
//! assert_eq!(&buffer.take_line().unwrap()[..], b"ADD");
//! assert!(buffer.take_line().is_none());
//! assert_eq!(buffer.len(), 3);
//! ```

use std::io;

use badgegate_core::constants::{
    COMMAND_BUFFER_GROWTH, COMMAND_BUFFER_INITIAL, COMMAND_BUFFER_MAX,
};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

const LINE_TERMINATOR: u8 = b'\n';

/// Owned byte buffer accumulating one connection's command stream.
#[derive(Debug)]
pub struct CommandBuffer {
    buf: BytesMut,
    capacity: usize,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(COMMAND_BUFFER_INITIAL),
            capacity: COMMAND_BUFFER_INITIAL,
        }
    }

    /// Current logical capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes received and not yet taken.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// No room left below the logical capacity.
    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    /// Whether a complete line is buffered.
    pub fn has_line(&self) -> bool {
        self.buf.contains(&LINE_TERMINATOR)
    }

    /// Raise the logical capacity by one growth step.
    ///
    /// Bytes already received are preserved.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` once the next step would exceed
    /// [`COMMAND_BUFFER_MAX`].
    pub fn grow(&mut self) -> io::Result<()> {
        let next = self.capacity + COMMAND_BUFFER_GROWTH;
        if next > COMMAND_BUFFER_MAX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("command line exceeds {COMMAND_BUFFER_MAX} bytes"),
            ));
        }

        self.capacity = next;
        self.buf.reserve(self.capacity - self.buf.len());
        Ok(())
    }

    /// Receive once into the unused tail of the buffer.
    ///
    /// Returns the number of bytes read; `0` means end of stream (or a full
    /// buffer, which callers grow first). Cancel safe: bytes are only
    /// appended once the underlying read completes.
    pub async fn read_from<R>(&mut self, reader: &mut R) -> io::Result<usize>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let spare = self.capacity.saturating_sub(self.buf.len());
        let mut tail = (&mut self.buf).limit(spare);
        reader.read_buf(&mut tail).await
    }

    /// Append bytes directly, bypassing the capacity accounting.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        while self.capacity < self.buf.len() {
            self.capacity += COMMAND_BUFFER_GROWTH;
        }
    }

    /// Remove the first complete line.
    ///
    /// The terminator and one trailing `\r` are stripped. Bytes after the
    /// newline stay buffered for the next call.
    pub fn take_line(&mut self) -> Option<Bytes> {
        let pos = self.buf.iter().position(|&b| b == LINE_TERMINATOR)?;
        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(pos - 1);
        }
        Some(line.freeze())
    }

    /// Drop everything buffered and return to the initial capacity.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.capacity = COMMAND_BUFFER_INITIAL;
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}
