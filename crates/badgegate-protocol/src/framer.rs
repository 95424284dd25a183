//! Timeout-aware line framing over the operator socket.
//!
//! [`CommandFramer::read_line`] is the only place the session reads from
//! the network. It returns as soon as one of these holds:
//!
//! ```text
//! newline buffered        -> Complete(capacity)
//! idle timeout elapsed    -> WouldBlock   (partial bytes kept)
//! shutdown requested      -> WouldBlock
//! zero-length read        -> Closed
//! any other read failure  -> Fatal(err)
//! line over 64 KiB        -> Fatal(InvalidData)
//! ```

use std::io;
use std::time::Duration;

use badgegate_core::constants::DEFAULT_IDLE_TIMEOUT_MS;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::buffer::CommandBuffer;

/// Outcome of one framing attempt.
#[derive(Debug)]
pub enum FrameResult {
    /// A complete line is buffered; carries the buffer's current capacity.
    Complete(usize),
    /// Nothing complete yet; the caller may do other work and retry.
    WouldBlock,
    /// The peer closed the connection.
    Closed,
    /// The connection is unusable.
    Fatal(io::Error),
}

impl FrameResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Reads newline-terminated commands with a bounded wait per attempt.
#[derive(Debug, Clone)]
pub struct CommandFramer {
    idle_timeout: Duration,
    cancel: CancellationToken,
}

impl CommandFramer {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            cancel,
        }
    }

    /// Set how long one attempt waits for new bytes.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Receive until a full line is buffered, the idle timeout elapses, or
    /// the connection ends.
    ///
    /// Extract the line afterwards with [`CommandBuffer::take_line`].
    pub async fn read_line<R>(&self, reader: &mut R, buffer: &mut CommandBuffer) -> FrameResult
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        loop {
            if self.cancel.is_cancelled() {
                return FrameResult::WouldBlock;
            }

            if buffer.has_line() {
                return FrameResult::Complete(buffer.capacity());
            }

            if buffer.is_full()
                && let Err(e) = buffer.grow()
            {
                return FrameResult::Fatal(e);
            }

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return FrameResult::WouldBlock,
                read = tokio::time::timeout(self.idle_timeout, buffer.read_from(reader)) => read,
            };

            match read {
                Err(_) => return FrameResult::WouldBlock,
                Ok(Ok(0)) => return FrameResult::Closed,
                Ok(Ok(n)) => {
                    trace!(
                        bytes = n,
                        buffered = buffer.len(),
                        capacity = buffer.capacity(),
                        "Command bytes received"
                    );
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {}
                Ok(Err(e)) => return FrameResult::Fatal(e),
            }
        }
    }
}
