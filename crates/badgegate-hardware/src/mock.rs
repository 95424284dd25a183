//! Mock badge reader implementation for testing and development.
//!
//! This module provides a simulated reader that can be controlled
//! programmatically for testing without requiring physical hardware.

use std::time::Duration;

use badgegate_core::TagId;
use badgegate_core::constants::DEFAULT_SCAN_TIMEOUT_MS;
use tokio::sync::mpsc;

use crate::{Result, frame::TagFrame, traits::CredentialReader};

/// Mock badge reader for testing and development.
///
/// Frames pushed through the paired [`MockReaderHandle`] are returned by
/// [`scan`](CredentialReader::scan) one at a time. When no frame is queued a
/// scan waits one timeout quantum and reports `0` bytes, like the real
/// reader does when nobody presents a badge.
///
/// # Examples
///
/// ```
/// use badgegate_core::TagId;
/// use badgegate_hardware::mock::MockReader;
/// use badgegate_hardware::traits::CredentialReader;
///
/// #[tokio::main]
/// async fn main() -> badgegate_hardware::Result<()> {
///     let (mut reader, handle) = MockReader::new();
///
///     handle.present_tag(&TagId::new("AAAAAAAAAAAA").unwrap()).await?;
///
///     let mut frame = [0u8; 16];
///     let n = reader.scan(&mut frame).await?;
///     assert_eq!(n, 14);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    /// Channel receiver for frames
    frame_rx: mpsc::Receiver<Vec<u8>>,

    /// Device name
    name: String,

    /// How long an empty scan waits
    quantum: Duration,
}

impl MockReader {
    /// Create a new mock reader with the default name and timeout quantum.
    pub fn new() -> (Self, MockReaderHandle) {
        Self::with_timeout(Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS))
    }

    /// Create a new mock reader whose empty scans return after `quantum`.
    ///
    /// Tests use a short quantum to keep the idle loop fast.
    pub fn with_timeout(quantum: Duration) -> (Self, MockReaderHandle) {
        let (frame_tx, frame_rx) = mpsc::channel(32);

        let reader = Self {
            frame_rx,
            name: "Mock Badge Reader".to_string(),
            quantum,
        };

        (reader, MockReaderHandle { frame_tx })
    }
}

impl CredentialReader for MockReader {
    async fn scan(&mut self, out: &mut [u8]) -> Result<usize> {
        match tokio::time::timeout(self.quantum, self.frame_rx.recv()).await {
            Ok(Some(frame)) => {
                let n = frame.len().min(out.len());
                out[..n].copy_from_slice(&frame[..n]);
                Ok(n)
            }
            Ok(None) => Err(crate::HardwareError::disconnected("Mock reader channel closed")),
            Err(_) => Ok(0),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for controlling a mock badge reader.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    /// Channel sender for frames
    frame_tx: mpsc::Sender<Vec<u8>>,
}

impl MockReaderHandle {
    /// Present a badge: queue the well-formed frame the reader emits for `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present_tag(&self, tag: &TagId) -> Result<()> {
        self.send_frame(TagFrame::encode(tag)).await
    }

    /// Queue raw bytes as the next frame, e.g. a truncated or noisy read.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn send_frame(&self, frame: Vec<u8>) -> Result<()> {
        self.frame_tx
            .send(frame)
            .await
            .map_err(|_| crate::HardwareError::disconnected("Mock reader channel closed"))
    }
}
