//! Enum wrapper for badge reader dispatch.
//!
//! Native `async fn` in traits (RPITIT - Rust Edition 2024) is not
//! object-safe, so `Box<dyn CredentialReader>` is not available. The daemon
//! picks its reader at startup and stores it in [`AnyReader`], which forwards
//! to the concrete type with a `match`.
//!
//! # Examples
//!
//! ```
//! use badgegate_hardware::devices::AnyReader;
//! use badgegate_hardware::mock::MockReader;
//! use badgegate_hardware::traits::CredentialReader;
//!
//! let (reader, _handle) = MockReader::new();
//! let any_reader = AnyReader::Mock(reader);
//! assert_eq!(any_reader.name(), "Mock Badge Reader");
//! ```

use crate::Result;
use crate::mock::MockReader;
use crate::serial::SerialReader;
use crate::traits::CredentialReader;

/// Enum wrapper for badge reader dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyReader {
    /// Reader attached to a UART.
    Serial(SerialReader),

    /// Mock reader for development and testing.
    Mock(MockReader),
}

impl CredentialReader for AnyReader {
    async fn scan(&mut self, out: &mut [u8]) -> Result<usize> {
        match self {
            Self::Serial(device) => device.scan(out).await,
            Self::Mock(device) => device.scan(out).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Serial(device) => device.name(),
            Self::Mock(device) => device.name(),
        }
    }
}

impl From<SerialReader> for AnyReader {
    fn from(reader: SerialReader) -> Self {
        Self::Serial(reader)
    }
}

impl From<MockReader> for AnyReader {
    fn from(reader: MockReader) -> Self {
        Self::Mock(reader)
    }
}
