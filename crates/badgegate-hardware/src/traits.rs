//! Badge reader trait definition.
//!
//! This module defines the contract between the session state machine and
//! the physical (or simulated) badge reader, enabling easy substitution
//! between the serial driver and the mock used in tests.
//!
//! The trait uses native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;

/// Badge reader device abstraction.
///
/// A reader delivers raw frames; decoding them into a tag key is the job of
/// [`TagFrame`](crate::frame::TagFrame). Each call waits at most one
/// hardware-defined timeout quantum, so callers can poll it in a loop and
/// still observe cancellation promptly.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. For dynamic dispatch use
/// [`AnyReader`](crate::devices::AnyReader).
///
/// # Examples
///
/// ```no_run
/// use badgegate_hardware::traits::CredentialReader;
/// use badgegate_hardware::error::Result;
///
/// async fn drain<R: CredentialReader>(reader: &mut R) -> Result<usize> {
///     let mut frame = [0u8; 16];
///     let mut total = 0;
///     loop {
///         let n = reader.scan(&mut frame).await?;
///         if n == 0 {
///             return Ok(total);
///         }
///         total += n;
///     }
/// }
/// ```
pub trait CredentialReader: Send + Sync {
    /// Read up to `out.len()` bytes of one frame.
    ///
    /// Returns the number of bytes obtained, which is `0` when no badge was
    /// presented during the timeout quantum.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The device is disconnected
    /// - A communication error occurs
    async fn scan(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Human readable device name, used in log output.
    fn name(&self) -> &str;
}
