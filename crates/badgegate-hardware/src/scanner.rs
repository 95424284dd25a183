//! Cancellation-aware scan loops on top of [`CredentialReader`].
//!
//! A single [`scan_tag`] call is what the idle session does between two
//! socket reads; [`wait_for_tag`] is what ADD/DELETE/EDIT do while the
//! operator walks to the reader.

use badgegate_core::TagId;
use badgegate_core::constants::FRAME_LEN;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{HardwareError, Result};
use crate::frame::TagFrame;
use crate::traits::CredentialReader;

/// Run one scan attempt and decode the frame.
///
/// Returns `Ok(None)` when nothing was presented, when the frame was short or
/// malformed, or when `cancel` fired. Only device failures are errors.
///
/// # Errors
///
/// Propagates disconnection and communication errors from the reader.
pub async fn scan_tag<R: CredentialReader>(
    reader: &mut R,
    cancel: &CancellationToken,
) -> Result<Option<TagId>> {
    if cancel.is_cancelled() {
        return Ok(None);
    }

    let mut frame = [0u8; FRAME_LEN];
    let n = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(None),
        n = reader.scan(&mut frame) => n?,
    };

    if n == 0 {
        return Ok(None);
    }

    match TagFrame::decode(&frame[..n]) {
        Ok(Some(tag)) => {
            debug!(device = reader.name(), tag = %tag, "Badge scanned");
            Ok(Some(tag))
        }
        Ok(None) => {
            trace!(device = reader.name(), bytes = n, "Short frame ignored");
            Ok(None)
        }
        Err(HardwareError::InvalidData { message }) => {
            warn!(device = reader.name(), bytes = n, %message, "Malformed frame ignored");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Scan repeatedly until a badge is decoded or `cancel` fires.
///
/// Returns `Ok(None)` only on cancellation.
///
/// # Errors
///
/// Propagates disconnection and communication errors from the reader.
pub async fn wait_for_tag<R: CredentialReader>(
    reader: &mut R,
    cancel: &CancellationToken,
) -> Result<Option<TagId>> {
    while !cancel.is_cancelled() {
        if let Some(tag) = scan_tag(reader, cancel).await? {
            return Ok(Some(tag));
        }
    }
    Ok(None)
}
