//! Badge reader frame decoding.
//!
//! The reader emits ASCII frames framed by STX/ETX:
//!
//! ```text
//! 0x02  0A00C3F5E19B  0x03
//! STX   tag key (12)  ETX
//! ```
//!
//! Only the key window is interpreted. Its position is a property of the
//! reader hardware and comes from [`badgegate_core::constants`].

use badgegate_core::TagId;
use badgegate_core::constants::{FRAME_TAG_OFFSET, MIN_FRAME_LEN, TAG_ID_LEN};

use crate::error::{HardwareError, Result};

/// Start-of-text byte sent by the reader ahead of the key.
pub const FRAME_START: u8 = 0x02;

/// End-of-text byte sent by the reader after the key.
pub const FRAME_END: u8 = 0x03;

/// Stateless codec for reader frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagFrame;

impl TagFrame {
    /// Decode the tag key carried by a frame.
    ///
    /// Returns `Ok(None)` when the frame is shorter than
    /// [`MIN_FRAME_LEN`], which callers treat as "no scan".
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidData` if the frame is long enough but
    /// the key window does not hold a valid tag identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use badgegate_hardware::frame::TagFrame;
    ///
    /// let frame = b"\x020A00C3F5E19B\x03";
    /// let tag = TagFrame::decode(frame).unwrap().unwrap();
    /// assert_eq!(tag.as_str(), "0A00C3F5E19B");
    ///
    /// assert!(TagFrame::decode(b"\x020A00C3").unwrap().is_none());
    /// ```
    pub fn decode(frame: &[u8]) -> Result<Option<TagId>> {
        if frame.len() < MIN_FRAME_LEN {
            return Ok(None);
        }

        let window = &frame[FRAME_TAG_OFFSET..FRAME_TAG_OFFSET + TAG_ID_LEN];
        TagId::from_bytes(window)
            .map(Some)
            .map_err(|e| HardwareError::invalid_data(e.to_string()))
    }

    /// Build the frame a reader emits for `tag`.
    ///
    /// Used by the mock reader and by tests.
    #[must_use]
    pub fn encode(tag: &TagId) -> Vec<u8> {
        let mut frame = Vec::with_capacity(MIN_FRAME_LEN);
        frame.push(FRAME_START);
        frame.extend_from_slice(tag.as_bytes());
        frame.push(FRAME_END);
        frame
    }
}
