//! Core constants for the badgegate access-control daemon.
//!
//! Every fixed offset, width and timeout used by the registry format, the
//! serial frame decoder and the line protocol lives here, so no other crate
//! slices bytes with magic numbers.
//!
//! # Registry Record Layout
//!
//! ```text
//! AAAAAAAAAAAA|Alice|18-Oct-26 09:41:07\n
//! ^^^^^^^^^^^^ ^     ^^^^^^^^^^^^^^^^^^
//! TAG_ID_LEN   name  TIMESTAMP_LEN
//! ```
//!
//! # Serial Frame Layout
//!
//! The badge reader emits one ASCII frame per presentation:
//!
//! ```text
//! offset: 0    1 ........... 12 13   14 15
//!         STX  <12-char key>    ETX  (slack)
//! ```
//!
//! The key window `[FRAME_TAG_OFFSET, FRAME_TAG_OFFSET + TAG_ID_LEN)` is a
//! property of the reader hardware and must not be re-derived at runtime.
//!
//! # Usage
//!
//! ```
//! use badgegate_core::constants::*;
//!
//! assert_eq!(FRAME_TAG_OFFSET + TAG_ID_LEN, 13);
//! assert!(MIN_FRAME_LEN <= FRAME_LEN);
//! ```

// ============================================================================
// Registry Record Format
// ============================================================================

/// Width of a tag identifier, in bytes.
pub const TAG_ID_LEN: usize = 12;

/// Separator between the fields of a registry record.
pub const FIELD_SEPARATOR: char = '|';

/// Terminator of a registry record.
pub const RECORD_TERMINATOR: char = '\n';

/// `chrono` format of the `last_modified` field.
///
/// Every directive in this format renders at a fixed width (`%b` is always a
/// three letter English month), which keeps the field at [`TIMESTAMP_LEN`].
///
/// # Examples
///
/// ```
/// use badgegate_core::constants::{TIMESTAMP_FORMAT, TIMESTAMP_LEN};
/// use chrono::NaiveDate;
///
/// let dt = NaiveDate::from_ymd_opt(2026, 10, 18)
///     .unwrap()
///     .and_hms_opt(9, 41, 7)
///     .unwrap();
/// let rendered = dt.format(TIMESTAMP_FORMAT).to_string();
/// assert_eq!(rendered, "18-Oct-26 09:41:07");
/// assert_eq!(rendered.len(), TIMESTAMP_LEN);
/// ```
pub const TIMESTAMP_FORMAT: &str = "%d-%b-%y %H:%M:%S";

/// Width of the `last_modified` field, in bytes.
pub const TIMESTAMP_LEN: usize = 18;

/// Maximum holder name length, in bytes.
pub const MAX_HOLDER_NAME_LEN: usize = 64;

/// Shortest possible record line, terminator excluded.
///
/// Tag, separator, one-byte name, separator, timestamp.
pub const MIN_RECORD_LEN: usize = TAG_ID_LEN + 1 + 1 + 1 + TIMESTAMP_LEN;

// ============================================================================
// Serial Frame Format
// ============================================================================

/// Size of the buffer handed to the reader for one scan attempt.
pub const FRAME_LEN: usize = 16;

/// Minimum number of bytes a scan must yield to carry a complete key.
///
/// Anything shorter is reported as "no scan", never as a partial key.
pub const MIN_FRAME_LEN: usize = 14;

/// Offset of the tag key inside a frame (right after STX).
pub const FRAME_TAG_OFFSET: usize = 1;

/// Offset of the 8-character card serial inside a tag key.
///
/// The serial is what gets printed on the physical badge.
pub const CARD_SERIAL_OFFSET: usize = 2;

/// Width of the card serial, in bytes.
pub const CARD_SERIAL_LEN: usize = 8;

/// Default serial device of the badge reader.
pub const DEFAULT_SERIAL_PATH: &str = "/dev/ttyAMA0";

/// Default serial baud rate of the badge reader.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Per-attempt serial read timeout in milliseconds.
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 500;

// ============================================================================
// Line Protocol
// ============================================================================

/// Initial capacity of a session command buffer.
pub const COMMAND_BUFFER_INITIAL: usize = 128;

/// Growth step of a session command buffer.
pub const COMMAND_BUFFER_GROWTH: usize = 128;

/// Upper bound for a single command line.
///
/// A peer that streams more than this without a newline is disconnected.
pub const COMMAND_BUFFER_MAX: usize = 64 * 1024;

/// Default TCP port of the operator protocol.
pub const DEFAULT_PORT: u16 = 9000;

/// Idle timeout of one socket read in milliseconds.
///
/// When it elapses the session polls the badge reader before reading again.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 50;

/// Bounded wait of one accept call in milliseconds.
pub const DEFAULT_ACCEPT_TIMEOUT_MS: u64 = 100;

/// Default registry file path.
pub const DEFAULT_REGISTRY_PATH: &str = "tags.db";

// Layout invariants, checked at compile time.
const _: () = assert!(FRAME_TAG_OFFSET + TAG_ID_LEN < MIN_FRAME_LEN);
const _: () = assert!(MIN_FRAME_LEN <= FRAME_LEN);
const _: () = assert!(CARD_SERIAL_OFFSET + CARD_SERIAL_LEN <= TAG_ID_LEN);
const _: () = assert!(COMMAND_BUFFER_MAX % COMMAND_BUFFER_GROWTH == 0);
const _: () = assert!(COMMAND_BUFFER_INITIAL <= COMMAND_BUFFER_MAX);
const _: () = assert!(MIN_RECORD_LEN == 33);
