use badgegate_core::constants::{
    FIELD_SEPARATOR, MIN_RECORD_LEN, RECORD_TERMINATOR, TAG_ID_LEN, TIMESTAMP_LEN,
};
use badgegate_core::{HolderName, TagId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// One registry entry: a tag, who holds it, and when it was last written.
///
/// # Wire Format
///
/// ```text
/// AAAAAAAAAAAA|Alice|18-Oct-26 09:41:07\n
/// ```
///
/// The tag and the timestamp are fixed width, so the name is whatever sits
/// between the first and the last separator. Names can never contain the
/// separator (see [`HolderName`]), which keeps the split unambiguous.
///
/// # Examples
///
/// ```
/// use badgegate_core::{HolderName, TagId, Timestamp};
/// use badgegate_storage::TagRecord;
///
/// let record = TagRecord::new(
///     TagId::new("AAAAAAAAAAAA").unwrap(),
///     HolderName::new("Alice").unwrap(),
///     Timestamp::parse("18-Oct-26 09:41:07").unwrap(),
/// );
/// assert_eq!(record.encode(), "AAAAAAAAAAAA|Alice|18-Oct-26 09:41:07\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    /// Record key
    pub tag_id: TagId,

    /// Badge holder
    pub holder_name: HolderName,

    /// Time of the last create/modify
    pub last_modified: Timestamp,
}

impl TagRecord {
    pub fn new(tag_id: TagId, holder_name: HolderName, last_modified: Timestamp) -> Self {
        Self {
            tag_id,
            holder_name,
            last_modified,
        }
    }

    /// Render the record as one terminated registry line.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{RECORD_TERMINATOR}",
            self.tag_id,
            self.holder_name,
            self.last_modified.format(),
            sep = FIELD_SEPARATOR,
        )
    }

    /// Parse one registry line (terminator already stripped).
    ///
    /// `line_no` is 1-based and only used for error reporting.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MalformedRecord` if the line is too short,
    /// separators are missing, or a field fails validation.
    pub fn decode(line: &str, line_no: usize) -> StorageResult<Self> {
        if line.len() < MIN_RECORD_LEN {
            return Err(StorageError::malformed(
                line_no,
                format!("expected at least {MIN_RECORD_LEN} bytes, got {}", line.len()),
            ));
        }

        let tag = record_key(line, line_no)?;
        let tag_id =
            TagId::from_bytes(tag).map_err(|e| StorageError::malformed(line_no, e.to_string()))?;

        let rest = &line[TAG_ID_LEN..];
        let Some(rest) = rest.strip_prefix(FIELD_SEPARATOR) else {
            return Err(StorageError::malformed(
                line_no,
                format!("missing '{FIELD_SEPARATOR}' after tag"),
            ));
        };

        let Some((name, timestamp)) = rest.rsplit_once(FIELD_SEPARATOR) else {
            return Err(StorageError::malformed(
                line_no,
                format!("missing '{FIELD_SEPARATOR}' before timestamp"),
            ));
        };

        if timestamp.len() != TIMESTAMP_LEN {
            return Err(StorageError::malformed(
                line_no,
                format!(
                    "timestamp must be {TIMESTAMP_LEN} bytes, got {}",
                    timestamp.len()
                ),
            ));
        }

        let holder_name =
            HolderName::new(name).map_err(|e| StorageError::malformed(line_no, e.to_string()))?;
        let last_modified = Timestamp::parse(timestamp)
            .map_err(|e| StorageError::malformed(line_no, e.to_string()))?;

        Ok(Self::new(tag_id, holder_name, last_modified))
    }
}

/// The key bytes of a registry line.
///
/// Only the length is checked, so a linear scan can match keys without
/// parsing every record.
pub(crate) fn record_key(line: &str, line_no: usize) -> StorageResult<&[u8]> {
    line.as_bytes().get(..TAG_ID_LEN).ok_or_else(|| {
        StorageError::malformed(
            line_no,
            format!("expected a {TAG_ID_LEN} byte tag, got {} bytes", line.len()),
        )
    })
}
