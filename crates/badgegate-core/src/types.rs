use crate::{
    Result,
    constants::{
        CARD_SERIAL_LEN, CARD_SERIAL_OFFSET, FIELD_SEPARATOR, MAX_HOLDER_NAME_LEN, TAG_ID_LEN,
        TIMESTAMP_FORMAT, TIMESTAMP_LEN,
    },
    error::Error,
};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// RFID tag identifier (exactly 12 ASCII alphanumeric characters)
///
/// # Security
/// This type implements constant-time comparison to prevent timing attacks
/// when a scanned tag is matched against registered ones.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagId(String);

impl TagId {
    /// Create a new tag identifier with validation.
    ///
    /// The identifier is normalized (trimmed and converted to uppercase) before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidTagFormat` if:
    /// - The identifier is not exactly 12 characters long
    /// - The identifier contains anything other than ASCII letters and digits
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim().to_ascii_uppercase();

        if id.len() != TAG_ID_LEN {
            return Err(Error::InvalidTagFormat(format!(
                "Tag must be {TAG_ID_LEN} chars, got {}",
                id.len()
            )));
        }

        if !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::InvalidTagFormat(
                "Tag must be ASCII alphanumeric".to_string(),
            ));
        }

        Ok(TagId(id))
    }

    /// Create a tag identifier from raw frame bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidTagFormat` if the bytes are not a valid identifier.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::InvalidTagFormat("Tag must be ASCII".to_string()))?;
        TagId::new(text)
    }

    /// Get the tag identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the tag identifier as raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The 8-character card serial printed on the physical badge.
    #[must_use]
    pub fn card_serial(&self) -> &str {
        &self.0[CARD_SERIAL_OFFSET..CARD_SERIAL_OFFSET + CARD_SERIAL_LEN]
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TagId::new(s)
    }
}

impl TryFrom<String> for TagId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        TagId::new(&value)
    }
}

impl From<TagId> for String {
    fn from(tag: TagId) -> Self {
        tag.0
    }
}

/// Constant-time comparison implementation for TagId
impl PartialEq for TagId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for TagId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Name of the badge holder stored next to a tag.
///
/// The registry format has no escaping, so the field separator and every
/// control character (including the record terminator) are rejected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HolderName(String);

impl HolderName {
    /// Create a holder name with validation.
    ///
    /// Leading and trailing whitespace is trimmed.
    ///
    /// # Errors
    /// Returns `Error::InvalidHolderName` if the trimmed name is empty, longer
    /// than 64 bytes, or contains the field separator or a control character.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();

        if name.is_empty() {
            return Err(Error::InvalidHolderName("Name cannot be empty".to_string()));
        }

        if name.len() > MAX_HOLDER_NAME_LEN {
            return Err(Error::InvalidHolderName(format!(
                "Name must be at most {MAX_HOLDER_NAME_LEN} bytes, got {}",
                name.len()
            )));
        }

        if name.contains(FIELD_SEPARATOR) {
            return Err(Error::InvalidHolderName(format!(
                "Name cannot contain '{FIELD_SEPARATOR}'"
            )));
        }

        if name.chars().any(char::is_control) {
            return Err(Error::InvalidHolderName(
                "Name cannot contain control characters".to_string(),
            ));
        }

        Ok(HolderName(name.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for HolderName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        HolderName::new(&value)
    }
}

impl From<HolderName> for String {
    fn from(name: HolderName) -> Self {
        name.0
    }
}

/// Record modification time (dd-Mon-yy hh:mm:ss, always 18 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Local>);

impl Timestamp {
    /// Create a timestamp from the current local time.
    #[must_use]
    pub fn now() -> Self {
        Timestamp(truncate_subsec(Local::now()))
    }

    /// Create a timestamp from a DateTime instance.
    ///
    /// Sub-second precision is dropped since the record format cannot hold it.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Local>) -> Self {
        Timestamp(truncate_subsec(dt))
    }

    /// Parse from the record format: "18-Oct-26 09:41:07".
    ///
    /// # Errors
    /// Returns `Error::InvalidTimestamp` if the string is not 18 bytes wide,
    /// does not match the record format, or names a local time that does not
    /// exist (DST gap). Ambiguous times resolve to the earlier occurrence.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != TIMESTAMP_LEN {
            return Err(Error::InvalidTimestamp {
                value: s.to_string(),
                reason: format!("expected {TIMESTAMP_LEN} bytes, got {}", s.len()),
            });
        }

        let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|e| {
            Error::InvalidTimestamp {
                value: s.to_string(),
                reason: e.to_string(),
            }
        })?;

        let local = Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| Error::InvalidTimestamp {
                value: s.to_string(),
                reason: "local time does not exist (DST transition)".to_string(),
            })?;

        Ok(Timestamp(local))
    }

    /// Format in the fixed-width record format.
    #[must_use]
    pub fn format(&self) -> String {
        self.0.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Get the inner DateTime reference.
    #[must_use]
    pub fn inner(&self) -> &DateTime<Local> {
        &self.0
    }
}

fn truncate_subsec(dt: DateTime<Local>) -> DateTime<Local> {
    dt - chrono::Duration::nanoseconds(i64::from(dt.timestamp_subsec_nanos()))
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Timestamp::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("AAAAAAAAAAAA", "AAAAAAAAAAAA")]
    #[case("0a00c3f5e19b", "0A00C3F5E19B")]
    #[case("  0415AB12CD34 ", "0415AB12CD34")]
    fn test_tag_id_valid(#[case] input: &str, #[case] expected: &str) {
        let tag = TagId::new(input).unwrap();
        assert_eq!(tag.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("AAAAAAAAAAA")] // 11 chars
    #[case("AAAAAAAAAAAAA")] // 13 chars
    #[case("AAAAAA|AAAAA")] // separator
    #[case("AAAAAA\nAAAAA")] // terminator
    #[case("AAAAAA AAAAA")] // inner space
    fn test_tag_id_invalid(#[case] input: &str) {
        assert!(matches!(TagId::new(input), Err(Error::InvalidTagFormat(_))));
    }

    #[test]
    fn test_tag_id_from_bytes_rejects_non_utf8() {
        let bytes = [0xFF; TAG_ID_LEN];
        assert!(TagId::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_tag_id_card_serial() {
        let tag = TagId::new("0A00C3F5E19B").unwrap();
        assert_eq!(tag.card_serial(), "00C3F5E1");
    }

    #[test]
    fn test_tag_id_equality_is_case_normalized() {
        let upper = TagId::new("ABCDEF012345").unwrap();
        let lower = TagId::new("abcdef012345").unwrap();
        assert_eq!(upper, lower);
        assert_ne!(upper, TagId::new("ABCDEF012346").unwrap());
    }

    #[test]
    fn test_tag_id_serde_validates() {
        let tag: TagId = serde_json::from_str("\"abcdef012345\"").unwrap();
        assert_eq!(tag.as_str(), "ABCDEF012345");
        assert!(serde_json::from_str::<TagId>("\"short\"").is_err());
    }

    #[rstest]
    #[case("Alice", "Alice")]
    #[case("  Bob Smith  ", "Bob Smith")]
    #[case("Zoë", "Zoë")]
    fn test_holder_name_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(HolderName::new(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("Alice|Admin")]
    #[case("Alice\nBob")]
    #[case("Tab\there")]
    fn test_holder_name_invalid(#[case] input: &str) {
        assert!(matches!(
            HolderName::new(input),
            Err(Error::InvalidHolderName(_))
        ));
    }

    #[test]
    fn test_holder_name_too_long() {
        let name = "x".repeat(MAX_HOLDER_NAME_LEN + 1);
        assert!(HolderName::new(&name).is_err());
        assert!(HolderName::new(&name[1..]).is_ok());
    }

    #[test]
    fn test_timestamp_parse_and_format() {
        let ts = Timestamp::parse("18-Oct-26 09:41:07").unwrap();
        assert_eq!(ts.format(), "18-Oct-26 09:41:07");
    }

    #[test]
    fn test_timestamp_now_is_fixed_width() {
        assert_eq!(Timestamp::now().format().len(), TIMESTAMP_LEN);
    }

    #[rstest]
    #[case("18-Oct-2026 09:41:07")]
    #[case("18/10/26 09:41:07 ")]
    #[case("32-Oct-26 09:41:07")]
    fn test_timestamp_invalid(#[case] input: &str) {
        assert!(matches!(
            Timestamp::parse(input),
            Err(Error::InvalidTimestamp { .. })
        ));
    }
}
