//! Response lines sent to the operator.
//!
//! Every response is newline-terminated ASCII. Client scripts match on
//! these exact strings, so they are compile-time constants.
//!
//! # Usage
//!
//! ```
//! use badgegate_protocol::responses::Responses;
//!
//! assert_eq!(Responses::ACCESS_DENIED, "Access Denied.\n");
//! ```

use badgegate_core::{HolderName, Timestamp};

/// Fixed operator responses
pub struct Responses;

impl Responses {
    /// First line of a granted access report
    pub const ACCESS_GRANTED: &'static str = "Access Granted. Welcome!\n";

    /// Unsolicited scan of an unknown tag
    pub const ACCESS_DENIED: &'static str = "Access Denied.\n";

    /// Non-empty line that is not a command
    pub const UNRECOGNIZED_COMMAND: &'static str = "Unrecognized command\n";

    /// Name line rejected by validation
    pub const INVALID_NAME: &'static str = "Invalid name\n";

    pub const SCAN_TO_ADD: &'static str = "Scan tag to add\n";
    pub const ALREADY_REGISTERED: &'static str = "Tag already registered\n";
    pub const ENTER_NAME: &'static str = "Enter name\n";
    pub const TAG_ADDED: &'static str = "Tag added\n";

    pub const SCAN_TO_DELETE: &'static str = "Scan tag to delete\n";
    pub const TAG_DELETED: &'static str = "Tag deleted\n";
    pub const NOT_IN_SYSTEM: &'static str = "Tag not in system\n";

    pub const SCAN_TO_EDIT: &'static str = "Scan tag to edit\n";
    pub const ENTER_NEW_NAME: &'static str = "Enter new name\n";
    pub const TAG_UPDATED: &'static str = "Tag updated\n";

    /// EDIT of a tag that was never added
    pub const NOT_IN_SYSTEM_USE_ADD: &'static str = "Tag not in system. Use ADD\n";

    /// Full three-line report for a registered tag.
    pub fn access_granted(name: &HolderName, last_modified: &Timestamp) -> String {
        format!(
            "{}Data: {name}\nLast Modified: {}\n",
            Self::ACCESS_GRANTED,
            last_modified.format()
        )
    }
}
