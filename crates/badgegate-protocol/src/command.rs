use std::fmt;

/// One operator command line.
///
/// Matching is exact and case-sensitive; only a trailing `\r` is tolerated
/// so that `telnet`-style clients work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ADD` - register a new tag
    Add,
    /// `DELETE` - remove a registered tag
    Delete,
    /// `EDIT` - rename the holder of a registered tag
    Edit,
    /// Blank line, ignored by the session
    Empty,
    /// Anything else, kept for logging
    Unrecognized(String),
}

impl Command {
    pub const ADD: &'static str = "ADD";
    pub const DELETE: &'static str = "DELETE";
    pub const EDIT: &'static str = "EDIT";

    /// Classify a line taken from the command buffer.
    pub fn parse(line: &[u8]) -> Self {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        match line {
            b"" => Self::Empty,
            b"ADD" => Self::Add,
            b"DELETE" => Self::Delete,
            b"EDIT" => Self::Edit,
            other => Self::Unrecognized(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// Whether this command opens a registry sub-flow.
    pub fn is_registry_command(&self) -> bool {
        matches!(self, Self::Add | Self::Delete | Self::Edit)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str(Self::ADD),
            Self::Delete => f.write_str(Self::DELETE),
            Self::Edit => f.write_str(Self::EDIT),
            Self::Empty => f.write_str("<empty>"),
            Self::Unrecognized(line) => write!(f, "{line:?}"),
        }
    }
}
