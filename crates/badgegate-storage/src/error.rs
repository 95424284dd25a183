use std::path::PathBuf;

use thiserror::Error;

/// Storage-specific error types for the tag registry.
///
/// Every variant is fatal for the session that triggered it: the daemon
/// stops rather than keep serving from a registry it cannot read or write.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading, writing or replacing the registry file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line of the registry file does not follow the record format
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
