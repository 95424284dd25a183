use std::net::SocketAddr;

use badgegate_hardware::HardwareError;
use badgegate_storage::StorageError;
use thiserror::Error;

use crate::state::SessionState;

/// Errors that abort one operator session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operator socket failed
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The badge reader failed
    #[error("Badge reader error: {0}")]
    Hardware(#[from] HardwareError),

    /// The registry could not be read or written
    #[error("Registry error: {0}")]
    Storage(#[from] StorageError),

    /// The session tried to move between states that are not connected
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

impl SessionError {
    /// Whether the server must stop instead of accepting the next operator.
    pub fn stops_server(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Errors that stop the access server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Low-level I/O error on the listener
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry became unusable during a session
    #[error("Registry error: {0}")]
    Storage(#[from] StorageError),
}

/// Specialized result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
