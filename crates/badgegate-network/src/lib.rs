//! Operator sessions and the single-connection access server.
//!
//! This crate ties the other badgegate crates together: an [`AccessServer`]
//! accepts one operator at a time and runs a [`Session`] that reads commands
//! with the framer, polls the badge reader, and updates the registry.
//!
//! # Example
//!
//! ```no_run
//! use badgegate_hardware::MockReader;
//! use badgegate_network::{AccessServer, ServerConfig};
//! use badgegate_storage::FileRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (mut reader, _handle) = MockReader::new();
//! let registry = FileRegistry::open("tags.db").await?;
//! let server = AccessServer::bind(ServerConfig::default()).await?;
//!
//! let cancel = CancellationToken::new();
//! server.run(&mut reader, &registry, &cancel).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod server;
pub mod session;
pub mod state;

pub use error::{ServerError, SessionError, SessionResult};
pub use server::{AccessServer, ServerConfig};
pub use session::Session;
pub use state::{SessionState, SessionStateMachine, StateTransition};
