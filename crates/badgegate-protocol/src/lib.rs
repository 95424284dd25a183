//! Operator line protocol for the badgegate access-control daemon.
//!
//! The operator talks to the daemon over a plain TCP socket with
//! newline-terminated ASCII lines:
//!
//! ```text
//! client: ADD
//! server: Scan tag to add
//! server: Enter name
//! client: Alice
//! server: Tag added
//! ```
//!
//! This crate provides the pieces that know about bytes on that socket:
//!
//! - [`CommandBuffer`] - growable per-connection receive buffer
//! - [`CommandFramer`] - timeout- and cancellation-aware line reader
//! - [`Command`] - classification of a received line
//! - [`Responses`] - every line the server can send
//!
//! # Example
//!
//! ```
//! use badgegate_protocol::{Command, CommandBuffer, CommandFramer, FrameResult};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let framer = CommandFramer::new(CancellationToken::new());
//! let mut buffer = CommandBuffer::new();
//! let mut socket: &[u8] = b"DELETE\r\n";
//!
//! if let FrameResult::Complete(_) = framer.read_line(&mut socket, &mut buffer).await {
//!     let line = buffer.take_line().unwrap();
//!     assert_eq!(Command::parse(&line), Command::Delete);
//! }
//! # }
//! ```

pub mod buffer;
pub mod command;
pub mod framer;
pub mod responses;

pub use buffer::CommandBuffer;
pub use command::Command;
pub use framer::{CommandFramer, FrameResult};
pub use responses::Responses;
