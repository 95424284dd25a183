//! Badge reader abstraction layer for the badgegate access-control daemon.
//!
//! This crate provides the [`CredentialReader`] trait, the serial driver for
//! the UART-attached RFID reader, a channel-driven mock for tests, and the
//! frame decoder that turns raw reader output into a [`TagId`].
//!
//! # Design Philosophy
//!
//! - **Async-first**: reads are `async fn` in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Bounded**: one scan never blocks longer than the reader timeout quantum,
//!   so cancellation is observed promptly.
//! - **Forgiving framing**: short or noisy frames are "no scan", never errors.
//!
//! # Example
//!
//! ```no_run
//! use badgegate_hardware::scanner::wait_for_tag;
//! use badgegate_hardware::serial::{SerialConfig, SerialReader};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> badgegate_hardware::Result<()> {
//! let mut reader = SerialReader::open(&SerialConfig::default())?;
//! let cancel = CancellationToken::new();
//!
//! if let Some(tag) = wait_for_tag(&mut reader, &cancel).await? {
//!     println!("Badge {tag} presented");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`TagId`]: badgegate_core::TagId

pub mod devices;
pub mod error;
pub mod frame;
pub mod mock;
pub mod scanner;
pub mod serial;
pub mod traits;

pub use devices::AnyReader;
pub use error::{HardwareError, Result};
pub use frame::TagFrame;
pub use mock::{MockReader, MockReaderHandle};
pub use scanner::{scan_tag, wait_for_tag};
pub use serial::{SerialConfig, SerialReader};
pub use traits::CredentialReader;
