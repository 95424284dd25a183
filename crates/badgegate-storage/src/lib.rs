//! Tag registry persistence for the badgegate access-control daemon.
//!
//! The registry is a flat text file with one [`TagRecord`] per line:
//!
//! ```text
//! AAAAAAAAAAAA|Alice|18-Oct-26 09:41:07
//! BBBBBBBBBBBB|Bob|18-Oct-26 09:42:51
//! ```
//!
//! # Architecture
//!
//! - [`TagRegistry`] - data access trait used by the session layer
//! - [`FileRegistry`] - flat-file implementation with atomic rewrites
//! - [`TagRecord`] - one line of the file, with its encoder and parser
//!
//! Mutations never edit the file in place. The new contents go to a scratch
//! file next to the registry, which is fsynced and renamed over the original,
//! so a crash leaves either the old or the new registry on disk.
//!
//! # Examples
//!
//! ```no_run
//! use badgegate_core::{HolderName, TagId};
//! use badgegate_storage::{FileRegistry, TagRegistry};
//!
//! # async fn example() -> badgegate_storage::StorageResult<()> {
//! let registry = FileRegistry::open("tags.db").await?;
//! let tag = TagId::new("AAAAAAAAAAAA").unwrap();
//!
//! registry.upsert(&tag, &HolderName::new("Alice").unwrap()).await?;
//! assert!(registry.lookup(&tag).await?.is_some());
//! assert!(registry.delete(&tag).await?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod record;
pub mod registry;

pub use error::{StorageError, StorageResult};
pub use record::TagRecord;
pub use registry::{FileRegistry, TagRegistry, touch_timestamp};
