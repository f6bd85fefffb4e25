//! Snapshot process source.
//!
//! The analysis stage hands over what it recovered as a manifest
//! (`.json` or `.json.xz`) next to the raw memory image holding the pages.
//! [`Snapshot::task`] locates the target process and yields a
//! [`SnapshotTask`](task::SnapshotTask), which implements [`ProcessAccess`](crate::process::ProcessAccess).

pub mod error;
pub mod parser;
pub mod task;
pub mod types;

pub use task::Snapshot;
