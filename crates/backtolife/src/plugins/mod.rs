//! Dump plugins.
//!
//! Each plugin takes one recovered process through
//! [`ProcessAccess`](crate::process::ProcessAccess) and writes image files.

pub mod backtolife;
